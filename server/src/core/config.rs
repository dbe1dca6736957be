//! Application configuration
//!
//! Layered like the rest of the process bootstrap: JSON config file, then
//! environment variables, then CLI flags, highest wins. Secrets (API keys)
//! come from the environment only and never live in the config file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_TEMPERATURE, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_HOST, DEFAULT_LLM_BASE_URL, DEFAULT_PORT,
    DEFAULT_PRODUCER_RETRIES, DEFAULT_TOPIC_REDIS_URL, DEFAULT_TREND_GEO, DEFAULT_TREND_LIMIT,
    DEFAULT_JSON_RETRY_BUDGET, CONSUMER_GROUP, ENV_CONFIG, ENV_HOST, ENV_LLM_API_KEY, ENV_PORT,
    ENV_SQLITE_PATH, ENV_TOPIC_BACKEND, ENV_TOPIC_REDIS_URL, ENV_TRANSCRIPT_BASE_URL,
    ENV_TREND_API_KEY, ENV_VECTOR_BACKEND, ENV_VECTOR_POSTGRES_URL, ENV_YOUTUBE_API_KEY,
    SQLITE_DB_FILENAME, TOPIC_ANALYSIS, TOPIC_IDEA, TOPIC_OVERVIEW, TOPIC_V2_SUFFIX,
};

// =============================================================================
// Backend Enums
// =============================================================================

/// Message bus backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicBackendType {
    #[default]
    Memory,
    Redis,
}

impl fmt::Display for TopicBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopicBackendType::Memory => write!(f, "memory"),
            TopicBackendType::Redis => write!(f, "redis"),
        }
    }
}

impl TopicBackendType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "memory" => Some(Self::Memory),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }
}

/// Vector store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackendType {
    #[default]
    Memory,
    Pgvector,
}

impl fmt::Display for VectorBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorBackendType::Memory => write!(f, "memory"),
            VectorBackendType::Pgvector => write!(f, "pgvector"),
        }
    }
}

impl VectorBackendType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "memory" => Some(Self::Memory),
            "pgvector" => Some(Self::Pgvector),
            _ => None,
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub sqlite_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct VectorFileConfig {
    pub backend: Option<VectorBackendType>,
    pub postgres_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TopicsFileConfig {
    pub backend: Option<TopicBackendType>,
    pub redis_url: Option<String>,
    pub group_id: Option<String>,
    pub producer_retries: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LlmFileConfig {
    pub base_url: Option<String>,
    pub chat_model: Option<String>,
    pub temperature: Option<f64>,
    pub embedding_model: Option<String>,
    pub embedding_dimension: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct YoutubeFileConfig {
    pub transcript_base_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TrendsFileConfig {
    pub geo: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PipelineFileConfig {
    pub v2_idea_enabled: Option<bool>,
    pub json_retry_budget: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub database: DatabaseFileConfig,
    #[serde(default)]
    pub vector: VectorFileConfig,
    #[serde(default)]
    pub topics: TopicsFileConfig,
    #[serde(default)]
    pub llm: LlmFileConfig,
    #[serde(default)]
    pub youtube: YoutubeFileConfig,
    #[serde(default)]
    pub trends: TrendsFileConfig,
    #[serde(default)]
    pub pipeline: PipelineFileConfig,
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub sqlite_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct VectorConfig {
    pub backend: VectorBackendType,
    pub postgres_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TopicsConfig {
    pub backend: TopicBackendType,
    pub redis_url: Option<String>,
    pub group_id: String,
    pub producer_retries: u32,
    pub overview_topic: String,
    pub analysis_topic: String,
    pub idea_topic: String,
}

impl TopicsConfig {
    /// Base topic names in step order
    pub fn base_topics(&self) -> [&str; 3] {
        [&self.overview_topic, &self.analysis_topic, &self.idea_topic]
    }

    /// v2 variant of a topic name
    pub fn v2_topic(name: &str) -> String {
        format!("{name}{TOPIC_V2_SUFFIX}")
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub temperature: f64,
    pub embedding_model: String,
    pub embedding_dimension: u32,
}

#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub api_key: String,
    pub transcript_base_url: String,
}

#[derive(Debug, Clone)]
pub struct TrendsConfig {
    pub api_key: String,
    pub geo: String,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Whether /reports/v2 also schedules the idea step. Off by default:
    /// v2 pre-marks the idea axis COMPLETED and publishes no idea message.
    pub v2_idea_enabled: bool,
    pub json_retry_budget: u32,
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub vector: VectorConfig,
    pub topics: TopicsConfig,
    pub llm: LlmConfig,
    pub youtube: YoutubeConfig,
    pub trends: TrendsConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load configuration with file < env < CLI precedence
    pub fn load(cli: &CliConfig) -> Result<Self> {
        let file = Self::load_file(cli.config.as_deref())?;

        let host = cli
            .host
            .clone()
            .or_else(|| std::env::var(ENV_HOST).ok())
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli
            .port
            .or_else(|| std::env::var(ENV_PORT).ok().and_then(|p| p.parse().ok()))
            .or(file.server.port)
            .unwrap_or(DEFAULT_PORT);

        let sqlite_path = cli
            .sqlite_path
            .clone()
            .or_else(|| std::env::var(ENV_SQLITE_PATH).ok().map(PathBuf::from))
            .or(file.database.sqlite_path)
            .unwrap_or_else(|| PathBuf::from(SQLITE_DB_FILENAME));

        let vector_backend = std::env::var(ENV_VECTOR_BACKEND)
            .ok()
            .as_deref()
            .and_then(VectorBackendType::parse)
            .or(file.vector.backend)
            .unwrap_or_default();

        let vector_postgres_url = std::env::var(ENV_VECTOR_POSTGRES_URL)
            .ok()
            .or(file.vector.postgres_url);

        let topic_backend = std::env::var(ENV_TOPIC_BACKEND)
            .ok()
            .as_deref()
            .and_then(TopicBackendType::parse)
            .or(file.topics.backend)
            .unwrap_or_default();

        let redis_url = std::env::var(ENV_TOPIC_REDIS_URL)
            .ok()
            .or(file.topics.redis_url)
            .or_else(|| {
                (topic_backend == TopicBackendType::Redis)
                    .then(|| DEFAULT_TOPIC_REDIS_URL.to_string())
            });

        let llm_api_key = std::env::var(ENV_LLM_API_KEY).unwrap_or_default();
        if llm_api_key.is_empty() {
            tracing::warn!(env = ENV_LLM_API_KEY, "LLM API key not set");
        }

        let youtube_api_key = std::env::var(ENV_YOUTUBE_API_KEY).unwrap_or_default();
        if youtube_api_key.is_empty() {
            tracing::warn!(env = ENV_YOUTUBE_API_KEY, "YouTube API key not set");
        }

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig { sqlite_path },
            vector: VectorConfig {
                backend: vector_backend,
                postgres_url: vector_postgres_url,
            },
            topics: TopicsConfig {
                backend: topic_backend,
                redis_url,
                group_id: file
                    .topics
                    .group_id
                    .unwrap_or_else(|| CONSUMER_GROUP.to_string()),
                producer_retries: file
                    .topics
                    .producer_retries
                    .unwrap_or(DEFAULT_PRODUCER_RETRIES),
                overview_topic: TOPIC_OVERVIEW.to_string(),
                analysis_topic: TOPIC_ANALYSIS.to_string(),
                idea_topic: TOPIC_IDEA.to_string(),
            },
            llm: LlmConfig {
                api_key: llm_api_key,
                base_url: file
                    .llm
                    .base_url
                    .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
                chat_model: file
                    .llm
                    .chat_model
                    .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
                temperature: file.llm.temperature.unwrap_or(DEFAULT_CHAT_TEMPERATURE),
                embedding_model: file
                    .llm
                    .embedding_model
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                embedding_dimension: file
                    .llm
                    .embedding_dimension
                    .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            },
            youtube: YoutubeConfig {
                api_key: youtube_api_key,
                transcript_base_url: std::env::var(ENV_TRANSCRIPT_BASE_URL)
                    .ok()
                    .or(file.youtube.transcript_base_url)
                    .unwrap_or_else(|| "http://127.0.0.1:8085".to_string()),
            },
            trends: TrendsConfig {
                api_key: std::env::var(ENV_TREND_API_KEY).unwrap_or_default(),
                geo: file.trends.geo.unwrap_or_else(|| DEFAULT_TREND_GEO.to_string()),
                limit: file.trends.limit.unwrap_or(DEFAULT_TREND_LIMIT),
            },
            pipeline: PipelineConfig {
                v2_idea_enabled: file.pipeline.v2_idea_enabled.unwrap_or(false),
                json_retry_budget: file
                    .pipeline
                    .json_retry_budget
                    .unwrap_or(DEFAULT_JSON_RETRY_BUDGET),
            },
        })
    }

    fn load_file(cli_path: Option<&Path>) -> Result<FileConfig> {
        let path = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

        if !path.exists() {
            return Ok(FileConfig::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let parsed = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Config file loaded");
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!(TopicBackendType::parse("memory"), Some(TopicBackendType::Memory));
        assert_eq!(TopicBackendType::parse("redis"), Some(TopicBackendType::Redis));
        assert_eq!(TopicBackendType::parse("kafka"), None);
        assert_eq!(VectorBackendType::parse("pgvector"), Some(VectorBackendType::Pgvector));
    }

    #[test]
    fn test_v2_topic_names() {
        assert_eq!(TopicsConfig::v2_topic("overview-topic"), "overview-topic-v2");
    }

    #[test]
    fn test_file_config_partial_json() {
        let parsed: FileConfig = serde_json::from_str(
            r#"{"server": {"port": 9000}, "pipeline": {"v2_idea_enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(parsed.server.port, Some(9000));
        assert!(parsed.server.host.is_none());
        assert_eq!(parsed.pipeline.v2_idea_enabled, Some(true));
        assert!(parsed.topics.backend.is_none());
    }

    #[test]
    fn test_file_config_backend_enum() {
        let parsed: FileConfig = serde_json::from_str(
            r#"{"topics": {"backend": "redis"}, "vector": {"backend": "pgvector"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.topics.backend, Some(TopicBackendType::Redis));
        assert_eq!(parsed.vector.backend, Some(VectorBackendType::Pgvector));
    }
}
