// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "channeling";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "channeling.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "CHANNELING_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "CHANNELING_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "CHANNELING_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "CHANNELING_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5608;

/// Default body limit for API requests (1 MB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "channeling.db";

/// Environment variable to override the SQLite database path
pub const ENV_SQLITE_PATH: &str = "CHANNELING_SQLITE_PATH";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Vector Store
// =============================================================================

/// Environment variable for vector store backend (memory or pgvector)
pub const ENV_VECTOR_BACKEND: &str = "CHANNELING_VECTOR_BACKEND";

/// Environment variable for the pgvector PostgreSQL connection URL
pub const ENV_VECTOR_POSTGRES_URL: &str = "CHANNELING_VECTOR_POSTGRES_URL";

/// Character window size for context chunking
pub const VECTOR_CHUNK_SIZE: usize = 150;

/// Character overlap between adjacent context windows
pub const VECTOR_CHUNK_OVERLAP: usize = 15;

/// Default embedding dimension (text-embedding-3-small)
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;

// =============================================================================
// Message Bus
// =============================================================================

/// Environment variable for topic backend (memory or redis)
pub const ENV_TOPIC_BACKEND: &str = "CHANNELING_TOPIC_BACKEND";

/// Environment variable for the Redis URL used by the redis topic backend
pub const ENV_TOPIC_REDIS_URL: &str = "CHANNELING_TOPIC_REDIS_URL";

/// Default Redis URL (works with Redis, Valkey, Dragonfly)
pub const DEFAULT_TOPIC_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Topic carrying overview step messages
pub const TOPIC_OVERVIEW: &str = "overview-topic";

/// Topic carrying analysis step messages
pub const TOPIC_ANALYSIS: &str = "analysis-topic";

/// Topic carrying idea step messages
pub const TOPIC_IDEA: &str = "idea-topic";

/// Suffix for the v2 topic family (handlers skip vector-store writes)
pub const TOPIC_V2_SUFFIX: &str = "-v2";

/// Consumer group shared by all report workers
pub const CONSUMER_GROUP: &str = "channeling-report-workers";

/// Producer publish attempts before a terminal failure
pub const DEFAULT_PRODUCER_RETRIES: u32 = 3;

/// Idle time before a worker claims another consumer's pending message (1 min)
pub const CLAIM_MIN_IDLE_MS: u64 = 60_000;

/// Maximum messages claimed per recovery pass
pub const CLAIM_BATCH: usize = 16;

// =============================================================================
// LLM Provider
// =============================================================================

/// Environment variable for the LLM API key
pub const ENV_LLM_API_KEY: &str = "OPENAI_API_KEY";

/// Default OpenAI-compatible API base URL
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default chat sampling temperature
pub const DEFAULT_CHAT_TEMPERATURE: f64 = 0.7;

/// LLM request timeout in seconds
pub const LLM_TIMEOUT_SECS: u64 = 120;

/// Attempts for prompts that must return valid JSON
pub const DEFAULT_JSON_RETRY_BUDGET: u32 = 4;

// =============================================================================
// YouTube APIs
// =============================================================================

/// Environment variable for the YouTube Data v3 API key
pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";

/// YouTube Data v3 base URL
pub const YOUTUBE_DATA_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// YouTube Analytics v2 reports URL
pub const YOUTUBE_ANALYTICS_URL: &str = "https://youtubeanalytics.googleapis.com/v2/reports";

/// Environment variable for the transcript service base URL
pub const ENV_TRANSCRIPT_BASE_URL: &str = "CHANNELING_TRANSCRIPT_URL";

/// Page size for comment thread pagination
pub const COMMENT_PAGE_SIZE: u32 = 100;

/// Hard cap on comments fetched per video
pub const COMMENT_FETCH_CAP: usize = 1000;

/// External RPC timeout in seconds
pub const YOUTUBE_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Trend Feed
// =============================================================================

/// Environment variable for the trend feed API key
pub const ENV_TREND_API_KEY: &str = "SERPAPI_KEY";

/// Trend feed base URL
pub const TREND_BASE_URL: &str = "https://serpapi.com/search";

/// Default trend region code
pub const DEFAULT_TREND_GEO: &str = "KR";

/// Default number of trend keywords per set
pub const DEFAULT_TREND_LIMIT: usize = 5;

// =============================================================================
// Pipeline Tuning
// =============================================================================

/// Comment count at or above which sampling kicks in
pub const COMMENT_SAMPLE_THRESHOLD: usize = 200;

/// Fraction of comments kept when sampling
pub const COMMENT_SAMPLE_RATE: f64 = 0.1;

/// Minimum sample size when sampling
pub const COMMENT_SAMPLE_MIN: usize = 20;

/// Retention analysis attempts (network-class errors only)
pub const RETENTION_RETRY_ATTEMPTS: u32 = 3;

/// Retention analysis retry delays in seconds, indexed by attempt
pub const RETENTION_RETRY_DELAYS_SECS: [u64; 3] = [5, 10, 15];

/// Placeholder persisted when retention analysis exhausts its retries
pub const RETENTION_FAILURE_PLACEHOLDER: &str = "시청자 이탈 분석 실패 (네트워크 타임아웃)";

/// Chunks retrieved per grounding question in retention analysis
pub const RETENTION_RETRIEVAL_K: usize = 3;

/// Prior optimization cases retrieved for the algorithm sub-phase
pub const OPTIMIZATION_RETRIEVAL_K: usize = 3;

/// Similar popular-video chunks retrieved for idea generation
pub const IDEA_RETRIEVAL_K: usize = 5;

/// Category-popular videos fetched for idea grounding
pub const IDEA_POPULAR_COUNT: usize = 3;

/// Polls of report.summary by the idea step (best-effort hint)
pub const SUMMARY_WAIT_ATTEMPTS: u32 = 3;

/// Delay between summary polls in seconds
pub const SUMMARY_WAIT_DELAY_SECS: u64 = 1;

// =============================================================================
// Shutdown
// =============================================================================

/// Graceful shutdown timeout in seconds (5 minutes)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 300;
