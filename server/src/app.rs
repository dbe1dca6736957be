//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::api::{ApiServer, ApiState};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::config::TopicsConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::openai::{OpenAiChat, OpenAiEmbeddings};
use crate::data::sqlite;
use crate::data::topics::TopicService;
use crate::data::trends::SerpTrendClient;
use crate::data::vector::VectorStore;
use crate::data::youtube::{TranscriptClient, YoutubeAnalyticsClient, YoutubeDataClient};
use crate::domain::comments::CommentPipeline;
use crate::domain::metrics::MetricsAnalyzer;
use crate::domain::rag::{ChunkingEngine, RagExecutor};
use crate::domain::report::{
    AnalysisHandler, IdeaHandler, OverviewHandler, ReportProducer, StepHandler, StepWorker,
};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub pool: SqlitePool,
    pub topics: Arc<TopicService>,
    pub vector: Arc<VectorStore>,
    pub producer: Arc<ReportProducer>,
    overview: Arc<OverviewHandler>,
    analysis: Arc<AnalysisHandler>,
    idea: Arc<IdeaHandler>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        let app = Self::init(&cli_config).await?;

        match command {
            Some(Commands::Worker { topics }) => app.run_worker(&topics).await,
            Some(Commands::Start) | None => app.run_server().await,
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let pool = sqlite::init_pool(&config.database.sqlite_path)
            .await
            .context("Failed to initialize SQLite")?;

        let topics = Arc::new(
            TopicService::from_config(&config.topics)
                .await
                .context("Failed to initialize topic service")?,
        );
        tracing::debug!(backend = topics.backend_name(), "Topics initialized");

        let chat = Arc::new(OpenAiChat::new(&config.llm).context("Failed to build chat client")?);
        let embeddings = Arc::new(
            OpenAiEmbeddings::new(&config.llm).context("Failed to build embedding client")?,
        );

        let vector = Arc::new(
            VectorStore::from_config(&config.vector, embeddings.clone())
                .await
                .context("Failed to initialize vector store")?,
        );
        tracing::debug!(backend = vector.backend_name(), "Vector store initialized");

        let rag = Arc::new(RagExecutor::new(chat));
        let chunking = Arc::new(ChunkingEngine::new(
            vector.clone(),
            rag.clone(),
            config.pipeline.json_retry_budget,
        ));

        let transcripts = Arc::new(
            TranscriptClient::new(config.youtube.transcript_base_url.clone())
                .context("Failed to build transcript client")?,
        );
        let data_api = Arc::new(
            YoutubeDataClient::new(config.youtube.api_key.clone())
                .context("Failed to build YouTube data client")?,
        );
        let analytics = Arc::new(
            YoutubeAnalyticsClient::new().context("Failed to build YouTube analytics client")?,
        );
        let trend_feed = Arc::new(
            SerpTrendClient::new(config.trends.api_key.clone(), config.trends.geo.clone())
                .context("Failed to build trend client")?,
        );

        let comments = Arc::new(CommentPipeline::new(
            pool.clone(),
            data_api.clone(),
            rag.clone(),
        ));
        let metrics = Arc::new(MetricsAnalyzer::new(pool.clone(), embeddings));

        let overview = Arc::new(OverviewHandler::new(
            pool.clone(),
            vector.clone(),
            rag.clone(),
            transcripts.clone(),
            data_api.clone(),
            analytics.clone(),
            comments,
            metrics,
        ));
        let analysis = Arc::new(AnalysisHandler::new(
            pool.clone(),
            vector.clone(),
            rag.clone(),
            chunking,
            transcripts,
            analytics,
            data_api.clone(),
        ));
        let idea = Arc::new(IdeaHandler::new(
            pool.clone(),
            vector.clone(),
            rag,
            data_api,
            trend_feed,
            config.trends.limit,
            config.pipeline.json_retry_budget,
        ));

        let producer = Arc::new(ReportProducer::new(
            topics.clone(),
            config.topics.producer_retries,
        ));
        let shutdown = ShutdownService::new(pool.clone());

        Ok(Self {
            shutdown,
            config,
            pool,
            topics,
            vector,
            producer,
            overview,
            analysis,
            idea,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Fail fast when a configured backend is unreachable
    async fn verify_backends(&self) -> Result<()> {
        self.topics
            .health_check()
            .await
            .map_err(|e| anyhow::anyhow!("Topic backend unhealthy: {e}"))?;
        self.vector
            .health_check()
            .await
            .map_err(|e| anyhow::anyhow!("Vector backend unhealthy: {e}"))?;
        Ok(())
    }

    /// Handler registered for a topic name, or None for unknown topics
    fn handler_for_topic(&self, topic: &str) -> Option<(Arc<dyn StepHandler>, bool)> {
        let topics = &self.config.topics;
        let v2 = |name: &str| TopicsConfig::v2_topic(name);

        if topic == topics.overview_topic {
            Some((self.overview.clone(), false))
        } else if topic == v2(&topics.overview_topic) {
            Some((self.overview.clone(), true))
        } else if topic == topics.analysis_topic {
            Some((self.analysis.clone(), false))
        } else if topic == v2(&topics.analysis_topic) {
            Some((self.analysis.clone(), true))
        } else if topic == topics.idea_topic {
            Some((self.idea.clone(), false))
        } else if topic == v2(&topics.idea_topic) {
            Some((self.idea.clone(), true))
        } else {
            None
        }
    }

    /// Spawn one worker per topic name
    async fn start_workers(&self, topic_names: &[String]) -> Result<()> {
        for topic in topic_names {
            let Some((handler, force_skip)) = self.handler_for_topic(topic) else {
                tracing::warn!(topic = %topic, "No handler registered for topic, ignoring");
                continue;
            };

            let worker = StepWorker::new(
                self.pool.clone(),
                self.topics.clone(),
                handler,
                topic.clone(),
                self.config.topics.group_id.clone(),
                force_skip,
            );
            self.shutdown
                .register(worker.start(self.shutdown.subscribe()))
                .await;
        }

        tracing::debug!(count = topic_names.len(), "Workers started");
        Ok(())
    }

    /// All six topics: base family plus v2 variants
    fn all_topics(&self) -> Vec<String> {
        let topics = &self.config.topics;
        topics
            .base_topics()
            .iter()
            .flat_map(|name| [name.to_string(), TopicsConfig::v2_topic(name)])
            .collect()
    }

    /// `start`: control plane plus embedded workers for every topic
    async fn run_server(self) -> Result<()> {
        self.verify_backends().await?;
        self.shutdown.install_signal_handlers();
        self.start_workers(&self.all_topics()).await?;

        let state = ApiState {
            pool: self.pool.clone(),
            producer: self.producer.clone(),
            topics: self.config.topics.clone(),
            v2_idea_enabled: self.config.pipeline.v2_idea_enabled,
        };

        let server = ApiServer::new(self.config.server.clone(), state);
        server.start(self.shutdown.subscribe()).await?;

        self.shutdown.shutdown().await;
        Ok(())
    }

    /// `worker --topics ...`: consume the given topics, no HTTP surface
    async fn run_worker(self, topic_names: &[String]) -> Result<()> {
        self.verify_backends().await?;
        self.shutdown.install_signal_handlers();
        self.start_workers(topic_names).await?;

        // Park until a signal arrives, then drain
        let mut rx = self.shutdown.subscribe();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                break;
            }
        }

        self.shutdown.shutdown().await;
        Ok(())
    }
}
