//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes::{health, reports, tasks};
use crate::core::config::{ServerConfig, TopicsConfig};
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::domain::report::ReportProducer;

/// Shared state for route handlers
#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub producer: Arc<ReportProducer>,
    pub topics: TopicsConfig,
    pub v2_idea_enabled: bool,
}

/// Control-plane HTTP server
pub struct ApiServer {
    server: ServerConfig,
    state: ApiState,
}

impl ApiServer {
    pub fn new(server: ServerConfig, state: ApiState) -> Self {
        Self { server, state }
    }

    pub fn router(state: ApiState) -> Router {
        Router::new()
            .route("/api/v1/health", get(health::health))
            .route("/api/v1/reports", post(reports::create_report))
            .route("/api/v1/reports/v2", post(reports::create_report_v2))
            .route("/api/v1/reports/{id}", get(reports::get_report))
            .route("/api/v1/tasks/{id}", get(tasks::get_task))
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve until the shutdown signal flips
    pub async fn start(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = SocketAddr::new(self.server.host.parse()?, self.server.port);
        let router = Self::router(self.state);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "API server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown_rx.changed().await.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            })
            .await?;

        tracing::debug!("API server stopped");
        Ok(())
    }
}
