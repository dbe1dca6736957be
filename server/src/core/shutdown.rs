//! Centralized shutdown management

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;

/// Centralized shutdown service for coordinating graceful shutdown
#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    pool: SqlitePool,
}

impl ShutdownService {
    pub fn new(pool: SqlitePool) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            handles: Arc::new(Mutex::new(Vec::new())),
            pool,
        }
    }

    /// Register a background task handle to be awaited during shutdown
    pub async fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().await.push(handle);
    }

    /// Subscribe to the shutdown signal
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Trigger shutdown
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Install SIGINT/SIGTERM handlers that trigger shutdown
    pub fn install_signal_handlers(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                service.trigger();
            }
        });
    }

    /// Trigger shutdown and wait for all registered tasks to complete.
    ///
    /// Workers finish (and acknowledge) their in-flight message before the
    /// database pool is closed.
    pub async fn shutdown(&self) {
        tracing::debug!("Initiating graceful shutdown...");
        self.trigger();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        tracing::debug!(count = handles.len(), "Waiting for background tasks...");

        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(_) => tracing::debug!("All background tasks completed"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for background tasks"
            ),
        }

        self.pool.close().await;
        tracing::debug!("Shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::init_memory_pool;

    #[tokio::test]
    async fn test_shutdown_waits_for_registered_tasks() {
        let pool = init_memory_pool().await.unwrap();
        let service = ShutdownService::new(pool);

        let mut rx = service.subscribe();
        let handle = tokio::spawn(async move {
            let _ = rx.changed().await;
        });
        service.register(handle).await;

        assert!(!*service.subscribe().borrow());
        service.shutdown().await;
        assert!(*service.subscribe().borrow());
    }
}
