//! Vector store error type

use thiserror::Error;

use crate::data::openai::LlmError;

/// Errors from the vector store (chunk persistence + similarity search)
#[derive(Error, Debug)]
pub enum VectorError {
    /// Database error from the pgvector backend
    #[error("Vector store database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedding provider error
    #[error("Embedding error: {0}")]
    Embedding(#[from] LlmError),

    /// Configuration error
    #[error("Vector store configuration error: {0}")]
    Config(String),
}

impl VectorError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            Self::Embedding(e) => e.is_transient(),
            Self::Config(_) => false,
        }
    }
}
