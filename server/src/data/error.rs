//! Unified error type for the relational data layer

use thiserror::Error;

/// Error type for relational store operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Database error from the sqlx driver
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced row does not exist
    #[error("Row not found: {entity} id={id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            Self::Io(_) => true,
            Self::NotFound { .. } | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = DataError::not_found("report", 42);
        assert_eq!(err.to_string(), "Row not found: report id=42");
    }

    #[test]
    fn test_is_transient() {
        assert!(!DataError::Config("bad".into()).is_transient());
        assert!(!DataError::not_found("video", 1).is_transient());
        assert!(DataError::Database(sqlx::Error::PoolTimedOut).is_transient());
    }
}
