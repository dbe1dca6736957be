//! Topic system error types

use thiserror::Error;

/// Errors from the topic system
#[derive(Error, Debug)]
pub enum TopicError {
    /// Channel closed (no more messages possible)
    #[error("Topic channel closed")]
    ChannelClosed,

    /// Subscriber lagged and missed messages
    #[error("Subscriber lagged, {0} messages skipped")]
    #[allow(dead_code)]
    Lagged(u64),

    /// Connection error (Redis backend)
    #[error("Topic connection error: {0}")]
    Connection(String),

    /// Stream operation error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Consumer group error
    #[error("Consumer group error: {0}")]
    ConsumerGroup(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Topic configuration error: {0}")]
    Config(String),
}

impl TopicError {
    /// Publish-side errors are worth retrying except for config mistakes
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Serialization(_))
    }
}

impl From<deadpool_redis::PoolError> for TopicError {
    fn from(e: deadpool_redis::PoolError) -> Self {
        Self::Connection(e.to_string())
    }
}

impl From<deadpool_redis::redis::RedisError> for TopicError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        Self::Stream(e.to_string())
    }
}
