//! Topic backend trait definition
//!
//! Step messages need at-least-once delivery: a message is handed to exactly
//! one consumer in a group and re-deliverable until acknowledged. Both the
//! in-memory and the Redis Streams backends implement this interface.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::TopicError;

/// Message received from a stream with its ID for acknowledgment
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Unique message ID (Redis stream ID or memory sequence)
    pub id: String,
    /// Message payload (JSON on the wire)
    pub payload: Vec<u8>,
}

/// Subscription to a stream topic
pub struct StreamSubscription {
    /// Stream of received messages with IDs
    pub receiver: Pin<Box<dyn Stream<Item = Result<StreamMessage, TopicError>> + Send>>,
}

/// Stream statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Total messages in the stream
    pub length: u64,
    /// Messages pending acknowledgment
    pub pending: u64,
    /// Number of consumers in the group
    pub consumers: u64,
    /// Oldest pending message age in milliseconds
    pub oldest_pending_ms: Option<u64>,
}

/// Topic backend trait
///
/// # Delivery semantics
///
/// At-least-once: messages persist until acknowledged, and each message is
/// delivered to one consumer of a group at a time. A consumer crash leaves
/// its messages pending; `stream_claim` lets a healthy consumer take them
/// over after an idle threshold.
#[async_trait]
pub trait TopicBackend: Send + Sync {
    /// Publish a message to the stream; returns the message ID
    async fn stream_publish(&self, topic: &str, payload: &[u8]) -> Result<String, TopicError>;

    /// Subscribe to a stream topic with a consumer group
    ///
    /// # Arguments
    /// - `topic`: stream name
    /// - `group`: consumer group name (e.g., "channeling-report-workers")
    /// - `consumer`: unique consumer name (e.g., "{uuid}:{pid}")
    async fn stream_subscribe(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Result<StreamSubscription, TopicError>;

    /// Acknowledge message processing complete
    ///
    /// Removes the message from the pending list. Must be called after the
    /// handler returns to prevent re-delivery.
    async fn stream_ack(&self, topic: &str, group: &str, id: &str) -> Result<(), TopicError>;

    /// Claim pending messages that have been idle too long
    ///
    /// Used for recovery when consumers crash without acknowledging.
    async fn stream_claim(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<StreamMessage>, TopicError>;

    /// Get stream statistics for monitoring
    async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), TopicError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
