//! Distributed topic system
//!
//! Stream messaging with pluggable backends:
//! - In-memory (default) - local-only, for development and single-process
//! - Redis Streams (optional) - distributed, for multi-machine deployments
//!
//! Step messages need at-least-once delivery with acknowledgment, so every
//! topic is a stream topic: a message goes to one consumer of the group and
//! is re-deliverable until acknowledged. Messages are JSON on the wire.

mod backend;
mod error;
mod memory;
mod redis;

use std::marker::PhantomData;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{StreamMessage, StreamStats, StreamSubscription, TopicBackend};
pub use error::TopicError;
use memory::MemoryTopicBackend;
use redis::RedisTopicBackend;

use crate::core::config::{TopicBackendType, TopicsConfig};

/// Central topic service - hands out typed stream topics over one backend
pub struct TopicService {
    backend: Arc<dyn TopicBackend>,
}

impl TopicService {
    /// Create a topic service with the in-memory backend
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MemoryTopicBackend::new()),
        }
    }

    /// Create from topics configuration
    pub async fn from_config(config: &TopicsConfig) -> Result<Self, TopicError> {
        let backend: Arc<dyn TopicBackend> = match config.backend {
            TopicBackendType::Memory => Arc::new(MemoryTopicBackend::new()),
            TopicBackendType::Redis => {
                let url = config.redis_url.as_ref().ok_or_else(|| {
                    TopicError::Config("redis_url required for Redis backend".into())
                })?;
                Arc::new(RedisTopicBackend::new(url).await?)
            }
        };

        Ok(Self { backend })
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Create a typed stream topic (at-least-once delivery)
    pub fn stream_topic<T>(&self, name: &str) -> StreamTopic<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        StreamTopic {
            name: name.to_string(),
            backend: Arc::clone(&self.backend),
            _phantom: PhantomData,
        }
    }

    /// Get stream statistics for monitoring
    pub async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError> {
        self.backend.stream_stats(topic, group).await
    }

    /// Health check
    pub async fn health_check(&self) -> Result<(), TopicError> {
        self.backend.health_check().await
    }
}

impl Default for TopicService {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// STREAM TOPIC (at-least-once)
// ============================================================================

/// Typed stream topic; messages are serialized to JSON on publish
pub struct StreamTopic<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    name: String,
    backend: Arc<dyn TopicBackend>,
    _phantom: PhantomData<T>,
}

impl<T> StreamTopic<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Publish a message to the stream; returns the message ID
    pub async fn publish(&self, msg: &T) -> Result<String, TopicError> {
        let payload =
            serde_json::to_vec(msg).map_err(|e| TopicError::Serialization(e.to_string()))?;
        self.backend.stream_publish(&self.name, &payload).await
    }

    /// Subscribe to the stream with a consumer group
    ///
    /// Messages are distributed across consumers in the group.
    /// Call `acker().ack()` after processing each message.
    pub async fn subscribe(
        &self,
        group: &str,
        consumer: &str,
    ) -> Result<StreamTopicSubscriber<T>, TopicError> {
        let subscription = self
            .backend
            .stream_subscribe(&self.name, group, consumer)
            .await?;
        Ok(StreamTopicSubscriber {
            name: self.name.clone(),
            group: group.to_string(),
            backend: Arc::clone(&self.backend),
            subscription,
            _phantom: PhantomData,
        })
    }

    /// Get the topic name
    #[allow(dead_code)]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Acker for acknowledging stream messages (Send + Sync)
#[derive(Clone)]
pub struct StreamAcker {
    name: String,
    group: String,
    backend: Arc<dyn TopicBackend>,
}

impl StreamAcker {
    /// Acknowledge message processing complete
    pub async fn ack(&self, id: &str) -> Result<(), TopicError> {
        self.backend.stream_ack(&self.name, &self.group, id).await
    }
}

/// Subscriber to a typed stream topic
pub struct StreamTopicSubscriber<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    name: String,
    group: String,
    backend: Arc<dyn TopicBackend>,
    subscription: StreamSubscription,
    _phantom: PhantomData<T>,
}

impl<T> StreamTopicSubscriber<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Receive the next raw message (undecoded payload with its ID).
    ///
    /// Decoding is left to the caller so a malformed payload can still be
    /// acknowledged instead of wedging the stream.
    pub async fn recv_raw(&mut self) -> Result<StreamMessage, TopicError> {
        match self.subscription.receiver.next().await {
            Some(result) => result,
            None => Err(TopicError::ChannelClosed),
        }
    }

    /// Receive and decode the next message. Returns `(message_id, message)`.
    #[allow(dead_code)]
    pub async fn recv(&mut self) -> Result<(String, T), TopicError> {
        let msg = self.recv_raw().await?;
        let decoded = decode_payload(&msg.payload)?;
        Ok((msg.id, decoded))
    }

    /// Get an acker for acknowledging messages (Send + Sync)
    pub fn acker(&self) -> StreamAcker {
        StreamAcker {
            name: self.name.clone(),
            group: self.group.clone(),
            backend: Arc::clone(&self.backend),
        }
    }

    /// Claim stuck messages from crashed consumers in the same group
    pub async fn claim_raw(
        &mut self,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<StreamMessage>, TopicError> {
        self.backend
            .stream_claim(&self.name, &self.group, consumer, min_idle_ms, count)
            .await
    }
}

/// Decode a JSON payload into the topic's message type
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, TopicError> {
    serde_json::from_slice(payload).map_err(|e| TopicError::Serialization(e.to_string()))
}
