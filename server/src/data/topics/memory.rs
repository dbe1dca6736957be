//! In-memory topic backend
//!
//! Stream semantics simulated with a VecDeque plus per-group pending
//! tracking. Suitable for local development, single-process deployments and
//! tests; a process crash loses all messages. For durability and
//! multi-machine deployments use the Redis backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Notify;

use super::backend::{StreamMessage, StreamStats, StreamSubscription, TopicBackend};
use super::error::TopicError;

/// Default stream max length (approximate, trimmed on publish)
const DEFAULT_STREAM_MAX_LEN: usize = 100_000;

/// Message stored in a memory stream
#[derive(Clone)]
struct StreamEntry {
    id: u64,
    payload: Vec<u8>,
}

/// Consumer group state for a stream
#[derive(Clone, Default)]
struct ConsumerGroup {
    /// Last delivered ID for each consumer
    last_delivered: HashMap<String, u64>,
    /// Pending messages: message_id -> (consumer, delivery_time)
    pending: HashMap<u64, (String, Instant)>,
}

/// Stream state
struct StreamState {
    messages: VecDeque<StreamEntry>,
    groups: HashMap<String, ConsumerGroup>,
    next_id: u64,
    max_len: usize,
}

impl Default for StreamState {
    fn default() -> Self {
        Self {
            messages: VecDeque::new(),
            groups: HashMap::new(),
            next_id: 1,
            max_len: DEFAULT_STREAM_MAX_LEN,
        }
    }
}

struct SharedState {
    streams: RwLock<HashMap<String, StreamState>>,
    /// Per-stream notifiers for immediate subscriber wakeup (avoids polling)
    notifiers: RwLock<HashMap<String, Arc<Notify>>>,
}

/// In-memory topic backend
pub struct MemoryTopicBackend {
    state: Arc<SharedState>,
}

impl Clone for MemoryTopicBackend {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MemoryTopicBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTopicBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(SharedState {
                streams: RwLock::new(HashMap::new()),
                notifiers: RwLock::new(HashMap::new()),
            }),
        }
    }

    fn trim_stream(stream: &mut StreamState) {
        while stream.messages.len() > stream.max_len {
            if let Some(entry) = stream.messages.pop_front() {
                for group in stream.groups.values_mut() {
                    group.pending.remove(&entry.id);
                }
            }
        }
    }

    fn get_or_create_notifier(&self, topic: &str) -> Arc<Notify> {
        {
            let notifiers = self.state.notifiers.read();
            if let Some(n) = notifiers.get(topic) {
                return Arc::clone(n);
            }
        }
        let mut notifiers = self.state.notifiers.write();
        if let Some(n) = notifiers.get(topic) {
            return Arc::clone(n);
        }
        let n = Arc::new(Notify::new());
        notifiers.insert(topic.to_string(), Arc::clone(&n));
        n
    }
}

#[async_trait]
impl TopicBackend for MemoryTopicBackend {
    async fn stream_publish(&self, topic: &str, payload: &[u8]) -> Result<String, TopicError> {
        let id = {
            let mut streams = self.state.streams.write();
            let stream = streams.entry(topic.to_string()).or_default();

            let id = stream.next_id;
            stream.next_id += 1;

            stream.messages.push_back(StreamEntry {
                id,
                payload: payload.to_vec(),
            });

            Self::trim_stream(stream);
            id
        };

        // Wake a subscriber immediately; notify_one stores a permit so a
        // publish racing the subscriber's empty-check is never lost
        self.get_or_create_notifier(topic).notify_one();

        Ok(id.to_string())
    }

    async fn stream_subscribe(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
    ) -> Result<StreamSubscription, TopicError> {
        {
            let mut streams = self.state.streams.write();
            let stream = streams.entry(topic.to_string()).or_default();
            stream.groups.entry(group.to_string()).or_default();
        }

        let topic = topic.to_string();
        let group = group.to_string();
        let consumer = consumer.to_string();
        let state = Arc::clone(&self.state);
        let notifier = self.get_or_create_notifier(&topic);

        let stream = stream! {
            let mut last_seen: u64 = 0;

            {
                let streams = state.streams.read();
                if let Some(stream_state) = streams.get(&topic)
                    && let Some(cg) = stream_state.groups.get(&group)
                    && let Some(&last) = cg.last_delivered.get(&consumer)
                {
                    last_seen = last;
                }
            }

            loop {
                // Scope the lock so it is never held across an await point
                let maybe_msg = {
                    let mut streams = state.streams.write();
                    let stream_state = streams.entry(topic.clone()).or_default();
                    let cg = stream_state.groups.entry(group.clone()).or_default();

                    let mut found = None;
                    for entry in &stream_state.messages {
                        if entry.id > last_seen && !cg.pending.contains_key(&entry.id) {
                            found = Some(entry.clone());
                            break;
                        }
                    }

                    found.map(|entry| {
                        cg.pending.insert(entry.id, (consumer.clone(), Instant::now()));
                        cg.last_delivered.insert(consumer.clone(), entry.id);
                        last_seen = entry.id;
                        StreamMessage {
                            id: entry.id.to_string(),
                            payload: entry.payload,
                        }
                    })
                };

                if let Some(msg) = maybe_msg {
                    yield Ok(msg);
                } else {
                    notifier.notified().await;
                }
            }
        };

        Ok(StreamSubscription {
            receiver: Box::pin(stream),
        })
    }

    async fn stream_ack(&self, topic: &str, group: &str, id: &str) -> Result<(), TopicError> {
        let id: u64 = id
            .parse()
            .map_err(|_| TopicError::Stream(format!("invalid message id: {id}")))?;

        let mut streams = self.state.streams.write();
        let stream = streams
            .get_mut(topic)
            .ok_or_else(|| TopicError::Stream(format!("stream not found: {topic}")))?;

        let cg = stream.groups.get_mut(group).ok_or_else(|| {
            TopicError::ConsumerGroup(format!("consumer group not found: {group}"))
        })?;

        cg.pending.remove(&id);
        Ok(())
    }

    async fn stream_claim(
        &self,
        topic: &str,
        group: &str,
        consumer: &str,
        min_idle_ms: u64,
        count: usize,
    ) -> Result<Vec<StreamMessage>, TopicError> {
        let mut streams = self.state.streams.write();
        let Some(stream) = streams.get_mut(topic) else {
            return Ok(vec![]);
        };
        let Some(cg) = stream.groups.get_mut(group) else {
            return Ok(vec![]);
        };

        let now = Instant::now();
        let min_idle = std::time::Duration::from_millis(min_idle_ms);

        let idle_ids: Vec<u64> = cg
            .pending
            .iter()
            .filter(|(_, (_, delivered))| now.duration_since(*delivered) >= min_idle)
            .map(|(&id, _)| id)
            .take(count)
            .collect();

        let mut claimed = Vec::new();
        for id in idle_ids {
            if let Some(entry) = stream.messages.iter().find(|e| e.id == id) {
                cg.pending.insert(id, (consumer.to_string(), Instant::now()));
                claimed.push(StreamMessage {
                    id: id.to_string(),
                    payload: entry.payload.clone(),
                });
            }
        }

        Ok(claimed)
    }

    async fn stream_stats(&self, topic: &str, group: &str) -> Result<StreamStats, TopicError> {
        let streams = self.state.streams.read();
        let Some(stream) = streams.get(topic) else {
            return Ok(StreamStats::default());
        };

        let Some(cg) = stream.groups.get(group) else {
            return Ok(StreamStats {
                length: stream.messages.len() as u64,
                ..Default::default()
            });
        };

        let now = Instant::now();
        let oldest_pending_ms = cg
            .pending
            .values()
            .map(|(_, delivered)| now.duration_since(*delivered).as_millis() as u64)
            .max();

        Ok(StreamStats {
            length: stream.messages.len() as u64,
            pending: cg.pending.len() as u64,
            consumers: cg.last_delivered.len() as u64,
            oldest_pending_ms,
        })
    }

    async fn health_check(&self) -> Result<(), TopicError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_publish_subscribe_ack() {
        let backend = MemoryTopicBackend::new();

        let id = backend.stream_publish("stream", b"msg1").await.unwrap();
        assert_eq!(id, "1");

        let sub = backend
            .stream_subscribe("stream", "group1", "consumer1")
            .await
            .unwrap();
        let mut receiver = sub.receiver;

        let msg = tokio::time::timeout(Duration::from_millis(500), receiver.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(msg.id, "1");
        assert_eq!(msg.payload, b"msg1");

        backend.stream_ack("stream", "group1", &msg.id).await.unwrap();

        let stats = backend.stream_stats("stream", "group1").await.unwrap();
        assert_eq!(stats.length, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_group_distributes_messages() {
        let backend = MemoryTopicBackend::new();

        backend.stream_publish("t", b"a").await.unwrap();
        backend.stream_publish("t", b"b").await.unwrap();

        let mut rx1 = backend
            .stream_subscribe("t", "g", "c1")
            .await
            .unwrap()
            .receiver;
        let m1 = tokio::time::timeout(Duration::from_millis(500), rx1.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let mut rx2 = backend
            .stream_subscribe("t", "g", "c2")
            .await
            .unwrap()
            .receiver;
        let m2 = tokio::time::timeout(Duration::from_millis(500), rx2.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        // Pending messages are not re-delivered to the other consumer
        assert_ne!(m1.id, m2.id);
    }

    #[tokio::test]
    async fn test_claim_idle_pending() {
        let backend = MemoryTopicBackend::new();

        backend.stream_publish("t", b"stuck").await.unwrap();

        // Consumer c1 receives but never acks
        let mut rx1 = backend
            .stream_subscribe("t", "g", "c1")
            .await
            .unwrap()
            .receiver;
        let _ = tokio::time::timeout(Duration::from_millis(500), rx1.next())
            .await
            .unwrap();

        // Nothing is idle long enough yet
        let claimed = backend.stream_claim("t", "g", "c2", 60_000, 10).await.unwrap();
        assert!(claimed.is_empty());

        // With a zero idle threshold c2 can take it over
        let claimed = backend.stream_claim("t", "g", "c2", 0, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].payload, b"stuck");
    }

    #[tokio::test]
    async fn test_ack_unknown_stream_is_error() {
        let backend = MemoryTopicBackend::new();
        let result = backend.stream_ack("missing", "g", "1").await;
        assert!(matches!(result, Err(TopicError::Stream(_))));
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(MemoryTopicBackend::new().backend_name(), "memory");
    }
}
