//! Step worker
//!
//! One worker per topic: subscribes with the shared consumer group, claims
//! messages stuck on crashed consumers, dispatches to its registered handler
//! and writes the terminal task-axis status. The offset is acknowledged
//! after every handler return - success or failure - so a poison message can
//! never wedge the stream; terminal failure is recorded on the task axis
//! instead.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::constants::{CLAIM_BATCH, CLAIM_MIN_IDLE_MS};
use crate::data::sqlite::repositories::task;
use crate::data::topics::{StreamAcker, StreamMessage, TopicError, TopicService, decode_payload};
use crate::data::types::StepStatus;
use crate::domain::report::handler::{StepHandler, StepOutcome};
use crate::domain::report::message::StepMessage;

/// Worker binding one topic to one step handler
pub struct StepWorker {
    pool: SqlitePool,
    topics: Arc<TopicService>,
    handler: Arc<dyn StepHandler>,
    topic_name: String,
    group: String,
    /// v2 topic family: force skip_vector_save unless the message overrides
    force_skip_vector_save: bool,
}

impl StepWorker {
    pub fn new(
        pool: SqlitePool,
        topics: Arc<TopicService>,
        handler: Arc<dyn StepHandler>,
        topic_name: impl Into<String>,
        group: impl Into<String>,
        force_skip_vector_save: bool,
    ) -> Self {
        Self {
            pool,
            topics,
            handler,
            topic_name: topic_name.into(),
            group: group.into(),
            force_skip_vector_save,
        }
    }

    /// Spawn the consume loop
    pub fn start(self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let consumer = format!("{}:{}", uuid::Uuid::new_v4(), std::process::id());
            let topic = self.topics.stream_topic::<StepMessage>(&self.topic_name);

            let mut subscriber = loop {
                match topic.subscribe(&self.group, &consumer).await {
                    Ok(sub) => break sub,
                    Err(e) => {
                        tracing::warn!(
                            topic = %self.topic_name,
                            error = %e,
                            "Subscribe failed, retrying"
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            };

            tracing::info!(
                topic = %self.topic_name,
                group = %self.group,
                consumer = %consumer,
                step = self.handler.step().as_str(),
                "Step worker started"
            );

            if let Ok(stats) = self.topics.stream_stats(&self.topic_name, &self.group).await {
                tracing::debug!(
                    topic = %self.topic_name,
                    length = stats.length,
                    pending = stats.pending,
                    consumers = stats.consumers,
                    oldest_pending_ms = stats.oldest_pending_ms,
                    "Topic state at startup"
                );
            }

            let acker = subscriber.acker();

            // Recovery pass: take over messages a crashed consumer left
            // pending in this group
            match subscriber
                .claim_raw(&consumer, CLAIM_MIN_IDLE_MS, CLAIM_BATCH)
                .await
            {
                Ok(claimed) if !claimed.is_empty() => {
                    tracing::info!(
                        topic = %self.topic_name,
                        count = claimed.len(),
                        "Claimed stuck messages"
                    );
                    for raw in claimed {
                        self.process(raw, &acker).await;
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(topic = %self.topic_name, error = %e, "Claim pass failed"),
            }

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!(topic = %self.topic_name, "Step worker shutting down");
                            break;
                        }
                    }
                    result = subscriber.recv_raw() => {
                        match result {
                            Ok(raw) => self.process(raw, &acker).await,
                            Err(TopicError::ChannelClosed) => break,
                            Err(e) => {
                                tracing::warn!(topic = %self.topic_name, error = %e, "Receive error");
                            }
                        }
                    }
                }
            }

            tracing::debug!(topic = %self.topic_name, "Step worker stopped");
        })
    }

    /// Validate, dispatch, record the axis, acknowledge
    async fn process(&self, raw: StreamMessage, acker: &StreamAcker) {
        match decode_payload::<StepMessage>(&raw.payload) {
            Ok(mut message) => {
                if self.force_skip_vector_save {
                    message.skip_vector_save.get_or_insert(true);
                }
                if message.step != self.handler.step() {
                    tracing::warn!(
                        topic = %self.topic_name,
                        message_step = message.step.as_str(),
                        handler_step = self.handler.step().as_str(),
                        "Message step does not match topic handler"
                    );
                }
                self.dispatch(&message).await;
            }
            Err(e) => {
                // Invariant violation: no retry; record FAILED when the
                // message still carries enough to locate the task
                tracing::error!(
                    topic = %self.topic_name,
                    error = %e,
                    "Malformed step message"
                );
                if let Ok(value) = decode_payload::<serde_json::Value>(&raw.payload)
                    && let Some(task_id) = value.get("task_id").and_then(|v| v.as_i64())
                {
                    self.record_axis(task_id, StepStatus::Failed).await;
                }
            }
        }

        if let Err(e) = acker.ack(&raw.id).await {
            tracing::warn!(topic = %self.topic_name, id = %raw.id, error = %e, "Ack failed");
        }
    }

    async fn dispatch(&self, message: &StepMessage) {
        tracing::info!(
            topic = %self.topic_name,
            task_id = message.task_id,
            report_id = message.report_id,
            step = message.step.as_str(),
            "Handling step message"
        );

        match self.handler.handle(message).await {
            Ok(StepOutcome::Completed) => {
                self.record_axis(message.task_id, StepStatus::Completed).await;
            }
            Ok(StepOutcome::Skipped) => {
                // Stale message; leave the axis untouched
                tracing::info!(
                    task_id = message.task_id,
                    report_id = message.report_id,
                    "Step skipped for stale message"
                );
            }
            Err(e) => {
                tracing::error!(
                    task_id = message.task_id,
                    report_id = message.report_id,
                    step = message.step.as_str(),
                    error = %e,
                    "Step handler failed"
                );
                self.record_axis(message.task_id, StepStatus::Failed).await;
            }
        }
    }

    async fn record_axis(&self, task_id: i64, status: StepStatus) {
        let axis = self.handler.step().axis();
        match task::set_axis_status(&self.pool, task_id, axis, status).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(task_id, axis = axis.as_str(), "No task row for axis update")
            }
            Err(e) => {
                tracing::error!(task_id, axis = axis.as_str(), error = %e, "Axis update failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::data::sqlite::init_memory_pool;
    use crate::data::sqlite::repositories::report::insert_report;
    use crate::data::sqlite::repositories::task::{get_task, insert_task};
    use crate::domain::error::StepError;
    use crate::domain::report::message::Step;

    /// Handler scripted to succeed, fail, or skip
    struct ScriptedHandler {
        step: Step,
        outcome: Result<StepOutcome, ()>,
        calls: Arc<AtomicUsize>,
        seen_skip_flags: Arc<parking_lot::Mutex<Vec<bool>>>,
    }

    #[async_trait]
    impl StepHandler for ScriptedHandler {
        fn step(&self) -> Step {
            self.step
        }

        async fn handle(&self, message: &StepMessage) -> Result<StepOutcome, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_skip_flags.lock().push(message.skip_vector_save());
            match self.outcome {
                Ok(outcome) => Ok(outcome),
                Err(()) => Err(StepError::Invalid("scripted failure".into())),
            }
        }
    }

    struct Harness {
        pool: SqlitePool,
        topics: Arc<TopicService>,
        task_id: i64,
        report_id: i64,
        calls: Arc<AtomicUsize>,
        skip_flags: Arc<parking_lot::Mutex<Vec<bool>>>,
        shutdown_tx: watch::Sender<bool>,
        handle: JoinHandle<()>,
    }

    async fn start_worker(
        step: Step,
        outcome: Result<StepOutcome, ()>,
        topic: &str,
        force_skip: bool,
    ) -> Harness {
        let pool = init_memory_pool().await.unwrap();
        let report_row = insert_report(&pool, 1).await.unwrap();
        let task_row = insert_task(&pool, report_row.id, StepStatus::Pending)
            .await
            .unwrap();

        let topics = Arc::new(TopicService::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let skip_flags = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let worker = StepWorker::new(
            pool.clone(),
            topics.clone(),
            Arc::new(ScriptedHandler {
                step,
                outcome,
                calls: calls.clone(),
                seen_skip_flags: skip_flags.clone(),
            }),
            topic,
            "test-group",
            force_skip,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = worker.start(shutdown_rx);

        Harness {
            pool,
            topics,
            task_id: task_row.id,
            report_id: report_row.id,
            calls,
            skip_flags,
            shutdown_tx,
            handle,
        }
    }

    async fn wait_for_calls(calls: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if calls.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("worker never processed the message");
    }

    #[tokio::test]
    async fn test_completed_outcome_marks_axis() {
        let h = start_worker(Step::Overview, Ok(StepOutcome::Completed), "overview-topic", false)
            .await;

        let topic = h.topics.stream_topic::<StepMessage>("overview-topic");
        topic
            .publish(&StepMessage::new(h.task_id, h.report_id, Step::Overview))
            .await
            .unwrap();

        wait_for_calls(&h.calls, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let task_row = get_task(&h.pool, h.task_id).await.unwrap().unwrap();
        assert_eq!(task_row.overview_status, StepStatus::Completed);
        assert_eq!(task_row.analysis_status, StepStatus::Pending);

        // Message was acknowledged
        let stats = h.topics.stream_stats("overview-topic", "test-group").await.unwrap();
        assert_eq!(stats.pending, 0);

        let _ = h.shutdown_tx.send(true);
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn test_handler_error_marks_axis_failed_and_acks() {
        let h = start_worker(Step::Analysis, Err(()), "analysis-topic", false).await;

        let topic = h.topics.stream_topic::<StepMessage>("analysis-topic");
        topic
            .publish(&StepMessage::new(h.task_id, h.report_id, Step::Analysis))
            .await
            .unwrap();

        wait_for_calls(&h.calls, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let task_row = get_task(&h.pool, h.task_id).await.unwrap().unwrap();
        assert_eq!(task_row.analysis_status, StepStatus::Failed);

        // Poison-pill avoidance: still acknowledged
        let stats = h.topics.stream_stats("analysis-topic", "test-group").await.unwrap();
        assert_eq!(stats.pending, 0);

        let _ = h.shutdown_tx.send(true);
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn test_skipped_outcome_leaves_axis_pending() {
        let h = start_worker(Step::Idea, Ok(StepOutcome::Skipped), "idea-topic", false).await;

        let topic = h.topics.stream_topic::<StepMessage>("idea-topic");
        topic
            .publish(&StepMessage::new(h.task_id, h.report_id, Step::Idea))
            .await
            .unwrap();

        wait_for_calls(&h.calls, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let task_row = get_task(&h.pool, h.task_id).await.unwrap().unwrap();
        assert_eq!(task_row.idea_status, StepStatus::Pending);

        let _ = h.shutdown_tx.send(true);
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn test_v2_topic_forces_skip_vector_save() {
        let h = start_worker(
            Step::Overview,
            Ok(StepOutcome::Completed),
            "overview-topic-v2",
            true,
        )
        .await;

        let topic = h.topics.stream_topic::<StepMessage>("overview-topic-v2");
        topic
            .publish(&StepMessage::new(h.task_id, h.report_id, Step::Overview))
            .await
            .unwrap();

        wait_for_calls(&h.calls, 1).await;
        assert_eq!(h.skip_flags.lock().as_slice(), &[true]);

        let _ = h.shutdown_tx.send(true);
        let _ = h.handle.await;
    }

    #[tokio::test]
    async fn test_malformed_message_marks_failed_via_task_id() {
        let h = start_worker(Step::Overview, Ok(StepOutcome::Completed), "overview-topic", false)
            .await;

        // Missing report_id: typed decode fails but task_id is recoverable
        let payload = format!(r#"{{"task_id":{},"step":"overview"}}"#, h.task_id);
        let raw_topic = h.topics.stream_topic::<serde_json::Value>("overview-topic");
        raw_topic
            .publish(&serde_json::from_str(&payload).unwrap())
            .await
            .unwrap();

        for _ in 0..100 {
            let task_row = get_task(&h.pool, h.task_id).await.unwrap().unwrap();
            if task_row.overview_status == StepStatus::Failed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let task_row = get_task(&h.pool, h.task_id).await.unwrap().unwrap();
        assert_eq!(task_row.overview_status, StepStatus::Failed);
        // Handler never ran
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);

        let _ = h.shutdown_tx.send(true);
        let _ = h.handle.await;
    }
}
