//! Step message producer
//!
//! Publishes step messages with bounded retries and exponential backoff.
//! After exhaustion the publish fails terminally; the control plane surfaces
//! it as a 5xx and consumer-side republish is never attempted.

use std::sync::Arc;

use crate::data::topics::{TopicError, TopicService};
use crate::domain::report::message::StepMessage;
use crate::utils::retry::{ErrorClass, Schedule, retry_with_policy};
use crate::utils::time::now_iso8601;

/// Producer over the topic service
pub struct ReportProducer {
    topics: Arc<TopicService>,
    retries: u32,
}

impl ReportProducer {
    pub fn new(topics: Arc<TopicService>, retries: u32) -> Self {
        Self {
            topics,
            retries: retries.max(1),
        }
    }

    /// Publish one step message, stamping the enqueue timestamp.
    /// Backoff doubles per attempt (1s, 2s, 4s, ...).
    pub async fn publish(&self, topic_name: &str, message: &StepMessage) -> Result<(), TopicError> {
        let mut enriched = message.clone();
        enriched.timestamp = Some(now_iso8601());

        let topic = self.topics.stream_topic::<StepMessage>(topic_name);
        let topic_ref = &topic;
        let message_ref = &enriched;

        let result = retry_with_policy(
            self.retries,
            Schedule::exponential_secs(1),
            |e: &TopicError| {
                if e.is_transient() {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Permanent
                }
            },
            || topic_ref.publish(message_ref),
        )
        .await
        .map(|_| ());

        match &result {
            Ok(()) => tracing::info!(
                topic = topic_name,
                report_id = message.report_id,
                step = message.step.as_str(),
                "Step message published"
            ),
            Err(e) => tracing::error!(
                topic = topic_name,
                report_id = message.report_id,
                step = message.step.as_str(),
                error = %e,
                "Step message publish failed terminally"
            ),
        }

        result
    }
}
