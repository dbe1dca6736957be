//! Step messages
//!
//! One record per message, JSON on the wire:
//! `{task_id, report_id, step, google_access_token?, skip_vector_save?, timestamp}`

use serde::{Deserialize, Serialize};

use crate::data::types::TaskAxis;

/// One of the three independently scheduled pipeline steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Overview,
    Analysis,
    Idea,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Analysis => "analysis",
            Self::Idea => "idea",
        }
    }

    /// Task axis this step writes
    pub fn axis(&self) -> TaskAxis {
        match self {
            Self::Overview => TaskAxis::Overview,
            Self::Analysis => TaskAxis::Analysis,
            Self::Idea => TaskAxis::Idea,
        }
    }
}

/// Message dispatched per step over the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMessage {
    pub task_id: i64,
    pub report_id: i64,
    pub step: Step,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_vector_save: Option<bool>,
    /// Set by the producer at enqueue (ISO-8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl StepMessage {
    pub fn new(task_id: i64, report_id: i64, step: Step) -> Self {
        Self {
            task_id,
            report_id,
            step,
            google_access_token: None,
            skip_vector_save: None,
            timestamp: None,
        }
    }

    /// Effective vector-save override (absent means "save")
    pub fn skip_vector_save(&self) -> bool {
        self.skip_vector_save.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Step::Overview).unwrap(), "\"overview\"");
        assert_eq!(serde_json::to_string(&Step::Idea).unwrap(), "\"idea\"");
    }

    #[test]
    fn test_message_round_trip() {
        let msg = StepMessage {
            google_access_token: Some("ya29.token".into()),
            skip_vector_save: Some(true),
            timestamp: Some("2025-08-01T00:00:00Z".into()),
            ..StepMessage::new(1, 2, Step::Analysis)
        };

        let json = serde_json::to_string(&msg).unwrap();
        let back: StepMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
        assert!(back.skip_vector_save());
    }

    #[test]
    fn test_optional_fields_default() {
        let msg: StepMessage =
            serde_json::from_str(r#"{"task_id":1,"report_id":2,"step":"overview"}"#).unwrap();
        assert_eq!(msg.step, Step::Overview);
        assert!(!msg.skip_vector_save());
        assert!(msg.google_access_token.is_none());
    }

    #[test]
    fn test_missing_required_key_fails_decode() {
        let result: Result<StepMessage, _> =
            serde_json::from_str(r#"{"task_id":1,"step":"overview"}"#);
        assert!(result.is_err());
    }
}
