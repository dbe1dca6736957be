//! Step-level error type
//!
//! Sub-phases surface errors to their step handler; the worker translates
//! them into the terminal task-axis status. Variants wrap each layer's error
//! so classification (`is_transient`) survives the climb.

use thiserror::Error;

use crate::data::DataError;
use crate::data::openai::LlmError;
use crate::data::trends::TrendError;
use crate::data::vector::VectorError;
use crate::data::youtube::YoutubeError;
use crate::domain::rag::RagError;
use crate::utils::retry::ErrorClass;

/// Errors raised by step handlers and their sub-phases
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Youtube(#[from] YoutubeError),

    #[error(transparent)]
    Trend(#[from] TrendError),

    #[error(transparent)]
    Rag(#[from] RagError),

    /// Message or entity violated an invariant (missing key, bad enum value)
    #[error("Invalid input: {0}")]
    Invalid(String),
}

impl StepError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Data(e) => e.is_transient(),
            Self::Vector(e) => e.is_transient(),
            Self::Llm(e) => e.is_transient(),
            Self::Youtube(e) => e.is_transient(),
            Self::Trend(e) => e.is_transient(),
            Self::Rag(e) => e.is_transient(),
            Self::Invalid(_) => false,
        }
    }

    /// Classifier for the retry combinator
    pub fn classify(&self) -> ErrorClass {
        if self.is_transient() {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        }
    }
}
