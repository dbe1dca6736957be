//! LLM provider error type

use thiserror::Error;

/// Errors from the chat/embedding provider
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level error (connect/read timeout, connection reset)
    #[error("LLM transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the provider
    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not contain the expected content
    #[error("LLM response missing content")]
    MissingContent,
}

impl LlmError {
    /// Rate limits and server-side failures are worth retrying;
    /// auth and quota failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::MissingContent => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_classification() {
        assert!(LlmError::Api { status: 429, message: "rate limited".into() }.is_transient());
        assert!(LlmError::Api { status: 503, message: "overloaded".into() }.is_transient());
        assert!(!LlmError::Api { status: 401, message: "bad key".into() }.is_transient());
        assert!(!LlmError::Api { status: 403, message: "quota".into() }.is_transient());
        assert!(!LlmError::MissingContent.is_transient());
    }
}
