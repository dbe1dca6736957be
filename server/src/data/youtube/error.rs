//! YouTube API error type
//!
//! 429/401/403 map to explicit variants so retry policies can classify
//! without string matching; `commentsDisabled` gets its own variant because
//! the comment pipeline treats it as an empty result, not a failure.

use thiserror::Error;

/// Errors from the YouTube Data/Analytics APIs and the transcript service
#[derive(Error, Debug)]
pub enum YoutubeError {
    /// Transport-level error (connect/read timeout, connection reset)
    #[error("YouTube transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// 429 - request quota exceeded for the current window
    #[error("YouTube rate limited: {0}")]
    RateLimited(String),

    /// 401 - missing or expired credentials
    #[error("YouTube unauthorized: {0}")]
    Unauthorized(String),

    /// 403 - daily quota or permission failure
    #[error("YouTube forbidden: {0}")]
    Forbidden(String),

    /// 403 with reason `commentsDisabled` - comments are off for the video
    #[error("Comments are disabled for this video")]
    CommentsDisabled,

    /// Any other non-2xx status
    #[error("YouTube API error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// Response did not have the expected shape
    #[error("Malformed YouTube response: {0}")]
    Malformed(String),
}

impl YoutubeError {
    /// Map a non-2xx response to an error class, sniffing the error body
    /// for the `commentsDisabled` reason.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            403 if body.contains("commentsDisabled") => Self::CommentsDisabled,
            429 => Self::RateLimited(body),
            401 => Self::Unauthorized(body),
            403 => Self::Forbidden(body),
            _ => Self::Status { status, message: body },
        }
    }

    /// Network-class errors worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::RateLimited(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Unauthorized(_) | Self::Forbidden(_) | Self::CommentsDisabled
            | Self::Malformed(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            YoutubeError::from_status(429, "slow down".into()),
            YoutubeError::RateLimited(_)
        ));
        assert!(matches!(
            YoutubeError::from_status(401, "no token".into()),
            YoutubeError::Unauthorized(_)
        ));
        assert!(matches!(
            YoutubeError::from_status(403, "quotaExceeded".into()),
            YoutubeError::Forbidden(_)
        ));
        assert!(matches!(
            YoutubeError::from_status(403, r#"{"reason":"commentsDisabled"}"#.into()),
            YoutubeError::CommentsDisabled
        ));
        assert!(matches!(
            YoutubeError::from_status(500, "oops".into()),
            YoutubeError::Status { status: 500, .. }
        ));
    }

    #[test]
    fn test_is_transient() {
        assert!(YoutubeError::RateLimited("".into()).is_transient());
        assert!(YoutubeError::Status { status: 502, message: String::new() }.is_transient());
        assert!(!YoutubeError::Forbidden("".into()).is_transient());
        assert!(!YoutubeError::CommentsDisabled.is_transient());
    }
}
