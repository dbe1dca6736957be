//! Async retry utilities with pluggable backoff schedules
//!
//! One combinator serves every bounded-retry site in the pipeline: message
//! publication, analytics RPC calls, and LLM JSON-parse loops. Callers supply
//! an error classifier so permanent failures short-circuit immediately.

use std::future::Future;
use std::time::Duration;

/// How a concrete error should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt after the scheduled delay
    Transient,
    /// Retrying cannot help; fail immediately
    Permanent,
}

/// Delay schedule between attempts
#[derive(Debug, Clone)]
pub enum Schedule {
    /// `base * 2^attempt` (attempt is zero-based)
    Exponential { base: Duration },
    /// Fixed per-attempt delays; the last entry repeats if attempts exceed it
    Steps(Vec<Duration>),
}

impl Schedule {
    /// Exponential backoff starting at `base_secs` seconds
    pub fn exponential_secs(base_secs: u64) -> Self {
        Self::Exponential {
            base: Duration::from_secs(base_secs),
        }
    }

    /// Fixed delays in seconds
    pub fn steps_secs(secs: &[u64]) -> Self {
        Self::Steps(secs.iter().map(|s| Duration::from_secs(*s)).collect())
    }

    /// Delay after the given zero-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential { base } => *base * 2_u32.saturating_pow(attempt),
            Self::Steps(steps) => {
                let idx = (attempt as usize).min(steps.len().saturating_sub(1));
                steps.get(idx).copied().unwrap_or(Duration::ZERO)
            }
        }
    }
}

/// Retry an async operation with bounded attempts.
///
/// `classify` decides whether an error is worth another attempt. The final
/// error (or any permanent error) is returned to the caller unchanged.
pub async fn retry_with_policy<T, E, F, Fut, C>(
    max_attempts: u32,
    schedule: Schedule,
    classify: C,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> ErrorClass,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts || classify(&e) == ErrorClass::Permanent {
                    return Err(e);
                }
                let delay = schedule.delay(attempt - 1);
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
