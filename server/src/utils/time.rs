//! Time formatting helpers

use chrono::Utc;

/// Current wall-clock time as an ISO-8601 string (message timestamps, chunk meta)
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339()
}

/// Render seconds as `m:ss` for transcript context lines
pub fn format_mmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
