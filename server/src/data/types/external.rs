//! Shapes consumed from external RPC dependencies
//!
//! These are the normalized forms the pipeline works with, not the raw API
//! payloads; each adapter owns the mapping from its wire format.

use serde::{Deserialize, Serialize};

/// One transcript line with its time interval in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// One sample in the per-video retention curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionRow {
    pub elapsed_ratio: f64,
    pub audience_watch_ratio: f64,
    pub relative_retention_performance: f64,
}

/// Video details from YouTube Data v3
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoDetails {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub published_at: String,
    pub duration_sec: u64,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub channel_id: Option<String>,
    pub channel_title: String,
}

/// Channel statistics from YouTube Data v3
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelStats {
    pub subscriber_count: i64,
    pub view_count: i64,
    pub video_count: i64,
}

/// Per-video engagement totals from YouTube Analytics v2 (SEO/revisit inputs)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalyticsTotals {
    pub views: i64,
    pub likes: i64,
    pub shares: i64,
    pub subscribers_gained: i64,
    pub average_view_duration: f64,
    pub total_duration_sec: f64,
}

/// One comment pulled from a comment thread (top-level or reply)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedComment {
    pub content: String,
    pub published_at: String,
    pub like_count: i64,
}

/// One category-popular video used to ground idea generation
#[derive(Debug, Clone, PartialEq)]
pub struct PopularVideo {
    pub title: String,
    pub description: String,
    pub hash_tags: Vec<String>,
}

impl PopularVideo {
    /// Text form indexed into the vector store
    pub fn as_context(&self) -> String {
        format!(
            "제목: {}, 설명: {}, 태그: {}",
            self.title,
            self.description,
            self.hash_tags.join(", ")
        )
    }
}

/// One entry from the real-time trend feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendItem {
    pub keyword: String,
    #[serde(default)]
    pub search_volume: i64,
    #[serde(default)]
    pub increase_percentage: f64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub trend_breakdown: Vec<String>,
}
