//! Row types for the relational store
//!
//! Columns mirror the SQL schema in `data::sqlite::schema`. Status and type
//! enums are stored as TEXT; conversion helpers live next to the enums so
//! repositories never hand-roll string matching.

use serde::{Deserialize, Serialize};

// ============================================================================
// Enums
// ============================================================================

/// Per-axis task state. Each axis moves PENDING → COMPLETED | FAILED exactly
/// once per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// One of the three independently tracked axes on a task row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAxis {
    Overview,
    Analysis,
    Idea,
}

impl TaskAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Analysis => "analysis",
            Self::Idea => "idea",
        }
    }
}

/// Source-type tag on a content chunk; drives retrieval scoping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    VideoSummary,
    CommentReaction,
    ViewerEscapeAnalysis,
    AlgorithmOptimization,
    PersonalizedKeywords,
    IdeaRecommendation,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VideoSummary => "VIDEO_SUMMARY",
            Self::CommentReaction => "COMMENT_REACTION",
            Self::ViewerEscapeAnalysis => "VIEWER_ESCAPE_ANALYSIS",
            Self::AlgorithmOptimization => "ALGORITHM_OPTIMIZATION",
            Self::PersonalizedKeywords => "PERSONALIZED_KEYWORDS",
            Self::IdeaRecommendation => "IDEA_RECOMMENDATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VIDEO_SUMMARY" => Some(Self::VideoSummary),
            "COMMENT_REACTION" => Some(Self::CommentReaction),
            "VIEWER_ESCAPE_ANALYSIS" => Some(Self::ViewerEscapeAnalysis),
            "ALGORITHM_OPTIMIZATION" => Some(Self::AlgorithmOptimization),
            "PERSONALIZED_KEYWORDS" => Some(Self::PersonalizedKeywords),
            "IDEA_RECOMMENDATION" => Some(Self::IdeaRecommendation),
            _ => None,
        }
    }
}

/// Emotion bucket assigned to a comment by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentType {
    Positive,
    Negative,
    Neutral,
    AdviceOpinion,
}

impl CommentType {
    /// All buckets in a stable order (distribution vectors index by this)
    pub const ALL: [CommentType; 4] = [
        Self::Positive,
        Self::Negative,
        Self::Neutral,
        Self::AdviceOpinion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::AdviceOpinion => "ADVICE_OPINION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "POSITIVE" => Some(Self::Positive),
            "NEGATIVE" => Some(Self::Negative),
            "NEUTRAL" => Some(Self::Neutral),
            "ADVICE_OPINION" => Some(Self::AdviceOpinion),
            _ => None,
        }
    }

    /// Map the classifier's integer code to a bucket. Unknown codes fall back
    /// to NEUTRAL so one malformed response never sinks the whole batch.
    pub fn from_emotion_code(code: i64) -> Self {
        match code {
            1 => Self::Positive,
            2 => Self::Negative,
            3 => Self::Neutral,
            4 => Self::AdviceOpinion,
            _ => Self::Neutral,
        }
    }
}

/// Origin of a trend keyword set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendKeywordType {
    RealTime,
    Channel,
}

impl TrendKeywordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RealTime => "REAL_TIME",
            Self::Channel => "CHANNEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REAL_TIME" => Some(Self::RealTime),
            "CHANNEL" => Some(Self::Channel),
            _ => None,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// One report row. Created with only `video_id`; every pipeline sub-phase
/// fills in its own slice via partial update.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i64,
    pub video_id: i64,
    pub title: Option<String>,
    pub view: Option<i64>,
    pub view_topic_avg: Option<f64>,
    pub view_channel_avg: Option<f64>,
    pub like_count: Option<i64>,
    pub like_topic_avg: Option<f64>,
    pub like_channel_avg: Option<f64>,
    pub comment: Option<i64>,
    pub comment_topic_avg: Option<f64>,
    pub comment_channel_avg: Option<f64>,
    pub concept: Option<f64>,
    pub seo: Option<f64>,
    pub revisit: Option<f64>,
    pub summary: Option<String>,
    pub positive_comment: Option<i64>,
    pub negative_comment: Option<i64>,
    pub neutral_comment: Option<i64>,
    pub advice_comment: Option<i64>,
    pub leave_analyze: Option<String>,
    pub optimization: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Partial update of a report: only `Some` fields reach the UPDATE statement,
/// so concurrent handlers writing disjoint slices never clobber each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPatch {
    pub title: Option<String>,
    pub view: Option<i64>,
    pub view_topic_avg: Option<f64>,
    pub view_channel_avg: Option<f64>,
    pub like_count: Option<i64>,
    pub like_topic_avg: Option<f64>,
    pub like_channel_avg: Option<f64>,
    pub comment: Option<i64>,
    pub comment_topic_avg: Option<f64>,
    pub comment_channel_avg: Option<f64>,
    pub concept: Option<f64>,
    pub seo: Option<f64>,
    pub revisit: Option<f64>,
    pub summary: Option<String>,
    pub positive_comment: Option<i64>,
    pub negative_comment: Option<i64>,
    pub neutral_comment: Option<i64>,
    pub advice_comment: Option<i64>,
    pub leave_analyze: Option<String>,
    pub optimization: Option<String>,
}

impl ReportPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Task
// ============================================================================

/// Parallel row tracking three-axis progress of one report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    pub id: i64,
    pub report_id: i64,
    pub overview_status: StepStatus,
    pub analysis_status: StepStatus,
    pub idea_status: StepStatus,
}

// ============================================================================
// Video / Channel (read-only from the pipeline's perspective)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct VideoRow {
    pub id: i64,
    pub channel_id: i64,
    pub youtube_video_id: String,
    /// YouTube category id (shared by peer videos on the same topic)
    pub video_category: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub view: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ChannelRow {
    pub id: i64,
    pub youtube_channel_id: String,
    pub name: String,
    pub concept: Option<String>,
    pub target: Option<String>,
    pub channel_hash_tag: Option<String>,
}

// ============================================================================
// Comment
// ============================================================================

/// Persisted summarized comment (only summary rows survive the pipeline)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRow {
    pub id: i64,
    pub report_id: i64,
    pub content: String,
    pub comment_type: CommentType,
    pub like_count: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub report_id: i64,
    pub content: String,
    pub comment_type: CommentType,
    pub like_count: i64,
}

// ============================================================================
// Idea
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct IdeaRow {
    pub id: i64,
    pub video_id: i64,
    pub title: String,
    pub content: String,
    /// JSON-encoded tag array
    pub hash_tag: String,
    pub is_book_marked: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIdea {
    pub video_id: i64,
    pub title: String,
    pub content: String,
    pub hash_tag: String,
}

// ============================================================================
// TrendKeyword
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendKeywordRow {
    pub id: i64,
    pub report_id: i64,
    pub keyword_type: TrendKeywordType,
    pub keyword: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrendKeyword {
    pub report_id: i64,
    pub keyword_type: TrendKeywordType,
    pub keyword: String,
    /// Relevance score clamped to [0, 100] before insert
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_round_trip() {
        for status in [StepStatus::Pending, StepStatus::Completed, StepStatus::Failed] {
            assert_eq!(StepStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(StepStatus::parse("RUNNING"), None);
    }

    #[test]
    fn test_source_type_round_trip() {
        let all = [
            SourceType::VideoSummary,
            SourceType::CommentReaction,
            SourceType::ViewerEscapeAnalysis,
            SourceType::AlgorithmOptimization,
            SourceType::PersonalizedKeywords,
            SourceType::IdeaRecommendation,
        ];
        for st in all {
            assert_eq!(SourceType::parse(st.as_str()), Some(st));
        }
    }

    #[test]
    fn test_comment_type_from_emotion_code() {
        assert_eq!(CommentType::from_emotion_code(1), CommentType::Positive);
        assert_eq!(CommentType::from_emotion_code(2), CommentType::Negative);
        assert_eq!(CommentType::from_emotion_code(3), CommentType::Neutral);
        assert_eq!(CommentType::from_emotion_code(4), CommentType::AdviceOpinion);
        // Out-of-range codes fall back to NEUTRAL
        assert_eq!(CommentType::from_emotion_code(0), CommentType::Neutral);
        assert_eq!(CommentType::from_emotion_code(99), CommentType::Neutral);
    }

    #[test]
    fn test_report_patch_is_empty() {
        assert!(ReportPatch::default().is_empty());
        let patch = ReportPatch {
            summary: Some("a summary".into()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
