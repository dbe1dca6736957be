//! Shared data types for the data layer

mod external;
mod rows;

pub use external::{
    AnalyticsTotals, ChannelStats, FetchedComment, PopularVideo, RetentionRow, TranscriptSnippet,
    TrendItem, VideoDetails,
};
pub use rows::{
    ChannelRow, CommentRow, CommentType, IdeaRow, NewComment, NewIdea, NewTrendKeyword, ReportPatch,
    ReportRow, SourceType, StepStatus, TaskAxis, TaskRow, TrendKeywordRow, TrendKeywordType,
    VideoRow,
};
