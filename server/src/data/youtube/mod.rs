//! YouTube API adapters (Data v3, Analytics v2, transcripts)

mod analytics;
mod data_api;
mod error;
mod transcript;

pub use analytics::{RetentionApi, YoutubeAnalyticsClient, worst_drop_ratio};
pub use data_api::{VideoDataApi, YoutubeDataClient};
pub use error::YoutubeError;
pub use transcript::{TranscriptApi, TranscriptClient, format_transcript};
