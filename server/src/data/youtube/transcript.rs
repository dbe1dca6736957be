//! Transcript service client
//!
//! Fetches structured transcripts from a self-hosted transcript proxy.
//! A missing transcript is an empty list, not an error; the summary
//! sub-phase surfaces the empty context as-is.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::YoutubeError;
use crate::core::constants::YOUTUBE_TIMEOUT_SECS;
use crate::data::types::TranscriptSnippet;
use crate::utils::time::format_mmss;

/// Transcript surface used by the pipeline
#[async_trait]
pub trait TranscriptApi: Send + Sync {
    /// Structured transcript: `{text, start_time, end_time}` entries in order
    async fn structured(
        &self,
        youtube_video_id: &str,
    ) -> Result<Vec<TranscriptSnippet>, YoutubeError>;
}

/// Client for the transcript proxy endpoint
pub struct TranscriptClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct WireSnippet {
    text: String,
    start: f64,
    duration: f64,
}

impl TranscriptClient {
    pub fn new(base_url: String) -> Result<Self, YoutubeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(YOUTUBE_TIMEOUT_SECS))
            .build()?;

        Ok(Self { http, base_url })
    }
}

#[async_trait]
impl TranscriptApi for TranscriptClient {
    async fn structured(
        &self,
        youtube_video_id: &str,
    ) -> Result<Vec<TranscriptSnippet>, YoutubeError> {
        let url = format!("{}/transcripts/{youtube_video_id}", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status.as_u16() == 404 {
            // No captions available
            return Ok(vec![]);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::from_status(status.as_u16(), body));
        }

        let wire: Vec<WireSnippet> = response.json().await?;
        Ok(wire
            .into_iter()
            .map(|s| TranscriptSnippet {
                end_time: s.start + s.duration,
                start_time: s.start,
                text: s.text,
            })
            .collect())
    }
}

/// Human-readable transcript rendering used as LLM context,
/// one `text (m:ss - m:ss)` line per snippet.
pub fn format_transcript(snippets: &[TranscriptSnippet]) -> String {
    snippets
        .iter()
        .map(|s| {
            format!(
                "{} ({} - {})",
                s.text,
                format_mmss(s.start_time),
                format_mmss(s.end_time)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
