//! Chunking engine
//!
//! Splits transcripts into time-aligned segments, focus-weighted around the
//! sharpest retention dip, and into meaning-aligned segments (LLM-regrouped)
//! inside the focus window. All chunk sizes derive from the video length.
//!
//! Time chunks are ingested once per video: the `(source_id, chunk_type)`
//! existence gate makes re-runs a no-op. Re-ingestion with slightly shifted
//! boundaries would be benign, so there is no content-hash deduplication.

use std::sync::Arc;

use serde_json::{Value, json};

use super::executor::{RagError, RagExecutor};
use super::prompts;
use crate::data::types::{RetentionRow, SourceType, TranscriptSnippet};
use crate::data::vector::VectorStore;
use crate::utils::time::now_iso8601;

/// Chunk sizing derived from video length, all in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkParams {
    pub base_chunk: u64,
    pub focus_chunk: u64,
    pub focus_start: u64,
    pub focus_end: u64,
    pub worst_sec: u64,
}

impl ChunkParams {
    /// Derive sizes from video length and the worst-drop elapsed ratio:
    /// - base chunk: 2% of length, at least 7s
    /// - focus chunk: 0.6% of length, clamped to [5s, 60s]
    /// - focus window: 4% of length, clamped to [10s, 300s], centered on the
    ///   drop point and clipped to the video bounds
    pub fn derive(video_length_sec: u64, worst_ratio: f64) -> Self {
        let length = video_length_sec as f64;
        let worst_sec = (worst_ratio * length) as u64;

        let base_chunk = 7u64.max((0.02 * length) as u64);
        let focus_chunk = 5u64.max(((0.006 * length) as u64).min(60));
        let focus_window = 10u64.max(((0.04 * length) as u64).min(300));

        let focus_start = worst_sec.saturating_sub(focus_window / 2);
        let focus_end = (worst_sec + focus_window / 2).min(video_length_sec);

        Self {
            base_chunk,
            focus_chunk,
            focus_start,
            focus_end,
            worst_sec,
        }
    }

    pub fn in_focus(&self, second: u64) -> bool {
        self.focus_start <= second && second <= self.focus_end
    }
}

/// Largest index with `start_time <= target_sec`, or None when every snippet
/// starts later
pub fn binary_search_le(script: &[TranscriptSnippet], target_sec: f64) -> Option<usize> {
    let mut left = 0isize;
    let mut right = script.len() as isize - 1;
    let mut best: Option<usize> = None;

    while left <= right {
        let mid = (left + right) / 2;
        if script[mid as usize].start_time <= target_sec {
            best = Some(mid as usize);
            left = mid + 1;
        } else {
            right = mid - 1;
        }
    }

    best
}

/// Concatenate snippets overlapping `[chunk_start, chunk_end)`
fn collect_chunk_text(script: &[TranscriptSnippet], chunk_start: f64, chunk_end: f64) -> String {
    let start_idx = binary_search_le(script, chunk_start).unwrap_or(0);

    let mut parts = Vec::new();
    for snippet in &script[start_idx..] {
        if snippet.start_time < chunk_end && snippet.end_time > chunk_start {
            parts.push(snippet.text.as_str());
        } else if snippet.start_time > chunk_end {
            break;
        }
    }

    parts.join(" ").trim().to_string()
}

/// Average the retention rows whose elapsed ratio falls inside the chunk's
/// ratio span; (0, 0) when the span holds no samples
fn average_retention(rows: &[RetentionRow], start_ratio: f64, end_ratio: f64) -> (f64, f64) {
    let in_span: Vec<&RetentionRow> = rows
        .iter()
        .filter(|r| start_ratio <= r.elapsed_ratio && r.elapsed_ratio <= end_ratio)
        .collect();

    if in_span.is_empty() {
        return (0.0, 0.0);
    }

    let n = in_span.len() as f64;
    let watch = in_span.iter().map(|r| r.audience_watch_ratio).sum::<f64>() / n;
    let retention = in_span
        .iter()
        .map(|r| r.relative_retention_performance)
        .sum::<f64>()
        / n;
    (watch, retention)
}

fn chunk_meta(
    chunk_type: &str,
    time_start: u64,
    time_end: u64,
    watch: f64,
    retention: f64,
    is_focus: bool,
) -> Value {
    json!({
        "chunk_type": chunk_type,
        "time_start": time_start,
        "time_end": time_end,
        "audienceWatchRatio": watch,
        "relativeRetentionPerformance": retention,
        "is_focus_zone": is_focus,
        "created_at": now_iso8601(),
    })
}

/// Chunking engine over the vector store and the LLM
pub struct ChunkingEngine {
    vector: Arc<VectorStore>,
    rag: Arc<RagExecutor>,
    json_retry_budget: u32,
}

impl ChunkingEngine {
    pub fn new(vector: Arc<VectorStore>, rag: Arc<RagExecutor>, json_retry_budget: u32) -> Self {
        Self {
            vector,
            rag,
            json_retry_budget,
        }
    }

    /// Time-uniform chunking pass over the full video. Returns the number of
    /// vector rows written; 0 when the existence gate short-circuits.
    pub async fn create_time_chunks(
        &self,
        video_id: i64,
        video_length_sec: u64,
        script: &[TranscriptSnippet],
        rows: &[RetentionRow],
        worst_ratio: f64,
    ) -> Result<usize, RagError> {
        if self
            .vector
            .exists_by_chunk_type_and_id("time", video_id)
            .await?
        {
            tracing::debug!(video_id, "Time chunks already ingested, skipping pass");
            return Ok(0);
        }

        let params = ChunkParams::derive(video_length_sec, worst_ratio);
        let mut written = 0usize;
        let mut current = 0u64;

        while current < video_length_sec {
            let in_focus = params.in_focus(current);
            let size = if in_focus {
                params.focus_chunk
            } else {
                params.base_chunk
            };
            let chunk_end = (current + size).min(video_length_sec);

            let text = collect_chunk_text(script, current as f64, chunk_end as f64);
            let (watch, retention) = average_retention(
                rows,
                current as f64 / video_length_sec as f64,
                chunk_end as f64 / video_length_sec as f64,
            );

            written += self
                .vector
                .save_context(
                    SourceType::ViewerEscapeAnalysis,
                    video_id,
                    &text,
                    Some(chunk_meta(
                        "time", current, chunk_end, watch, retention, in_focus,
                    )),
                )
                .await?;

            current += size;
        }

        tracing::debug!(video_id, written, "Time chunking pass complete");
        Ok(written)
    }

    /// Meaning-based chunking restricted to the focus window. The raw
    /// focus-sized chunks go to the LLM as JSON and come back regrouped as
    /// `[text, start_sec, end_sec]` triplets. A parse failure after the
    /// retry budget degrades to an empty result.
    pub async fn create_meaning_chunks(
        &self,
        video_id: i64,
        video_length_sec: u64,
        script: &[TranscriptSnippet],
        rows: &[RetentionRow],
        worst_ratio: f64,
    ) -> Result<usize, RagError> {
        let params = ChunkParams::derive(video_length_sec, worst_ratio);

        let mut raw_chunks: Vec<(String, u64, u64)> = Vec::new();
        let mut retention_averages: Vec<(f64, f64)> = Vec::new();
        let mut current = 0u64;

        while current < video_length_sec {
            let in_focus = params.in_focus(current);
            let size = if in_focus {
                params.focus_chunk
            } else {
                params.base_chunk
            };
            let chunk_end = (current + size).min(video_length_sec);

            if in_focus {
                let text = collect_chunk_text(script, current as f64, chunk_end as f64);
                raw_chunks.push((text, current, chunk_end));
                retention_averages.push(average_retention(
                    rows,
                    current as f64 / video_length_sec as f64,
                    chunk_end as f64 / video_length_sec as f64,
                ));
            }

            current += size;
        }

        if raw_chunks.is_empty() {
            return Ok(0);
        }

        let context = serde_json::to_string(&raw_chunks)
            .map_err(|e| RagError::JsonParse {
                attempts: 0,
                last_error: e.to_string(),
            })?;

        let regrouped: Vec<(String, f64, f64)> = match self
            .rag
            .execute_chain_json(
                &context,
                "Regroup these transcript chunks by meaning.",
                prompts::MEANING_CHUNK,
                self.json_retry_budget,
            )
            .await
        {
            Ok(list) => list,
            Err(RagError::JsonParse { attempts, last_error }) => {
                tracing::warn!(
                    video_id,
                    attempts,
                    error = %last_error,
                    "Meaning chunking gave no parseable output, persisting nothing"
                );
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let mut written = 0usize;
        for (i, (text, start_sec, end_sec)) in regrouped.iter().enumerate() {
            let (watch, retention) = retention_averages.get(i).copied().unwrap_or((0.0, 0.0));
            written += self
                .vector
                .save_context(
                    SourceType::ViewerEscapeAnalysis,
                    video_id,
                    text,
                    Some(chunk_meta(
                        "mean",
                        *start_sec as u64,
                        *end_sec as u64,
                        watch,
                        retention,
                        true,
                    )),
                )
                .await?;
        }

        tracing::debug!(video_id, written, "Meaning chunking pass complete");
        Ok(written)
    }
}
