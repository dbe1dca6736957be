//! Analysis step handler
//!
//! Two sub-phases: viewer-retention analysis and algorithm optimization.
//! Retention analysis retries network-class errors on a fixed 5/10/15s
//! schedule; when the budget is spent a placeholder string is persisted and
//! the step moves on - only an optimization failure fails the axis.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;

use crate::core::constants::{
    OPTIMIZATION_RETRIEVAL_K, RETENTION_FAILURE_PLACEHOLDER, RETENTION_RETRY_ATTEMPTS,
    RETENTION_RETRY_DELAYS_SECS, RETENTION_RETRIEVAL_K,
};
use crate::data::sqlite::repositories::{channel, report};
use crate::data::types::{ChannelRow, ReportPatch, ReportRow, SourceType, VideoRow};
use crate::data::vector::{SimilarChunk, VectorStore};
use crate::data::youtube::{
    RetentionApi, TranscriptApi, VideoDataApi, worst_drop_ratio,
};
use crate::domain::error::StepError;
use crate::domain::rag::{ChunkParams, ChunkingEngine, RagExecutor, prompts};
use crate::domain::report::handler::{StepHandler, StepOutcome, resolve_report_and_video};
use crate::domain::report::message::{Step, StepMessage};
use crate::utils::retry::{Schedule, retry_with_policy};

const OPTIMIZATION_QUERY: &str =
    "Assess this video's algorithm optimization and propose concrete improvements.";

/// Analysis handler: viewer retention → algorithm optimization
pub struct AnalysisHandler {
    pool: SqlitePool,
    vector: Arc<VectorStore>,
    rag: Arc<RagExecutor>,
    chunking: Arc<ChunkingEngine>,
    transcripts: Arc<dyn TranscriptApi>,
    analytics: Arc<dyn RetentionApi>,
    data_api: Arc<dyn VideoDataApi>,
}

impl AnalysisHandler {
    pub fn new(
        pool: SqlitePool,
        vector: Arc<VectorStore>,
        rag: Arc<RagExecutor>,
        chunking: Arc<ChunkingEngine>,
        transcripts: Arc<dyn TranscriptApi>,
        analytics: Arc<dyn RetentionApi>,
        data_api: Arc<dyn VideoDataApi>,
    ) -> Self {
        Self {
            pool,
            vector,
            rag,
            chunking,
            transcripts,
            analytics,
            data_api,
        }
    }

    /// Sub-phase 1 core: retention curve → dual chunking → grounded prompt
    /// → LLM. Raises on any failure; the caller owns the retry policy.
    async fn analyze_retention(
        &self,
        message: &StepMessage,
        video: &VideoRow,
    ) -> Result<String, StepError> {
        let token = message
            .google_access_token
            .as_deref()
            .ok_or_else(|| StepError::Invalid("analysis requires google_access_token".into()))?;

        let script = self.transcripts.structured(&video.youtube_video_id).await?;
        let video_length = script
            .last()
            .map(|s| s.end_time.ceil() as u64)
            .ok_or_else(|| StepError::Invalid("empty transcript".into()))?;

        let rows = self
            .analytics
            .retention_rows(token, &video.youtube_video_id)
            .await?;
        let worst_ratio = worst_drop_ratio(&rows);

        if !message.skip_vector_save() {
            self.chunking
                .create_time_chunks(video.id, video_length, &script, &rows, worst_ratio)
                .await?;
            self.chunking
                .create_meaning_chunks(video.id, video_length, &script, &rows, worst_ratio)
                .await?;
        }

        let retrieve = |question: &'static str| {
            let vector = Arc::clone(&self.vector);
            let video_id = video.id;
            async move {
                vector
                    .search_similar(
                        question,
                        SourceType::ViewerEscapeAnalysis,
                        Some(video_id),
                        &[],
                        RETENTION_RETRIEVAL_K,
                    )
                    .await
            }
        };

        let cause = retrieve(prompts::ESCAPE_QUESTION_CAUSE).await?;
        let improvement = retrieve(prompts::ESCAPE_QUESTION_IMPROVEMENT).await?;
        let editing_flow = retrieve(prompts::ESCAPE_QUESTION_EDITING_FLOW).await?;

        let channel_row = channel::get_channel(&self.pool, video.channel_id)
            .await?
            .unwrap_or_else(|| ChannelRow {
                id: video.channel_id,
                youtube_channel_id: String::new(),
                name: String::new(),
                concept: None,
                target: None,
                channel_hash_tag: None,
            });

        let params = ChunkParams::derive(video_length, worst_ratio);
        let prompt = prompts::viewer_escape_prompt(
            &chunk_evidence(&cause),
            &chunk_evidence(&improvement),
            &chunk_evidence(&editing_flow),
            params.worst_sec,
            params.focus_start,
            params.focus_end,
            video_length,
            video.title.as_deref().unwrap_or_default(),
            video.description.as_deref().unwrap_or_default(),
            channel_row.concept.as_deref().unwrap_or_default(),
            channel_row.target.as_deref().unwrap_or_default(),
            channel_row.channel_hash_tag.as_deref().unwrap_or_default(),
        );

        Ok(self.rag.execute_direct(&prompt).await?)
    }

    /// Sub-phase 1 with its retry discipline and placeholder fallback
    async fn run_retention_subphase(
        &self,
        message: &StepMessage,
        report_row: &ReportRow,
        video: &VideoRow,
    ) -> Result<(), StepError> {
        let analysis = retry_with_policy(
            RETENTION_RETRY_ATTEMPTS,
            Schedule::steps_secs(&RETENTION_RETRY_DELAYS_SECS),
            StepError::classify,
            || self.analyze_retention(message, video),
        )
        .await;

        let leave_analyze = match analysis {
            Ok(text) => {
                if !message.skip_vector_save() {
                    self.vector
                        .save_context(
                            SourceType::ViewerEscapeAnalysis,
                            report_row.id,
                            &text,
                            None,
                        )
                        .await?;
                }
                text
            }
            Err(e) => {
                tracing::warn!(
                    report_id = report_row.id,
                    error = %e,
                    "Retention analysis exhausted, persisting placeholder"
                );
                RETENTION_FAILURE_PLACEHOLDER.to_string()
            }
        };

        report::update_report(
            &self.pool,
            report_row.id,
            &ReportPatch {
                leave_analyze: Some(leave_analyze),
                ..Default::default()
            },
        )
        .await?;

        Ok(())
    }

    /// Sub-phase 2: video + channel stats → grounded prompt → LLM
    async fn run_optimization_subphase(
        &self,
        message: &StepMessage,
        report_row: &ReportRow,
        video: &VideoRow,
    ) -> Result<(), StepError> {
        let details = self.data_api.video_details(&video.youtube_video_id).await?;

        let channel_stats = match &details.channel_id {
            Some(channel_id) => self.data_api.channel_stats(channel_id).await?,
            None => Default::default(),
        };

        let mut context = serde_json::to_string_pretty(&json!({
            "video": {
                "title": details.title,
                "description": details.description,
                "tags": details.tags,
                "publishedAt": details.published_at,
                "durationSec": details.duration_sec,
                "viewCount": details.view_count,
                "likeCount": details.like_count,
                "commentCount": details.comment_count,
            },
            "channel": {
                "name": details.channel_title,
                "subscriberCount": channel_stats.subscriber_count,
                "totalViewCount": channel_stats.view_count,
                "totalVideoCount": channel_stats.video_count,
            },
        }))
        .unwrap_or_default();

        // Prior analysis cases ground the new one; pointless when this run
        // is not feeding the store
        if !message.skip_vector_save() {
            let description_prefix: String = details.description.chars().take(200).collect();
            let query = format!("제목: {}, 설명: {}", details.title, description_prefix);
            let similar = self
                .vector
                .search_similar(
                    &query,
                    SourceType::AlgorithmOptimization,
                    None,
                    &[],
                    OPTIMIZATION_RETRIEVAL_K,
                )
                .await?;

            if !similar.is_empty() {
                let cases = similar
                    .iter()
                    .map(|c| c.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n---\n\n");
                context.push_str("\n\nPrior optimization cases for similar videos:\n");
                context.push_str(&cases);
            }
        }

        let optimization = self
            .rag
            .execute_chain(&context, OPTIMIZATION_QUERY, prompts::ALGORITHM_OPTIMIZATION)
            .await?;

        if !message.skip_vector_save() {
            self.vector
                .save_context(
                    SourceType::AlgorithmOptimization,
                    report_row.id,
                    &optimization,
                    None,
                )
                .await?;
        }

        report::update_report(
            &self.pool,
            report_row.id,
            &ReportPatch {
                optimization: Some(optimization),
                ..Default::default()
            },
        )
        .await?;

        Ok(())
    }
}

/// Retrieved chunks rendered as prompt evidence, retention meta included
fn chunk_evidence(chunks: &[SimilarChunk]) -> String {
    if chunks.is_empty() {
        return "(no grounded evidence)".to_string();
    }
    serde_json::to_string_pretty(chunks).unwrap_or_default()
}

#[async_trait]
impl StepHandler for AnalysisHandler {
    fn step(&self) -> Step {
        Step::Analysis
    }

    async fn handle(&self, message: &StepMessage) -> Result<StepOutcome, StepError> {
        let Some((report_row, video)) =
            resolve_report_and_video(&self.pool, message.report_id).await?
        else {
            return Ok(StepOutcome::Skipped);
        };

        self.run_retention_subphase(message, &report_row, &video)
            .await?;
        tracing::info!(report_id = report_row.id, "Analysis retention sub-phase done");

        self.run_optimization_subphase(message, &report_row, &video)
            .await?;
        tracing::info!(report_id = report_row.id, "Analysis optimization sub-phase done");

        Ok(StepOutcome::Completed)
    }
}
