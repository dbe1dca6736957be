//! Overview step handler
//!
//! Three sequential sub-phases: summary, comments, metrics. Any sub-phase
//! error aborts the rest of the step; the worker records FAILED.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::data::sqlite::repositories::report;
use crate::data::types::{AnalyticsTotals, ReportPatch, ReportRow, SourceType, VideoRow};
use crate::data::vector::VectorStore;
use crate::data::youtube::{RetentionApi, TranscriptApi, VideoDataApi, format_transcript};
use crate::domain::comments::CommentPipeline;
use crate::domain::error::StepError;
use crate::domain::metrics::MetricsAnalyzer;
use crate::domain::rag::{RagExecutor, prompts};
use crate::domain::report::handler::{StepHandler, StepOutcome, resolve_report_and_video};
use crate::domain::report::message::{Step, StepMessage};

const SUMMARY_QUERY: &str =
    "Write the interval-by-interval overview of this video from its transcript.";

/// Overview handler: summary → comments → metrics
pub struct OverviewHandler {
    pool: SqlitePool,
    vector: Arc<VectorStore>,
    rag: Arc<RagExecutor>,
    transcripts: Arc<dyn TranscriptApi>,
    data_api: Arc<dyn VideoDataApi>,
    analytics: Arc<dyn RetentionApi>,
    comments: Arc<CommentPipeline>,
    metrics: Arc<MetricsAnalyzer>,
}

impl OverviewHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        vector: Arc<VectorStore>,
        rag: Arc<RagExecutor>,
        transcripts: Arc<dyn TranscriptApi>,
        data_api: Arc<dyn VideoDataApi>,
        analytics: Arc<dyn RetentionApi>,
        comments: Arc<CommentPipeline>,
        metrics: Arc<MetricsAnalyzer>,
    ) -> Self {
        Self {
            pool,
            vector,
            rag,
            transcripts,
            data_api,
            analytics,
            comments,
            metrics,
        }
    }

    /// Sub-phase 1: transcript → LLM summary → vector store + report
    async fn run_summary(
        &self,
        message: &StepMessage,
        report_row: &ReportRow,
        video: &VideoRow,
    ) -> Result<(), StepError> {
        let script = self.transcripts.structured(&video.youtube_video_id).await?;
        let context = format_transcript(&script);
        if context.is_empty() {
            tracing::warn!(report_id = report_row.id, "Transcript empty, summarizing without captions");
        }

        let summary = self
            .rag
            .execute_chain(&context, SUMMARY_QUERY, prompts::VIDEO_SUMMARY)
            .await?;

        if !message.skip_vector_save() {
            self.vector
                .save_context(SourceType::VideoSummary, report_row.id, &summary, None)
                .await?;
        }

        report::update_report(
            &self.pool,
            report_row.id,
            &ReportPatch {
                summary: Some(summary),
                title: video.title.clone(),
                ..Default::default()
            },
        )
        .await?;

        Ok(())
    }

    /// Sub-phase 3 input: engagement totals. With an access token the
    /// Analytics API supplies the full set; without one the Data v3
    /// statistics stand in (shares/subscriber metrics default to zero).
    async fn engagement_totals(
        &self,
        message: &StepMessage,
        video: &VideoRow,
    ) -> Result<AnalyticsTotals, StepError> {
        let details = self.data_api.video_details(&video.youtube_video_id).await?;

        let mut totals = match &message.google_access_token {
            Some(token) => {
                self.analytics
                    .video_totals(token, &video.youtube_video_id)
                    .await?
            }
            None => AnalyticsTotals {
                views: details.view_count,
                likes: details.like_count,
                ..Default::default()
            },
        };

        totals.total_duration_sec = details.duration_sec as f64;
        Ok(totals)
    }
}

#[async_trait]
impl StepHandler for OverviewHandler {
    fn step(&self) -> Step {
        Step::Overview
    }

    async fn handle(&self, message: &StepMessage) -> Result<StepOutcome, StepError> {
        let Some((report_row, video)) =
            resolve_report_and_video(&self.pool, message.report_id).await?
        else {
            return Ok(StepOutcome::Skipped);
        };

        self.run_summary(message, &report_row, &video).await?;
        tracing::info!(report_id = report_row.id, "Overview summary sub-phase done");

        self.comments.analyze(&video, report_row.id).await?;
        tracing::info!(report_id = report_row.id, "Overview comments sub-phase done");

        let totals = self.engagement_totals(message, &video).await?;
        let patch = self.metrics.analyze(&video, &totals).await?;
        report::update_report(&self.pool, report_row.id, &patch).await?;
        tracing::info!(report_id = report_row.id, "Overview metrics sub-phase done");

        Ok(StepOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::data::sqlite::init_memory_pool;
    use crate::data::sqlite::repositories::report::{get_report, insert_report};
    use crate::data::sqlite::repositories::video::insert_test_video;
    use crate::data::types::{
        ChannelStats, FetchedComment, PopularVideo, RetentionRow, TranscriptSnippet, VideoDetails,
    };
    use crate::data::vector::testing::HashEmbedder;
    use crate::data::vector::{MemoryVectorBackend, VectorStore};
    use crate::data::youtube::YoutubeError;
    use crate::domain::rag::testing::ScriptedChat;

    struct FakeTranscripts;

    #[async_trait]
    impl TranscriptApi for FakeTranscripts {
        async fn structured(&self, _: &str) -> Result<Vec<TranscriptSnippet>, YoutubeError> {
            Ok(vec![TranscriptSnippet {
                text: "hello and welcome".into(),
                start_time: 0.0,
                end_time: 10.0,
            }])
        }
    }

    struct FakeDataApi;

    #[async_trait]
    impl VideoDataApi for FakeDataApi {
        async fn video_details(&self, _: &str) -> Result<VideoDetails, YoutubeError> {
            Ok(VideoDetails {
                view_count: 10_000,
                like_count: 300,
                duration_sec: 300,
                ..Default::default()
            })
        }

        async fn channel_stats(&self, _: &str) -> Result<ChannelStats, YoutubeError> {
            Ok(ChannelStats::default())
        }

        async fn comment_threads(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<FetchedComment>, YoutubeError> {
            Err(YoutubeError::CommentsDisabled)
        }

        async fn category_popular(
            &self,
            _: i64,
            _: usize,
        ) -> Result<Vec<PopularVideo>, YoutubeError> {
            Ok(vec![])
        }
    }

    struct FakeAnalytics;

    #[async_trait]
    impl RetentionApi for FakeAnalytics {
        async fn retention_rows(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Vec<RetentionRow>, YoutubeError> {
            Ok(vec![])
        }

        async fn video_totals(&self, _: &str, _: &str) -> Result<AnalyticsTotals, YoutubeError> {
            Ok(AnalyticsTotals {
                views: 10_000,
                likes: 300,
                shares: 50,
                subscribers_gained: 50,
                average_view_duration: 120.0,
                total_duration_sec: 0.0,
            })
        }
    }

    async fn setup(pool: &SqlitePool) -> (i64, i64) {
        let video_id = insert_test_video(
            pool,
            &VideoRow {
                id: 0,
                channel_id: 1,
                youtube_video_id: "yt1".into(),
                video_category: 24,
                title: Some("weeknight curry".into()),
                description: Some("a 20 minute curry".into()),
                view: Some(10_000),
                like_count: Some(300),
                comment_count: Some(41),
            },
        )
        .await;
        let report_row = insert_report(pool, video_id).await.unwrap();
        (report_row.id, video_id)
    }

    fn handler(pool: &SqlitePool, vector: Arc<VectorStore>, chat: Vec<&str>) -> OverviewHandler {
        let rag = Arc::new(RagExecutor::new(Arc::new(ScriptedChat::new(chat))));
        let data_api: Arc<dyn VideoDataApi> = Arc::new(FakeDataApi);
        OverviewHandler::new(
            pool.clone(),
            vector.clone(),
            rag.clone(),
            Arc::new(FakeTranscripts),
            data_api.clone(),
            Arc::new(FakeAnalytics),
            Arc::new(CommentPipeline::new(pool.clone(), data_api, rag)),
            Arc::new(MetricsAnalyzer::new(
                pool.clone(),
                Arc::new(HashEmbedder::default()),
            )),
        )
    }

    fn memory_vector() -> Arc<VectorStore> {
        Arc::new(VectorStore::new(
            Arc::new(MemoryVectorBackend::new()),
            Arc::new(HashEmbedder::default()),
        ))
    }

    #[tokio::test]
    async fn test_happy_path_writes_summary_and_metrics() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, _) = setup(&pool).await;
        let vector = memory_vector();

        let overview = handler(&pool, vector.clone(), vec!["a tidy 10-second summary"]);
        let mut message = StepMessage::new(1, report_id, Step::Overview);
        message.google_access_token = Some("ya29.token".into());

        let outcome = overview.handle(&message).await.unwrap();
        assert_eq!(outcome, StepOutcome::Completed);

        let report_after = get_report(&pool, report_id).await.unwrap().unwrap();
        assert_eq!(report_after.summary.as_deref(), Some("a tidy 10-second summary"));
        assert_eq!(report_after.title.as_deref(), Some("weeknight curry"));
        // S1 arithmetic: seo 70.0, revisit 4.00
        assert_eq!(report_after.seo, Some(70.0));
        assert_eq!(report_after.revisit, Some(4.0));
        // Comments disabled -> zero counts, step still completes
        assert_eq!(report_after.positive_comment, Some(0));

        // Summary chunk landed in the vector store
        let hits = vector
            .search_similar(
                "a tidy 10-second summary",
                SourceType::VideoSummary,
                Some(report_id),
                &[],
                1,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_skip_vector_save_writes_no_chunk() {
        let pool = init_memory_pool().await.unwrap();
        let (report_id, _) = setup(&pool).await;
        let vector = memory_vector();

        let overview = handler(&pool, vector.clone(), vec!["summary text"]);
        let mut message = StepMessage::new(1, report_id, Step::Overview);
        message.skip_vector_save = Some(true);

        let outcome = overview.handle(&message).await.unwrap();
        assert_eq!(outcome, StepOutcome::Completed);

        let report_after = get_report(&pool, report_id).await.unwrap().unwrap();
        assert_eq!(report_after.summary.as_deref(), Some("summary text"));

        let hits = vector
            .search_similar("summary text", SourceType::VideoSummary, Some(report_id), &[], 5)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_stale_message_is_skipped() {
        let pool = init_memory_pool().await.unwrap();
        let overview = handler(&pool, memory_vector(), vec!["unused"]);

        let outcome = overview
            .handle(&StepMessage::new(1, 404, Step::Overview))
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::Skipped);
    }
}
