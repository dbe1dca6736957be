//! Step handler interface and the shared preamble
//!
//! Each step implements the same capability set; the worker dispatches by
//! topic registration, not per call. The preamble resolves `(report, video)`
//! and treats a missing entity as a stale message: log and skip, no FAILED
//! transition.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::data::sqlite::repositories::{report, video};
use crate::data::types::{ReportRow, VideoRow};
use crate::domain::error::StepError;
use crate::domain::report::message::{Step, StepMessage};

/// Terminal result of one handler invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// All sub-phases succeeded; the worker writes COMPLETED
    Completed,
    /// Stale message (missing report/video/channel); no axis transition
    Skipped,
}

/// One step of the report pipeline
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Which task axis this handler owns
    fn step(&self) -> Step;

    /// Run the step's sub-phases for one message
    async fn handle(&self, message: &StepMessage) -> Result<StepOutcome, StepError>;
}

/// Shared preamble: resolve the report and its video. `None` means the
/// message is stale and the step should be skipped silently.
pub async fn resolve_report_and_video(
    pool: &SqlitePool,
    report_id: i64,
) -> Result<Option<(ReportRow, VideoRow)>, StepError> {
    let Some(report_row) = report::get_report(pool, report_id).await? else {
        tracing::warn!(report_id, "No report for message, skipping");
        return Ok(None);
    };

    let Some(video_row) = video::get_video(pool, report_row.video_id).await? else {
        tracing::warn!(
            report_id,
            video_id = report_row.video_id,
            "No video for report, skipping"
        );
        return Ok(None);
    };

    Ok(Some((report_row, video_row)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::init_memory_pool;
    use crate::data::sqlite::repositories::report::insert_report;
    use crate::data::sqlite::repositories::video::insert_test_video;

    #[tokio::test]
    async fn test_resolve_missing_report() {
        let pool = init_memory_pool().await.unwrap();
        let resolved = resolve_report_and_video(&pool, 404).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_resolve_missing_video() {
        let pool = init_memory_pool().await.unwrap();
        let report_row = insert_report(&pool, 999).await.unwrap();
        let resolved = resolve_report_and_video(&pool, report_row.id).await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_resolve_present_pair() {
        let pool = init_memory_pool().await.unwrap();
        let video_id = insert_test_video(
            &pool,
            &VideoRow {
                id: 0,
                channel_id: 1,
                youtube_video_id: "yt".into(),
                video_category: 24,
                title: Some("t".into()),
                description: None,
                view: None,
                like_count: None,
                comment_count: None,
            },
        )
        .await;
        let report_row = insert_report(&pool, video_id).await.unwrap();

        let (resolved_report, resolved_video) = resolve_report_and_video(&pool, report_row.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved_report.id, report_row.id);
        assert_eq!(resolved_video.id, video_id);
    }
}
