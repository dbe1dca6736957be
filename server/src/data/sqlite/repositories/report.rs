//! Report repository
//!
//! Reports are created with only `video_id` and then mutated by up to three
//! concurrent step handlers. Insert and partial update are two distinct
//! operations on purpose: the UPDATE statement names only the supplied
//! columns, so handlers writing disjoint field subsets cannot overwrite each
//! other's slices with NULLs.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::data::error::DataError;
use crate::data::types::{ReportPatch, ReportRow};

const REPORT_COLUMNS: &str = "id, video_id, title, view, view_topic_avg, view_channel_avg, \
     like_count, like_topic_avg, like_channel_avg, comment, comment_topic_avg, \
     comment_channel_avg, concept, seo, revisit, summary, positive_comment, \
     negative_comment, neutral_comment, advice_comment, leave_analyze, optimization, \
     created_at, updated_at";

/// Insert a fresh report carrying only its video reference
pub async fn insert_report(pool: &SqlitePool, video_id: i64) -> Result<ReportRow, DataError> {
    let now = chrono::Utc::now().timestamp();

    let result = sqlx::query("INSERT INTO report (video_id, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(video_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

    let id = result.last_insert_rowid();
    get_report(pool, id)
        .await?
        .ok_or_else(|| DataError::not_found("report", id))
}

/// Get a report by id
pub async fn get_report(pool: &SqlitePool, id: i64) -> Result<Option<ReportRow>, DataError> {
    let row = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM report WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Partially update a report: only the patch's `Some` columns are written.
/// Returns false when the row does not exist or the patch is empty.
pub async fn update_report(
    pool: &SqlitePool,
    id: i64,
    patch: &ReportPatch,
) -> Result<bool, DataError> {
    if patch.is_empty() {
        return Ok(false);
    }

    let now = chrono::Utc::now().timestamp();
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE report SET ");

    {
        let mut set = builder.separated(", ");

        macro_rules! push_field {
            ($field:ident) => {
                if let Some(value) = &patch.$field {
                    set.push(concat!(stringify!($field), " = "));
                    set.push_bind_unseparated(value.clone());
                }
            };
        }

        push_field!(title);
        push_field!(view);
        push_field!(view_topic_avg);
        push_field!(view_channel_avg);
        push_field!(like_count);
        push_field!(like_topic_avg);
        push_field!(like_channel_avg);
        push_field!(comment);
        push_field!(comment_topic_avg);
        push_field!(comment_channel_avg);
        push_field!(concept);
        push_field!(seo);
        push_field!(revisit);
        push_field!(summary);
        push_field!(positive_comment);
        push_field!(negative_comment);
        push_field!(neutral_comment);
        push_field!(advice_comment);
        push_field!(leave_analyze);
        push_field!(optimization);

        set.push("updated_at = ");
        set.push_bind_unseparated(now);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::init_memory_pool;

    #[tokio::test]
    async fn test_insert_report_only_video_id() {
        let pool = init_memory_pool().await.unwrap();
        let report = insert_report(&pool, 7).await.unwrap();

        assert_eq!(report.video_id, 7);
        assert!(report.summary.is_none());
        assert!(report.seo.is_none());
    }

    #[tokio::test]
    async fn test_get_missing_report() {
        let pool = init_memory_pool().await.unwrap();
        assert!(get_report(&pool, 999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let pool = init_memory_pool().await.unwrap();
        let report = insert_report(&pool, 1).await.unwrap();

        // Two handlers write disjoint slices
        let updated = update_report(
            &pool,
            report.id,
            &ReportPatch {
                summary: Some("s1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(updated);

        update_report(
            &pool,
            report.id,
            &ReportPatch {
                optimization: Some("o1".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let row = get_report(&pool, report.id).await.unwrap().unwrap();
        assert_eq!(row.summary.as_deref(), Some("s1"));
        assert_eq!(row.optimization.as_deref(), Some("o1"));
    }

    #[tokio::test]
    async fn test_empty_patch_is_noop() {
        let pool = init_memory_pool().await.unwrap();
        let report = insert_report(&pool, 1).await.unwrap();
        let updated = update_report(&pool, report.id, &ReportPatch::default())
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_update_missing_report_returns_false() {
        let pool = init_memory_pool().await.unwrap();
        let updated = update_report(
            &pool,
            12345,
            &ReportPatch {
                seo: Some(70.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_numeric_fields_round_trip() {
        let pool = init_memory_pool().await.unwrap();
        let report = insert_report(&pool, 1).await.unwrap();

        update_report(
            &pool,
            report.id,
            &ReportPatch {
                seo: Some(70.0),
                revisit: Some(4.0),
                concept: Some(100.0),
                view_channel_avg: Some(-12.34),
                positive_comment: Some(600),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let row = get_report(&pool, report.id).await.unwrap().unwrap();
        assert_eq!(row.seo, Some(70.0));
        assert_eq!(row.revisit, Some(4.0));
        assert_eq!(row.view_channel_avg, Some(-12.34));
        assert_eq!(row.positive_comment, Some(600));
    }
}
