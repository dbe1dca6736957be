//! Comment repository
//!
//! Raw fetched comments are transient; only per-emotion summary rows are
//! persisted, bulk-inserted after summarization.

use sqlx::SqlitePool;

use crate::data::error::DataError;
use crate::data::types::{CommentRow, CommentType, NewComment};

/// Bulk-insert summarized comment rows
pub async fn insert_bulk(pool: &SqlitePool, comments: &[NewComment]) -> Result<(), DataError> {
    if comments.is_empty() {
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for comment in comments {
        sqlx::query(
            "INSERT INTO comment (report_id, content, comment_type, like_count, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.report_id)
        .bind(&comment.content)
        .bind(comment.comment_type.as_str())
        .bind(comment.like_count)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Summarized comments for a report, oldest first
pub async fn list_by_report(
    pool: &SqlitePool,
    report_id: i64,
) -> Result<Vec<CommentRow>, DataError> {
    let rows = sqlx::query_as::<_, (i64, i64, String, String, i64, i64)>(
        "SELECT id, report_id, content, comment_type, like_count, created_at \
         FROM comment WHERE report_id = ? ORDER BY id",
    )
    .bind(report_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, report_id, content, comment_type, like_count, created_at)| {
            let comment_type = CommentType::parse(&comment_type)
                .ok_or_else(|| DataError::Config(format!("invalid comment type: {comment_type}")))?;
            Ok(CommentRow {
                id,
                report_id,
                content,
                comment_type,
                like_count,
                created_at,
            })
        })
        .collect()
}
