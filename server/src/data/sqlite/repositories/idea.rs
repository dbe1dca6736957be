//! Idea repository

use sqlx::SqlitePool;

use crate::data::error::DataError;
use crate::data::types::{IdeaRow, NewIdea};

/// Bulk-insert generated ideas (bookmark flag starts cleared)
pub async fn insert_bulk(pool: &SqlitePool, ideas: &[NewIdea]) -> Result<(), DataError> {
    if ideas.is_empty() {
        return Ok(());
    }

    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for idea in ideas {
        sqlx::query(
            "INSERT INTO idea (video_id, title, content, hash_tag, is_book_marked, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(idea.video_id)
        .bind(&idea.title)
        .bind(&idea.content)
        .bind(&idea.hash_tag)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Ideas generated for a video, oldest first
pub async fn list_by_video(pool: &SqlitePool, video_id: i64) -> Result<Vec<IdeaRow>, DataError> {
    let rows = sqlx::query_as::<_, IdeaRow>(
        "SELECT id, video_id, title, content, hash_tag, is_book_marked \
         FROM idea WHERE video_id = ? ORDER BY id",
    )
    .bind(video_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
