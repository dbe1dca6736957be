//! Video repository (read-only from the pipeline's perspective)

use sqlx::SqlitePool;

use crate::data::error::DataError;
use crate::data::types::VideoRow;

const VIDEO_COLUMNS: &str = "id, channel_id, youtube_video_id, video_category, title, \
     description, view, like_count, comment_count";

/// Get a video by id
pub async fn get_video(pool: &SqlitePool, id: i64) -> Result<Option<VideoRow>, DataError> {
    let row = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM video WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// All videos on a channel (consistency scoring, channel averages)
pub async fn list_by_channel(
    pool: &SqlitePool,
    channel_id: i64,
) -> Result<Vec<VideoRow>, DataError> {
    let rows = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM video WHERE channel_id = ? ORDER BY id"
    ))
    .bind(channel_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All videos sharing a category (topic averages)
pub async fn list_by_category(
    pool: &SqlitePool,
    video_category: i64,
) -> Result<Vec<VideoRow>, DataError> {
    let rows = sqlx::query_as::<_, VideoRow>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM video WHERE video_category = ? ORDER BY id"
    ))
    .bind(video_category)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
pub async fn insert_test_video(pool: &SqlitePool, video: &VideoRow) -> i64 {
    let result = sqlx::query(
        "INSERT INTO video (channel_id, youtube_video_id, video_category, title, description, \
         view, like_count, comment_count) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(video.channel_id)
    .bind(&video.youtube_video_id)
    .bind(video.video_category)
    .bind(&video.title)
    .bind(&video.description)
    .bind(video.view)
    .bind(video.like_count)
    .bind(video.comment_count)
    .execute(pool)
    .await
    .unwrap();
    result.last_insert_rowid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::init_memory_pool;

    fn video(channel_id: i64, category: i64, yt: &str) -> VideoRow {
        VideoRow {
            id: 0,
            channel_id,
            youtube_video_id: yt.into(),
            video_category: category,
            title: Some(format!("video {yt}")),
            description: Some("desc".into()),
            view: Some(1000),
            like_count: Some(50),
            comment_count: Some(10),
        }
    }

    #[tokio::test]
    async fn test_get_video() {
        let pool = init_memory_pool().await.unwrap();
        let id = insert_test_video(&pool, &video(1, 24, "abc")).await;

        let row = get_video(&pool, id).await.unwrap().unwrap();
        assert_eq!(row.youtube_video_id, "abc");
        assert_eq!(row.video_category, 24);
    }

    #[tokio::test]
    async fn test_get_missing_video() {
        let pool = init_memory_pool().await.unwrap();
        assert!(get_video(&pool, 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_by_channel_and_category() {
        let pool = init_memory_pool().await.unwrap();
        insert_test_video(&pool, &video(1, 24, "a")).await;
        insert_test_video(&pool, &video(1, 10, "b")).await;
        insert_test_video(&pool, &video(2, 24, "c")).await;

        assert_eq!(list_by_channel(&pool, 1).await.unwrap().len(), 2);
        assert_eq!(list_by_category(&pool, 24).await.unwrap().len(), 2);
        assert!(list_by_channel(&pool, 3).await.unwrap().is_empty());
    }
}
