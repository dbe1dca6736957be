//! Channel repository (read-only from the pipeline's perspective)

use sqlx::SqlitePool;

use crate::data::error::DataError;
use crate::data::types::ChannelRow;

/// Get a channel by id
pub async fn get_channel(pool: &SqlitePool, id: i64) -> Result<Option<ChannelRow>, DataError> {
    let row = sqlx::query_as::<_, ChannelRow>(
        "SELECT id, youtube_channel_id, name, concept, target, channel_hash_tag \
         FROM channel WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[cfg(test)]
pub async fn insert_test_channel(pool: &SqlitePool, channel: &ChannelRow) -> i64 {
    let result = sqlx::query(
        "INSERT INTO channel (youtube_channel_id, name, concept, target, channel_hash_tag) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&channel.youtube_channel_id)
    .bind(&channel.name)
    .bind(&channel.concept)
    .bind(&channel.target)
    .bind(&channel.channel_hash_tag)
    .execute(pool)
    .await
    .unwrap();
    result.last_insert_rowid()
}
