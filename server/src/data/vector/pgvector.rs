//! PostgreSQL + pgvector backend
//!
//! Embeddings are stored in a `vector(N)` column and searched with the `<=>`
//! cosine-distance operator; `similarity = 1 - (embedding <=> query)`.
//! The dimension is a deployment invariant fixed at schema creation.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::backend::{NewChunk, SimilarChunk, VectorBackend};
use super::error::VectorError;
use crate::data::types::SourceType;

/// pgvector-backed chunk store
pub struct PgVectorBackend {
    pool: PgPool,
}

impl PgVectorBackend {
    /// Connect and ensure the extension, table and index exist
    pub async fn new(postgres_url: &str, dimension: u32) -> Result<Self, VectorError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(postgres_url)
            .await?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&pool)
            .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS content_chunks (
                id          BIGSERIAL PRIMARY KEY,
                source_type TEXT NOT NULL,
                source_id   BIGINT NOT NULL,
                content     TEXT NOT NULL,
                chunk_index BIGINT NOT NULL,
                embedding   vector({dimension}) NOT NULL,
                meta        JSONB,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ))
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_content_chunks_source \
             ON content_chunks (source_type, source_id)",
        )
        .execute(&pool)
        .await?;

        tracing::debug!(dimension, "pgvector backend initialized");
        Ok(Self { pool })
    }
}

/// pgvector accepts the `[x,y,z]` text form cast to `vector`
fn embedding_literal(embedding: &[f32]) -> String {
    let mut out = String::with_capacity(embedding.len() * 10 + 2);
    out.push('[');
    for (i, value) in embedding.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}

#[async_trait]
impl VectorBackend for PgVectorBackend {
    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<i64, VectorError> {
        let row = sqlx::query(
            "INSERT INTO content_chunks \
             (source_type, source_id, content, chunk_index, embedding, meta) \
             VALUES ($1, $2, $3, $4, $5::vector, $6) RETURNING id",
        )
        .bind(chunk.source_type.as_str())
        .bind(chunk.source_id)
        .bind(&chunk.content)
        .bind(chunk.chunk_index)
        .bind(embedding_literal(&chunk.embedding))
        .bind(&chunk.meta)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("id"))
    }

    async fn search(
        &self,
        source_type: SourceType,
        query_embedding: &[f32],
        source_id: Option<i64>,
        meta_filters: &[(String, String)],
        limit: usize,
    ) -> Result<Vec<SimilarChunk>, VectorError> {
        let literal = embedding_literal(query_embedding);

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT c.id, c.source_type, c.source_id, c.content, c.chunk_index, c.meta, \
             c.created_at::text AS created_at, \
             1 - (c.embedding <=> ",
        );
        builder.push_bind(literal.clone());
        builder.push("::vector) AS similarity FROM content_chunks c WHERE c.source_type = ");
        builder.push_bind(source_type.as_str());

        if let Some(id) = source_id {
            builder.push(" AND c.source_id = ");
            builder.push_bind(id);
        }

        for (key, value) in meta_filters {
            builder.push(" AND c.meta ->> ");
            builder.push_bind(key.clone());
            builder.push(" = ");
            builder.push_bind(value.clone());
        }

        builder.push(" ORDER BY c.embedding <=> ");
        builder.push_bind(literal);
        builder.push("::vector LIMIT ");
        builder.push_bind(limit as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|row| {
                let source_type_raw: String = row.get("source_type");
                let source_type = SourceType::parse(&source_type_raw).ok_or_else(|| {
                    VectorError::Config(format!("unknown source type: {source_type_raw}"))
                })?;
                Ok(SimilarChunk {
                    id: row.get("id"),
                    source_type,
                    source_id: row.get("source_id"),
                    content: row.get("content"),
                    chunk_index: row.get("chunk_index"),
                    meta: row.get("meta"),
                    created_at: row.get("created_at"),
                    similarity: row.get("similarity"),
                })
            })
            .collect()
    }

    async fn exists_by_chunk_type_and_id(
        &self,
        chunk_type: &str,
        source_id: i64,
    ) -> Result<bool, VectorError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                SELECT 1 FROM content_chunks \
                WHERE source_id = $1 AND meta ->> 'chunk_type' = $2 \
             )",
        )
        .bind(source_id)
        .bind(chunk_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn health_check(&self) -> Result<(), VectorError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "pgvector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_literal() {
        assert_eq!(embedding_literal(&[1.0, -0.5, 0.25]), "[1,-0.5,0.25]");
        assert_eq!(embedding_literal(&[]), "[]");
    }
}
