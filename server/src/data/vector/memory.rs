//! In-memory vector backend
//!
//! Cosine similarity computed in Rust over a flat chunk list. Fine for local
//! development and tests; the pgvector backend is the production store.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::backend::{NewChunk, SimilarChunk, VectorBackend};
use super::cosine_similarity;
use super::error::VectorError;
use crate::data::types::SourceType;
use crate::utils::time::now_iso8601;

struct StoredChunk {
    id: i64,
    source_type: SourceType,
    source_id: i64,
    content: String,
    chunk_index: i64,
    embedding: Vec<f32>,
    meta: Option<serde_json::Value>,
    created_at: String,
}

/// In-memory vector backend
pub struct MemoryVectorBackend {
    chunks: Arc<RwLock<Vec<StoredChunk>>>,
    next_id: AtomicI64,
}

impl Default for MemoryVectorBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryVectorBackend {
    pub fn new() -> Self {
        Self {
            chunks: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicI64::new(1),
        }
    }
}

/// Meta filter semantics match the SQL `meta->>key = value` expression:
/// values compare by their string rendering.
fn meta_matches(meta: &Option<serde_json::Value>, filters: &[(String, String)]) -> bool {
    filters.iter().all(|(key, expected)| {
        meta.as_ref()
            .and_then(|m| m.get(key))
            .map(|v| match v {
                serde_json::Value::String(s) => s == expected,
                other => other.to_string() == *expected,
            })
            .unwrap_or(false)
    })
}

#[async_trait]
impl VectorBackend for MemoryVectorBackend {
    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<i64, VectorError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        self.chunks.write().push(StoredChunk {
            id,
            source_type: chunk.source_type,
            source_id: chunk.source_id,
            content: chunk.content.clone(),
            chunk_index: chunk.chunk_index,
            embedding: chunk.embedding.clone(),
            meta: chunk.meta.clone(),
            created_at: now_iso8601(),
        });

        Ok(id)
    }

    async fn search(
        &self,
        source_type: SourceType,
        query_embedding: &[f32],
        source_id: Option<i64>,
        meta_filters: &[(String, String)],
        limit: usize,
    ) -> Result<Vec<SimilarChunk>, VectorError> {
        let chunks = self.chunks.read();

        let mut matches: Vec<SimilarChunk> = chunks
            .iter()
            .filter(|c| c.source_type == source_type)
            .filter(|c| source_id.is_none_or(|id| c.source_id == id))
            .filter(|c| meta_matches(&c.meta, meta_filters))
            .map(|c| SimilarChunk {
                id: c.id,
                source_type: c.source_type,
                source_id: c.source_id,
                content: c.content.clone(),
                chunk_index: c.chunk_index,
                meta: c.meta.clone(),
                created_at: c.created_at.clone(),
                similarity: cosine_similarity(&c.embedding, query_embedding),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);

        Ok(matches)
    }

    async fn exists_by_chunk_type_and_id(
        &self,
        chunk_type: &str,
        source_id: i64,
    ) -> Result<bool, VectorError> {
        let chunks = self.chunks.read();
        Ok(chunks.iter().any(|c| {
            c.source_id == source_id
                && c.meta
                    .as_ref()
                    .and_then(|m| m.get("chunk_type"))
                    .and_then(|v| v.as_str())
                    == Some(chunk_type)
        }))
    }

    async fn health_check(&self) -> Result<(), VectorError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(source_type: SourceType, source_id: i64, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            source_type,
            source_id,
            content: "chunk text".into(),
            chunk_index: 0,
            embedding,
            meta: None,
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let backend = MemoryVectorBackend::new();
        backend
            .insert_chunk(&chunk(SourceType::VideoSummary, 1, vec![1.0, 0.0]))
            .await
            .unwrap();
        backend
            .insert_chunk(&chunk(SourceType::VideoSummary, 1, vec![0.0, 1.0]))
            .await
            .unwrap();
        backend
            .insert_chunk(&chunk(SourceType::VideoSummary, 1, vec![0.9, 0.1]))
            .await
            .unwrap();

        let results = backend
            .search(SourceType::VideoSummary, &[1.0, 0.0], None, &[], 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].similarity >= results[1].similarity);
        assert!((results[0].similarity - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_search_filters_by_source_type_and_id() {
        let backend = MemoryVectorBackend::new();
        backend
            .insert_chunk(&chunk(SourceType::VideoSummary, 1, vec![1.0, 0.0]))
            .await
            .unwrap();
        backend
            .insert_chunk(&chunk(SourceType::IdeaRecommendation, 1, vec![1.0, 0.0]))
            .await
            .unwrap();
        backend
            .insert_chunk(&chunk(SourceType::IdeaRecommendation, 2, vec![1.0, 0.0]))
            .await
            .unwrap();

        let results = backend
            .search(SourceType::IdeaRecommendation, &[1.0, 0.0], Some(2), &[], 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_id, 2);
    }

    #[tokio::test]
    async fn test_meta_filters() {
        let backend = MemoryVectorBackend::new();
        let mut time_chunk = chunk(SourceType::ViewerEscapeAnalysis, 5, vec![1.0]);
        time_chunk.meta = Some(json!({"chunk_type": "time", "is_focus_zone": true}));
        backend.insert_chunk(&time_chunk).await.unwrap();

        let mut mean_chunk = chunk(SourceType::ViewerEscapeAnalysis, 5, vec![1.0]);
        mean_chunk.meta = Some(json!({"chunk_type": "mean"}));
        backend.insert_chunk(&mean_chunk).await.unwrap();

        let results = backend
            .search(
                SourceType::ViewerEscapeAnalysis,
                &[1.0],
                Some(5),
                &[("chunk_type".to_string(), "mean".to_string())],
                10,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);

        // Non-string meta values compare by their JSON rendering
        let results = backend
            .search(
                SourceType::ViewerEscapeAnalysis,
                &[1.0],
                Some(5),
                &[("is_focus_zone".to_string(), "true".to_string())],
                10,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_exists_by_chunk_type_and_id() {
        let backend = MemoryVectorBackend::new();
        assert!(!backend.exists_by_chunk_type_and_id("time", 9).await.unwrap());

        let mut c = chunk(SourceType::ViewerEscapeAnalysis, 9, vec![1.0]);
        c.meta = Some(json!({"chunk_type": "time"}));
        backend.insert_chunk(&c).await.unwrap();

        assert!(backend.exists_by_chunk_type_and_id("time", 9).await.unwrap());
        assert!(!backend.exists_by_chunk_type_and_id("mean", 9).await.unwrap());
        assert!(!backend.exists_by_chunk_type_and_id("time", 10).await.unwrap());
    }
}
