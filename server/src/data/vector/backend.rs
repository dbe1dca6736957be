//! Vector backend trait definition
//!
//! Chunks are append-only shared state: rows are never mutated after insert,
//! so readers tolerate concurrent writers. The similarity contract is
//! `similarity = 1 - cosine_distance` regardless of how a backend computes
//! distance; a backend whose native operator is not cosine must normalize.

use async_trait::async_trait;
use serde_json::Value;

use super::error::VectorError;
use crate::data::types::SourceType;

/// Chunk to insert
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub source_type: SourceType,
    /// report_id or video_id depending on the source type
    pub source_id: i64,
    pub content: String,
    pub chunk_index: i64,
    pub embedding: Vec<f32>,
    pub meta: Option<Value>,
}

/// Chunk returned from a similarity search, best match first
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimilarChunk {
    pub id: i64,
    pub source_type: SourceType,
    pub source_id: i64,
    pub content: String,
    pub chunk_index: i64,
    pub meta: Option<Value>,
    pub created_at: String,
    /// `1 - cosine_distance` to the query embedding
    pub similarity: f64,
}

/// Vector backend trait, implemented by the in-memory and pgvector stores
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Insert one chunk; returns its id
    async fn insert_chunk(&self, chunk: &NewChunk) -> Result<i64, VectorError>;

    /// k-NN search by cosine distance within one source type.
    /// `source_id` and `meta_filters` narrow the candidate set; each meta
    /// filter matches `meta->>key = value`.
    async fn search(
        &self,
        source_type: SourceType,
        query_embedding: &[f32],
        source_id: Option<i64>,
        meta_filters: &[(String, String)],
        limit: usize,
    ) -> Result<Vec<SimilarChunk>, VectorError>;

    /// Existence check gating chunking re-runs: any chunk with
    /// `meta->>'chunk_type' = chunk_type` and the given source id?
    async fn exists_by_chunk_type_and_id(
        &self,
        chunk_type: &str,
        source_id: i64,
    ) -> Result<bool, VectorError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), VectorError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}
