//! Vector store (content chunks + similarity retrieval)
//!
//! `VectorStore` is the service the pipeline talks to: it windows context
//! text, calls the embedding provider and delegates persistence and k-NN
//! search to a pluggable backend (in-memory or pgvector).
//!
//! Chunk rows are append-only shared state across reports: later reports
//! retrieve prior chunks by source type. Idempotence is coarse-grained via
//! `exists_by_chunk_type_and_id`, never content hashing.

mod backend;
mod error;
mod memory;
mod pgvector;

use std::sync::Arc;

use serde_json::Value;

pub use backend::{NewChunk, SimilarChunk, VectorBackend};
pub use error::VectorError;
pub use memory::MemoryVectorBackend;
pub use pgvector::PgVectorBackend;

use crate::core::config::{VectorBackendType, VectorConfig};
use crate::core::constants::{VECTOR_CHUNK_OVERLAP, VECTOR_CHUNK_SIZE};
use crate::data::openai::EmbeddingModel;
use crate::data::types::SourceType;

/// Cosine similarity between two vectors; 0 when either norm is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Vector store service
pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    embeddings: Arc<dyn EmbeddingModel>,
    chunk_size: usize,
    overlap: usize,
}

impl VectorStore {
    pub fn new(backend: Arc<dyn VectorBackend>, embeddings: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            backend,
            embeddings,
            chunk_size: VECTOR_CHUNK_SIZE,
            overlap: VECTOR_CHUNK_OVERLAP,
        }
    }

    /// Create from configuration
    pub async fn from_config(
        config: &VectorConfig,
        embeddings: Arc<dyn EmbeddingModel>,
    ) -> Result<Self, VectorError> {
        let backend: Arc<dyn VectorBackend> = match config.backend {
            VectorBackendType::Memory => Arc::new(MemoryVectorBackend::new()),
            VectorBackendType::Pgvector => {
                let url = config.postgres_url.as_ref().ok_or_else(|| {
                    VectorError::Config("postgres_url required for pgvector backend".into())
                })?;
                Arc::new(PgVectorBackend::new(url, embeddings.dimension()).await?)
            }
        };

        Ok(Self::new(backend, embeddings))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub async fn health_check(&self) -> Result<(), VectorError> {
        self.backend.health_check().await
    }

    /// Embed a query text (exposed for callers that search by embedding)
    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        Ok(self.embeddings.embed(text).await?)
    }

    /// Split text into overlapping character windows; whitespace-only
    /// windows are dropped.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let window: String = chars[start..end].iter().collect();
            if !window.trim().is_empty() {
                chunks.push(window);
            }
            if end == chars.len() {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }

    /// Window `context`, embed each window and persist the chunks.
    /// Returns the number of chunks written.
    pub async fn save_context(
        &self,
        source_type: SourceType,
        source_id: i64,
        context: &str,
        meta: Option<Value>,
    ) -> Result<usize, VectorError> {
        let chunks = self.chunk_text(context);

        for (index, content) in chunks.iter().enumerate() {
            let embedding = self.embeddings.embed(content).await?;
            self.backend
                .insert_chunk(&NewChunk {
                    source_type,
                    source_id,
                    content: content.clone(),
                    chunk_index: index as i64,
                    embedding,
                    meta: meta.clone(),
                })
                .await?;
        }

        tracing::debug!(
            source_type = source_type.as_str(),
            source_id,
            chunks = chunks.len(),
            "Context saved to vector store"
        );
        Ok(chunks.len())
    }

    /// k-NN search with a precomputed query embedding
    pub async fn search_similar_by_embedding(
        &self,
        source_type: SourceType,
        query_embedding: &[f32],
        source_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SimilarChunk>, VectorError> {
        self.backend
            .search(source_type, query_embedding, source_id, &[], limit)
            .await
    }

    /// Embed `query` and return the top-K similar chunks, optionally scoped
    /// to a source id and meta filters (`meta->>key = value` each).
    pub async fn search_similar(
        &self,
        query: &str,
        source_type: SourceType,
        source_id: Option<i64>,
        meta_filters: &[(String, String)],
        limit: usize,
    ) -> Result<Vec<SimilarChunk>, VectorError> {
        let embedding = self.embeddings.embed(query).await?;
        self.backend
            .search(source_type, &embedding, source_id, meta_filters, limit)
            .await
    }

    /// Gate for chunking re-runs (one bit per `(source_id, chunk_type)`)
    pub async fn exists_by_chunk_type_and_id(
        &self,
        chunk_type: &str,
        source_id: i64,
    ) -> Result<bool, VectorError> {
        self.backend
            .exists_by_chunk_type_and_id(chunk_type, source_id)
            .await
    }
}

#[cfg(test)]
pub mod testing {
    //! Deterministic in-process embedder for tests

    use async_trait::async_trait;

    use crate::data::openai::{EmbeddingModel, LlmError};

    /// Maps text to a fixed-dimension character histogram. Identical inputs
    /// produce identical vectors, so self-similarity is exactly 1.0.
    pub struct HashEmbedder {
        pub dimension: u32,
    }

    impl Default for HashEmbedder {
        fn default() -> Self {
            Self { dimension: 16 }
        }
    }

    #[async_trait]
    impl EmbeddingModel for HashEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            let mut vector = vec![0.0f32; self.dimension as usize];
            for (i, c) in text.chars().enumerate() {
                let bucket = (c as usize + i) % vector.len();
                vector[bucket] += 1.0;
            }
            Ok(vector)
        }

        fn dimension(&self) -> u32 {
            self.dimension
        }
    }
}
