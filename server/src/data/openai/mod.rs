//! LLM provider adapters (chat completion + embeddings)
//!
//! The pipeline depends on these two traits, not on the concrete HTTP
//! clients, so handlers and the RAG layer are testable with in-process fakes.

mod chat;
mod embeddings;
mod error;

use async_trait::async_trait;

pub use chat::OpenAiChat;
pub use embeddings::OpenAiEmbeddings;
pub use error::LlmError;

/// Chat-style LLM invoked with a single composed prompt
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Text → fixed-length dense vector
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    /// Schema-level vector dimension (a deployment invariant)
    fn dimension(&self) -> u32;
}
