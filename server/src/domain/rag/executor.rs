//! RAG executor
//!
//! Composes (context, query, template) into a single prompt and invokes the
//! chat model. JSON-expected prompts go through `invoke_json`, which strips
//! code fences and retries the whole LLM call on parse failure.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::data::openai::{ChatModel, LlmError};
use crate::data::vector::VectorError;
use crate::utils::json::parse_llm_json;

/// Errors from RAG execution
#[derive(Error, Debug)]
pub enum RagError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    /// LLM output was not valid JSON after the whole retry budget
    #[error("LLM output was not valid JSON after {attempts} attempts: {last_error}")]
    JsonParse { attempts: u32, last_error: String },
}

impl RagError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_transient(),
            Self::Vector(e) => e.is_transient(),
            Self::JsonParse { .. } => false,
        }
    }
}

/// Executor around a chat model
pub struct RagExecutor {
    chat: Arc<dyn ChatModel>,
}

impl RagExecutor {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Fill a `{context}`/`{input}` template and invoke the model
    pub async fn execute_chain(
        &self,
        context: &str,
        query: &str,
        template: &str,
    ) -> Result<String, RagError> {
        let prompt = template
            .replace("{context}", context)
            .replace("{input}", query);
        Ok(self.chat.complete(&prompt).await?)
    }

    /// Invoke an already-composed prompt directly
    pub async fn execute_direct(&self, prompt: &str) -> Result<String, RagError> {
        Ok(self.chat.complete(prompt).await?)
    }

    /// Run a chain whose output must parse as JSON; the LLM call is retried
    /// up to `budget` times on parse failure (model nondeterminism usually
    /// fixes itself faster than prompt surgery).
    pub async fn execute_chain_json<T: DeserializeOwned>(
        &self,
        context: &str,
        query: &str,
        template: &str,
        budget: u32,
    ) -> Result<T, RagError> {
        let prompt = template
            .replace("{context}", context)
            .replace("{input}", query);
        self.execute_direct_json(&prompt, budget).await
    }

    /// JSON-expecting invocation of an already-composed prompt
    pub async fn execute_direct_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        budget: u32,
    ) -> Result<T, RagError> {
        let mut last_error = String::new();

        for attempt in 1..=budget.max(1) {
            let raw = self.execute_direct(prompt).await?;
            match parse_llm_json::<T>(&raw) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_error = e.to_string();
                    tracing::warn!(
                        attempt,
                        budget,
                        error = %last_error,
                        "LLM JSON parse failed, retrying"
                    );
                }
            }
        }

        Err(RagError::JsonParse {
            attempts: budget.max(1),
            last_error,
        })
    }
}
