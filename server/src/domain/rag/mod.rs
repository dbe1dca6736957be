//! Retrieval-augmented generation subsystem

mod chunking;
mod executor;
pub mod prompts;

pub use chunking::{ChunkParams, ChunkingEngine};
pub use executor::{RagError, RagExecutor};

#[cfg(test)]
pub use executor::testing;
