//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding text into vectors for similarity
//! scoring. Implementations (e.g., OpenAI embeddings) live in mnemo-infra.

use mnemo_types::llm::LlmError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in mnemo-infra.
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors.
    ///
    /// Returns one vector per input text, in input order. Extraction embeds
    /// whole candidate batches in one call.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send;
}
