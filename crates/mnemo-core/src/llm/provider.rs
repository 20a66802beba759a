//! CompletionProvider trait definition.
//!
//! This is the abstraction the extractors call through. Uses native async
//! fn in traits (RPITIT, Rust 2024 edition). Implementations live in
//! mnemo-infra (e.g., `AnthropicProvider`).

use mnemo_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for completion backends (Anthropic, OpenAI-compatible, etc.).
///
/// Mnemo never streams: both extractors need the complete response text
/// before parsing, so the trait only exposes a blocking-style completion.
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
