//! HTTP clients for the completion and embedding capabilities.
//!
//! `AnthropicProvider` implements `CompletionProvider` against the
//! Anthropic Messages API; `OpenAiEmbedder` implements `Embedder` against
//! any OpenAI-compatible `/v1/embeddings` endpoint.

pub mod anthropic;
pub mod openai_embeddings;

pub use anthropic::AnthropicProvider;
pub use openai_embeddings::OpenAiEmbedder;
