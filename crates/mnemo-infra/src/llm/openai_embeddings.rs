//! OpenAiEmbedder -- concrete [`Embedder`] for OpenAI-compatible APIs.
//!
//! One JSON POST to `/v1/embeddings` per batch. The base URL is
//! configurable, so any OpenAI-compatible embedding endpoint works, not
//! just api.openai.com.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use mnemo_core::memory::embedder::Embedder;
use mnemo_types::llm::LlmError;

/// Dimensionality of text-embedding-3-small, the default model.
const DEFAULT_DIMENSION: usize = 1536;

/// OpenAI-compatible embedding client.
///
/// Does not derive `Debug`; the API key stays out of logs.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Create a client for the given model against api.openai.com.
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        let model = model.into();
        let dimension = dimension_for_model(&model);
        Ok(Self {
            client,
            api_key,
            base_url: "https://api.openai.com".to_string(),
            model,
            dimension,
        })
    }

    /// Override the base URL (proxies, compatible endpoints, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The embedding model this client calls.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Dimensionality of the vectors the configured model produces.
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Output dimensionality by model name; conservative default for unknowns.
fn dimension_for_model(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => DEFAULT_DIMENSION,
    }
}

impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = WireRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        };
        let url = format!("{}/v1/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited,
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        // The API is free to reorder; the index field restores input order.
        let mut data = wire.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(LlmError::Deserialization(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Request body for the embeddings endpoint.
#[derive(Debug, Clone, Serialize)]
struct WireRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireResponse {
    data: Vec<WireEmbedding>,
}

#[derive(Debug, Clone, Deserialize)]
struct WireEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_for_known_models() {
        assert_eq!(dimension_for_model("text-embedding-3-small"), 1536);
        assert_eq!(dimension_for_model("text-embedding-3-large"), 3072);
        assert_eq!(dimension_for_model("something-new"), DEFAULT_DIMENSION);
    }

    #[test]
    fn test_wire_response_reordered_by_index() {
        let json = r#"{
            "data": [
                {"index": 1, "embedding": [0.2]},
                {"index": 0, "embedding": [0.1]}
            ]
        }"#;
        let mut wire: WireResponse = serde_json::from_str(json).unwrap();
        wire.data.sort_by_key(|d| d.index);
        assert_eq!(wire.data[0].embedding, vec![0.1]);
        assert_eq!(wire.data[1].embedding, vec![0.2]);
    }

    #[test]
    fn test_request_body_shape() {
        let body = WireRequest {
            model: "text-embedding-3-small".to_string(),
            input: vec!["a".to_string(), "b".to_string()],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"input\":[\"a\",\"b\"]"));
    }
}
