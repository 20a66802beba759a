//! Similarity retrieval: rank stored memories against the current utterance.
//!
//! Flash and long-term records are pooled and scored with one query
//! embedding. Results are capped and thresholded; ties keep their original
//! snapshot order (stable sort), so retrieval is deterministic.

use mnemo_types::config::MemoryConfig;
use mnemo_types::error::MemoryError;
use mnemo_types::memory::MemorySnapshot;
use tracing::{debug, warn};

use crate::memory::embedder::Embedder;
use crate::memory::similarity::cosine_similarity;

/// Stateless memory retriever.
pub struct Retriever;

impl Retriever {
    /// Texts of the top memories relevant to `query`, best first.
    ///
    /// Returns an empty list without any embedding call when the query is
    /// blank or the snapshot holds no embedded records. Embedding failure
    /// degrades to an empty list (reduced recall, never a failed turn).
    #[tracing::instrument(name = "retrieve_memories", skip_all, fields(records = snapshot.record_count()))]
    pub async fn retrieve<E: Embedder>(
        embedder: &E,
        query: &str,
        snapshot: &MemorySnapshot,
        config: &MemoryConfig,
    ) -> Result<Vec<String>, MemoryError> {
        let query = query.trim();
        if query.is_empty() || snapshot.embedded_records().next().is_none() {
            return Ok(Vec::new());
        }

        let query_embedding = match embedder.embed(&[query.to_string()]).await {
            Ok(mut embeddings) if !embeddings.is_empty() => embeddings.remove(0),
            Ok(_) => {
                warn!("embedding returned no vectors; skipping retrieval");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(error = %e, "query embedding failed; skipping retrieval");
                return Ok(Vec::new());
            }
        };

        let mut scored: Vec<(f32, &str)> = snapshot
            .embedded_records()
            .map(|r| (cosine_similarity(&query_embedding, &r.embedding), r.text.as_str()))
            .filter(|(sim, _)| *sim >= config.retrieval_threshold)
            .collect();

        // Stable: equal similarities keep snapshot order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(config.max_context_items);

        debug!(matches = scored.len(), "retrieval complete");
        Ok(scored.into_iter().map(|(_, text)| text.to_string()).collect())
    }
}
