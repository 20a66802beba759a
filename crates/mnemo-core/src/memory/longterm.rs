//! Long-term consolidation: one evolving summary record per cycle.
//!
//! Re-derives the conversation summary from the prior long-term records
//! plus a window of new dialogue, in a single completion call. The whole
//! trimmed response becomes one `MemoryRecord` tagged `conversation_summary`.

use mnemo_types::config::MemoryConfig;
use mnemo_types::error::MemoryError;
use mnemo_types::event::InteractionEvent;
use mnemo_types::llm::{CompletionRequest, Message};
use mnemo_types::memory::{MemoryRecord, MemorySnapshot, SUMMARY_TOPIC};
use tracing::{debug, warn};

use crate::llm::provider::CompletionProvider;
use crate::memory::embedder::Embedder;
use crate::memory::window::{render_transcript, tail_window};

/// Prompt template for summary consolidation.
const CONSOLIDATION_PROMPT: &str = r#"You maintain a running summary of a spoken conversation between a user and a voice assistant.

Fold the new dialogue below into the previous summary. Keep what still matters, drop what the new dialogue supersedes, and stay under 150 words. Write plain prose, no headings or lists.

Previous summary:
{previous}

New dialogue:
{conversation}

Updated summary:"#;

/// Stateless long-term summary extractor.
pub struct LongTermExtractor;

impl LongTermExtractor {
    /// Consolidate the dialogue window and prior summary into one record.
    ///
    /// An empty completion result means no record this cycle. Embedding
    /// failure is logged and also yields no record; the turn proceeds.
    #[tracing::instrument(name = "long_term_extract", skip_all, fields(history_len = history.len()))]
    pub async fn extract<P: CompletionProvider, E: Embedder>(
        provider: &P,
        embedder: &E,
        history: &[InteractionEvent],
        snapshot: &MemorySnapshot,
        config: &MemoryConfig,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let window = tail_window(history, config.long_term_window_events);
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let previous = snapshot.long_term_digest();
        let prompt = CONSOLIDATION_PROMPT
            .replace("{previous}", if previous.is_empty() { "(none)" } else { &previous })
            .replace("{conversation}", &render_transcript(window));
        let request = CompletionRequest {
            model: String::new(), // provider uses its default model
            messages: vec![Message::user(prompt)],
            system: None,
            max_tokens: 512,
            temperature: Some(0.0),
        };

        let response = provider.complete(&request).await?;
        let summary = response.content.trim();
        if summary.is_empty() {
            debug!("consolidation produced an empty summary");
            return Ok(Vec::new());
        }

        let embedding = match embedder.embed(&[summary.to_string()]).await {
            Ok(mut embeddings) if !embeddings.is_empty() => embeddings.remove(0),
            Ok(_) => {
                warn!("embedding returned no vectors; dropping summary");
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(error = %e, "embedding failed; dropping summary");
                return Ok(Vec::new());
            }
        };

        Ok(vec![
            MemoryRecord::new(summary, vec![SUMMARY_TOPIC.to_string()]).with_embedding(embedding),
        ])
    }
}
