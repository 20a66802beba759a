//! Flash extraction: short-horizon fact capture from recent dialogue.
//!
//! One completion call over a bounded dialogue window, followed by a
//! multi-strategy parse of the model's free-text output, one batch
//! embedding call, and a greedy in-batch dedup. Models routinely bend the
//! requested JSON shape, so parsing is an ordered cascade of pure attempts
//! that short-circuits on the first success -- an unparseable response
//! after all strategies is zero records, not an error.

use mnemo_types::config::MemoryConfig;
use mnemo_types::error::MemoryError;
use mnemo_types::event::InteractionEvent;
use mnemo_types::llm::{CompletionRequest, Message};
use mnemo_types::memory::MemoryRecord;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::provider::CompletionProvider;
use crate::memory::embedder::Embedder;
use crate::memory::similarity::cosine_similarity;
use crate::memory::window::{render_transcript, tail_window};

/// Sentinel the model answers when the window holds nothing worth keeping.
pub const SKIP_SENTINEL: &str = "NONE";

/// Topic value the model uses when it has no topic to offer.
const NO_TOPIC: &str = "n/a";

/// Prompt template for flash fact extraction.
const FLASH_EXTRACTION_PROMPT: &str = r#"You review a snippet of spoken conversation between a user and a voice assistant and extract facts worth remembering for later turns.

Return a JSON array. Each element must have exactly these fields:
- "important": boolean (true only if the fact is worth remembering)
- "topic": string (a short snake_case topic, or "n/a" if none fits)
- "memory": string (the fact as one standalone sentence)

Rules:
1. Extract only facts stated by the user, not the assistant
2. Each memory must stand alone without the conversation
3. Skip greetings, pleasantries, and filler
4. If nothing is worth remembering, answer with the single word NONE

Conversation:
{conversation}

Output the JSON array (or NONE) only, no explanation:"#;

/// A parsed fact candidate, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct FactCandidate {
    pub memory: String,
    pub topic: Option<String>,
}

/// Result of one parse strategy.
///
/// The cascade runs strategies in order and stops at the first `Parsed`;
/// `NoMatch` hands the raw text to the next strategy untouched.
#[derive(Debug)]
pub enum ParseOutcome {
    Parsed(Vec<FactCandidate>),
    NoMatch,
}

/// Stateless flash fact extractor.
pub struct FlashExtractor;

impl FlashExtractor {
    /// Extract, embed, and dedup flash facts from the recent dialogue.
    ///
    /// Returns an empty vector (without calling the completion service)
    /// when the window is empty, and an empty vector (without calling the
    /// embedding service) when the model answers the skip sentinel or
    /// nothing parseable. Embedding failure is logged and also yields an
    /// empty vector; the turn proceeds.
    #[tracing::instrument(name = "flash_extract", skip_all, fields(history_len = history.len()))]
    pub async fn extract<P: CompletionProvider, E: Embedder>(
        provider: &P,
        embedder: &E,
        history: &[InteractionEvent],
        config: &MemoryConfig,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let window = tail_window(history, config.flash_window_turns.saturating_mul(2));
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let prompt =
            FLASH_EXTRACTION_PROMPT.replace("{conversation}", &render_transcript(window));
        let request = CompletionRequest {
            model: String::new(), // provider uses its default model
            messages: vec![Message::user(prompt)],
            system: None,
            max_tokens: 1024,
            temperature: Some(0.0),
        };

        let response = provider.complete(&request).await?;
        let candidates = parse_candidates(&response.content, config.max_flash_candidates);
        if candidates.is_empty() {
            debug!("flash extraction produced no candidates");
            return Ok(Vec::new());
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.memory.clone()).collect();
        let embeddings = match embedder.embed(&texts).await {
            Ok(embeddings) if embeddings.len() == candidates.len() => embeddings,
            Ok(embeddings) => {
                warn!(
                    expected = candidates.len(),
                    got = embeddings.len(),
                    "embedding batch size mismatch; dropping flash candidates"
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                warn!(error = %e, "embedding failed; dropping flash candidates");
                return Ok(Vec::new());
            }
        };

        Ok(dedup_batch(candidates, embeddings, config.flash_dedup_threshold))
    }
}

/// Run the parse cascade over the raw completion output.
///
/// Strategies, in order: strict JSON after fence/prose stripping, quote
/// coercion plus targeted item matching, and a literal `Fact:`/`Topic:`
/// line scan capped at `max_candidates`.
pub fn parse_candidates(raw: &str, max_candidates: usize) -> Vec<FactCandidate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(SKIP_SENTINEL) {
        return Vec::new();
    }

    if let ParseOutcome::Parsed(candidates) = parse_strict_json(trimmed) {
        return candidates;
    }
    if let ParseOutcome::Parsed(candidates) = parse_coerced_items(trimmed) {
        return candidates;
    }
    if let ParseOutcome::Parsed(candidates) = parse_fact_lines(trimmed, max_candidates) {
        return candidates;
    }

    let preview: String = trimmed.chars().take(120).collect();
    warn!(preview = %preview, "flash output unparseable; zero records");
    Vec::new()
}

/// Strategy 1: strip markdown fencing and surrounding prose, parse as JSON.
///
/// Accepts a JSON array or a single object. Items count only when
/// `important` is boolean true and `memory` is a non-empty string.
fn parse_strict_json(raw: &str) -> ParseOutcome {
    let Some(json_str) = extract_json_span(raw) else {
        return ParseOutcome::NoMatch;
    };

    let Ok(value) = serde_json::from_str::<Value>(json_str) else {
        return ParseOutcome::NoMatch;
    };

    let items: Vec<&Value> = match &value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![&value],
        _ => return ParseOutcome::NoMatch,
    };

    let candidates: Vec<FactCandidate> =
        items.iter().filter_map(|v| candidate_from_value(v)).collect();
    // An empty array is a successful parse ("nothing to remember"); a
    // non-empty array where no item qualifies is too.
    ParseOutcome::Parsed(candidates)
}

/// Strategy 2: quote unquoted `topic`/`memory` values, then retry items.
///
/// Models sometimes emit `{"important": true, "memory": the user likes tea}`.
/// Each top-level `{...}` span is repaired independently (boundary-matching
/// the unquoted value against the next comma or closing brace) so one
/// mangled item does not sink its siblings.
fn parse_coerced_items(raw: &str) -> ParseOutcome {
    let chunks = brace_chunks(raw);
    if chunks.is_empty() {
        return ParseOutcome::NoMatch;
    }

    let mut candidates = Vec::new();
    let mut any_parsed = false;
    for chunk in chunks {
        let coerced = coerce_unquoted_values(chunk);
        if let Ok(value) = serde_json::from_str::<Value>(&coerced) {
            any_parsed = true;
            if let Some(candidate) = candidate_from_value(&value) {
                candidates.push(candidate);
            }
        }
    }

    if any_parsed {
        ParseOutcome::Parsed(candidates)
    } else {
        ParseOutcome::NoMatch
    }
}

/// Strategy 3: literal `Fact: ... Topic: ...` pair scan.
///
/// Last resort for fully degenerate output. Bounded to `max_candidates`
/// items so a rambling response cannot flood the batch.
fn parse_fact_lines(raw: &str, max_candidates: usize) -> ParseOutcome {
    let mut candidates = Vec::new();
    for line in raw.lines() {
        if candidates.len() >= max_candidates {
            break;
        }
        let Some(rest) = line.trim().strip_prefix("Fact:") else {
            continue;
        };
        let (memory, topic) = match rest.split_once("Topic:") {
            Some((memory, topic)) => (memory.trim(), Some(topic.trim())),
            None => (rest.trim(), None),
        };
        if memory.is_empty() {
            continue;
        }
        candidates.push(FactCandidate {
            memory: memory.to_string(),
            topic: topic
                .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(NO_TOPIC))
                .map(|t| t.trim_end_matches('.').to_string()),
        });
    }

    if candidates.is_empty() {
        ParseOutcome::NoMatch
    } else {
        ParseOutcome::Parsed(candidates)
    }
}

/// Slice `raw` down to the outermost JSON span, stripping fences and prose.
fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find(['[', '{'])?;
    let close = match raw.as_bytes()[start] {
        b'[' => ']',
        _ => '}',
    };
    let end = raw.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Pull a qualifying candidate out of one parsed JSON item.
///
/// Returns `None` when `important` is missing, non-boolean, or false, or
/// when `memory` is missing or empty. A `topic` of the literal "n/a" is
/// dropped rather than recorded.
fn candidate_from_value(value: &Value) -> Option<FactCandidate> {
    let obj = value.as_object()?;
    if !obj.get("important")?.as_bool()? {
        return None;
    }
    let memory = obj.get("memory")?.as_str()?.trim();
    if memory.is_empty() {
        return None;
    }
    let topic = obj
        .get("topic")
        .and_then(|t| t.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(NO_TOPIC))
        .map(String::from);

    Some(FactCandidate {
        memory: memory.to_string(),
        topic,
    })
}

/// Top-level `{...}` spans in `raw`, by brace depth.
///
/// Braces inside quoted strings are ignored while a string is open.
fn brace_chunks(raw: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            if c != '\\' {
                escaped = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        chunks.push(&raw[start..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    chunks
}

/// Quote unquoted string values for the `topic` and `memory` keys.
///
/// Finds `"key":` and, when the value does not open with a quote, wraps the
/// text up to the next top-level comma or closing brace in quotes (escaping
/// any interior quotes).
fn coerce_unquoted_values(chunk: &str) -> String {
    let mut result = chunk.to_string();
    for key in ["topic", "memory"] {
        let needle = format!("\"{key}\"");
        let Some(key_pos) = result.find(&needle) else {
            continue;
        };
        let after_key = key_pos + needle.len();
        let Some(colon_offset) = result[after_key..].find(':') else {
            continue;
        };
        let value_start = after_key + colon_offset + 1;
        let rest = &result[value_start..];
        let lead = rest.len() - rest.trim_start().len();
        let value_start = value_start + lead;

        if result[value_start..].starts_with('"') {
            continue; // already quoted
        }

        let boundary = result[value_start..]
            .find([',', '}'])
            .map(|i| value_start + i)
            .unwrap_or(result.len());
        let value = result[value_start..boundary].trim().replace('"', "\\\"");
        result.replace_range(value_start..boundary, &format!("\"{value}\""));
    }
    result
}

/// Greedy in-batch dedup: drop a candidate when its similarity to any
/// earlier-kept candidate meets the threshold.
///
/// Order-dependent by design; determinism comes from stable extraction
/// order.
fn dedup_batch(
    candidates: Vec<FactCandidate>,
    embeddings: Vec<Vec<f32>>,
    threshold: f32,
) -> Vec<MemoryRecord> {
    let mut records: Vec<MemoryRecord> = Vec::new();

    for (candidate, embedding) in candidates.into_iter().zip(embeddings) {
        let duplicate = records
            .iter()
            .any(|kept| cosine_similarity(&kept.embedding, &embedding) >= threshold);
        if duplicate {
            debug!(memory = %candidate.memory, "dropped in-batch duplicate");
            continue;
        }
        let topics = candidate.topic.into_iter().collect();
        records.push(MemoryRecord::new(candidate.memory, topics).with_embedding(embedding));
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_types::llm::{CompletionResponse, LlmError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        response: String,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl CompletionProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(
            &self,
            _request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CompletionResponse {
                content: self.response.clone(),
            })
        }
    }

    struct FakeEmbedder {
        vectors: Vec<Vec<f32>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeEmbedder {
        fn returning(vectors: Vec<Vec<f32>>) -> Self {
            Self {
                vectors,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                vectors: Vec::new(),
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }
    }

    impl Embedder for FakeEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LlmError::Provider {
                    message: "embedding backend down".to_string(),
                });
            }
            Ok(self.vectors.iter().take(texts.len()).cloned().collect())
        }
    }

    fn history() -> Vec<InteractionEvent> {
        vec![
            InteractionEvent::user("My dog is named Max and I live in Lisbon."),
            InteractionEvent::assistant("Noted -- Max sounds lovely."),
        ]
    }

    // --- parse cascade ---

    #[test]
    fn test_parse_valid_json_array() {
        let raw = r#"[
            {"important": true, "topic": "pets", "memory": "The user's dog is named Max"},
            {"important": false, "topic": "smalltalk", "memory": "The user said hello"},
            {"important": true, "topic": "n/a", "memory": "The user lives in Lisbon"}
        ]"#;
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].memory, "The user's dog is named Max");
        assert_eq!(candidates[0].topic.as_deref(), Some("pets"));
        // "n/a" topic folds to none
        assert!(candidates[1].topic.is_none());
    }

    #[test]
    fn test_parse_single_object() {
        let raw = r#"{"important": true, "topic": "work", "memory": "The user is a nurse"}"#;
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].topic.as_deref(), Some("work"));
    }

    #[test]
    fn test_parse_markdown_fenced_json() {
        let raw = "```json\n[{\"important\": true, \"topic\": \"pets\", \"memory\": \"Dog is Max\"}]\n```";
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_parse_with_surrounding_prose() {
        let raw = "Here are the facts:\n[{\"important\": true, \"memory\": \"User uses Rust\"}]\nDone.";
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].memory, "User uses Rust");
    }

    #[test]
    fn test_parse_rejects_missing_important() {
        let raw = r#"[{"topic": "pets", "memory": "Dog is Max"}]"#;
        assert!(parse_candidates(raw, 4).is_empty());
    }

    #[test]
    fn test_parse_rejects_empty_memory() {
        let raw = r#"[{"important": true, "topic": "pets", "memory": "  "}]"#;
        assert!(parse_candidates(raw, 4).is_empty());
    }

    #[test]
    fn test_parse_skip_sentinel() {
        assert!(parse_candidates("NONE", 4).is_empty());
        assert!(parse_candidates("  none\n", 4).is_empty());
        assert!(parse_candidates("", 4).is_empty());
    }

    #[test]
    fn test_parse_coerces_unquoted_memory() {
        let raw = r#"[{"important": true, "topic": "pets", "memory": the user's dog is Max}]"#;
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].memory, "the user's dog is Max");
    }

    #[test]
    fn test_parse_coercion_keeps_valid_siblings() {
        let raw = r#"[
            {"important": true, "topic": "a", "memory": unquoted fact here},
            {"important": true, "topic": "b", "memory": "quoted fact"}
        ]"#;
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_fact_topic_lines() {
        let raw = "Fact: The user drinks oat milk. Topic: food_preferences\nFact: The user works nights. Topic: n/a";
        let candidates = parse_candidates(raw, 4);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].memory, "The user drinks oat milk.");
        assert_eq!(candidates[0].topic.as_deref(), Some("food_preferences"));
        assert!(candidates[1].topic.is_none());
    }

    #[test]
    fn test_parse_fact_lines_bounded() {
        let raw = (0..10)
            .map(|i| format!("Fact: fact number {i}. Topic: t{i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let candidates = parse_candidates(&raw, 4);
        assert_eq!(candidates.len(), 4);
    }

    #[test]
    fn test_parse_garbage_returns_empty() {
        assert!(parse_candidates("I couldn't find anything notable, sorry!", 4).is_empty());
    }

    // --- extraction flow ---

    #[tokio::test]
    async fn test_empty_window_skips_completion_call() {
        let provider = FakeProvider::new("[]");
        let embedder = FakeEmbedder::returning(vec![]);
        let records = FlashExtractor::extract(&provider, &embedder, &[], &MemoryConfig::default())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_skip_sentinel_makes_no_embedding_call() {
        let provider = FakeProvider::new("NONE");
        let embedder = FakeEmbedder::returning(vec![]);
        let records =
            FlashExtractor::extract(&provider, &embedder, &history(), &MemoryConfig::default())
                .await
                .unwrap();
        assert!(records.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_returns_no_records() {
        let provider = FakeProvider::new(
            r#"[{"important": true, "topic": "pets", "memory": "Dog is Max"}]"#,
        );
        let embedder = FakeEmbedder::failing();
        let records =
            FlashExtractor::extract(&provider, &embedder, &history(), &MemoryConfig::default())
                .await
                .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_in_batch_dedup_is_greedy_and_ordered() {
        let provider = FakeProvider::new(
            r#"[
                {"important": true, "topic": "a", "memory": "first"},
                {"important": true, "topic": "b", "memory": "near-duplicate of first"},
                {"important": true, "topic": "c", "memory": "unrelated"}
            ]"#,
        );
        // Second vector is nearly parallel to the first; third is orthogonal.
        let embedder = FakeEmbedder::returning(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.99, 0.1, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);
        let records =
            FlashExtractor::extract(&provider, &embedder, &history(), &MemoryConfig::default())
                .await
                .unwrap();
        let texts: Vec<_> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "unrelated"]);
        assert!(records.iter().all(|r| r.is_embedded()));
    }

    #[tokio::test]
    async fn test_records_carry_topics_and_embeddings() {
        let provider = FakeProvider::new(
            r#"[{"important": true, "topic": "pets", "memory": "Dog is Max"}]"#,
        );
        let embedder = FakeEmbedder::returning(vec![vec![0.1, 0.2, 0.3]]);
        let records =
            FlashExtractor::extract(&provider, &embedder, &history(), &MemoryConfig::default())
                .await
                .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].topics, vec!["pets".to_string()]);
        assert_eq!(records[0].embedding, vec![0.1, 0.2, 0.3]);
    }
}
