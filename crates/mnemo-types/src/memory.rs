//! Memory types for Mnemo.
//!
//! These types model the agent's evolving memory of a session: short-horizon
//! "flash" facts extracted from a small recent dialogue window and
//! longer-horizon consolidated conversation summaries. One `MemorySnapshot`
//! exists per session and is the unit of persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Topic tag applied to long-term summary records.
pub const SUMMARY_TOPIC: &str = "conversation_summary";

/// Topic tag applied to explicitly requested ("remember this") records.
pub const MANUAL_TOPIC: &str = "manual";

/// A single extracted memory.
///
/// Records are immutable once created: the merge step replaces lists
/// wholesale and never updates a record in place. The embedding is filled
/// in by the extractor before the record leaves it -- a record with an
/// empty embedding must never reach the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: Uuid,
    /// The remembered text (a fact or a summary).
    pub text: String,
    /// Embedding vector; same dimensionality for every record in a snapshot.
    pub embedding: Vec<f32>,
    /// Topic tags (e.g., "food_preferences", "conversation_summary").
    pub topics: Vec<String>,
    /// Optional importance score from 1 (low) to 5 (critical).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<u8>,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a record with an empty embedding.
    ///
    /// The extractor must attach an embedding (via [`Self::with_embedding`])
    /// before the record is handed to the merger.
    pub fn new(text: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            embedding: Vec::new(),
            topics,
            importance: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an embedding vector, consuming self.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Attach an importance score, consuming self.
    pub fn with_importance(mut self, importance: u8) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Whether this record carries a non-empty embedding.
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}

/// The full memory state for one session.
///
/// Created empty on first access, mutated only by the merge step, persisted
/// by the snapshot store, and deleted when the session is torn down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Short-horizon atomic facts, insertion-ordered (oldest first).
    #[serde(default)]
    pub flash: Vec<MemoryRecord>,
    /// Consolidated conversation summaries, insertion-ordered.
    #[serde(default)]
    pub long_term: Vec<MemoryRecord>,
}

impl MemorySnapshot {
    /// An empty snapshot (the state of a brand-new session).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.flash.is_empty() && self.long_term.is_empty()
    }

    /// Total number of records across both memory kinds.
    pub fn record_count(&self) -> usize {
        self.flash.len() + self.long_term.len()
    }

    /// Iterate over all records that carry an embedding, flash first.
    pub fn embedded_records(&self) -> impl Iterator<Item = &MemoryRecord> {
        self.flash
            .iter()
            .chain(self.long_term.iter())
            .filter(|r| r.is_embedded())
    }

    /// Long-term record texts joined into one block for prompt inclusion.
    pub fn long_term_digest(&self) -> String {
        self.long_term
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_no_embedding() {
        let record = MemoryRecord::new("likes espresso", vec!["preferences".into()]);
        assert!(!record.is_embedded());
        assert!(record.importance.is_none());
    }

    #[test]
    fn test_with_embedding() {
        let record = MemoryRecord::new("likes espresso", vec![]).with_embedding(vec![0.1, 0.2]);
        assert!(record.is_embedded());
        assert_eq!(record.embedding.len(), 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MemorySnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.record_count(), 0);
        assert_eq!(snapshot.embedded_records().count(), 0);
    }

    #[test]
    fn test_embedded_records_skips_unembedded() {
        let snapshot = MemorySnapshot {
            flash: vec![
                MemoryRecord::new("a", vec![]).with_embedding(vec![1.0]),
                MemoryRecord::new("b", vec![]),
            ],
            long_term: vec![MemoryRecord::new("c", vec![]).with_embedding(vec![0.5])],
        };
        let texts: Vec<_> = snapshot.embedded_records().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    #[test]
    fn test_long_term_digest_joins_lines() {
        let snapshot = MemorySnapshot {
            flash: vec![],
            long_term: vec![
                MemoryRecord::new("first summary", vec![SUMMARY_TOPIC.into()]),
                MemoryRecord::new("second summary", vec![SUMMARY_TOPIC.into()]),
            ],
        };
        assert_eq!(snapshot.long_term_digest(), "first summary\nsecond summary");
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let snapshot = MemorySnapshot {
            flash: vec![MemoryRecord::new("fact", vec!["t".into()])
                .with_embedding(vec![0.1, 0.2, 0.3])
                .with_importance(4)],
            long_term: vec![],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: MemorySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.flash.len(), 1);
        assert_eq!(back.flash[0].text, "fact");
        assert_eq!(back.flash[0].embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(back.flash[0].importance, Some(4));
    }

    #[test]
    fn test_snapshot_deserialize_missing_lists() {
        // Older snapshot files may omit one list entirely.
        let snapshot: MemorySnapshot = serde_json::from_str("{}").unwrap();
        assert!(snapshot.is_empty());
    }
}
