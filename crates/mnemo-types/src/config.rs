//! Configuration for the Mnemo memory subsystem.
//!
//! `MemoryConfig` carries every numeric policy knob: extraction intervals,
//! dialogue window sizes, similarity thresholds, and capacity bounds.
//! All fields have sensible defaults and the struct is TOML-loadable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tunable policy surface for scheduling, extraction, retrieval, and merge.
///
/// The two similarity thresholds serve opposite purposes: the retrieval
/// threshold (low, permissive) accepts a match for prompt injection, while
/// the merge threshold (high, strict) rejects a near-duplicate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Run flash extraction every N user turns.
    #[serde(default = "default_flash_interval")]
    pub flash_interval: u32,

    /// Run long-term consolidation every N user turns.
    #[serde(default = "default_long_term_interval")]
    pub long_term_interval: u32,

    /// Flash dialogue window, in turns (one turn ~= two events).
    #[serde(default = "default_flash_window_turns")]
    pub flash_window_turns: usize,

    /// Long-term dialogue window, in events.
    #[serde(default = "default_long_term_window_events")]
    pub long_term_window_events: usize,

    /// Cap on facts recovered by the last-resort pattern parse.
    #[serde(default = "default_max_flash_candidates")]
    pub max_flash_candidates: usize,

    /// In-batch dedup threshold for freshly extracted flash facts.
    #[serde(default = "default_flash_dedup_threshold")]
    pub flash_dedup_threshold: f32,

    /// Merge-time dedup threshold against the existing snapshot.
    #[serde(default = "default_merge_dedup_threshold")]
    pub merge_dedup_threshold: f32,

    /// Capacity bound on flash records per session.
    #[serde(default = "default_max_flash_memories")]
    pub max_flash_memories: usize,

    /// Capacity bound on long-term records per session.
    #[serde(default = "default_max_long_term_memories")]
    pub max_long_term_memories: usize,

    /// Minimum similarity for a record to be injected into the prompt.
    #[serde(default = "default_retrieval_threshold")]
    pub retrieval_threshold: f32,

    /// Maximum number of memories returned per retrieval.
    #[serde(default = "default_max_context_items")]
    pub max_context_items: usize,

    /// Bound on a single completion or embedding call, in seconds.
    #[serde(default = "default_extraction_timeout_secs")]
    pub extraction_timeout_secs: u64,

    /// Snapshot directory; `None` means the platform temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,
}

fn default_flash_interval() -> u32 {
    2
}

fn default_long_term_interval() -> u32 {
    10
}

fn default_flash_window_turns() -> usize {
    10
}

fn default_long_term_window_events() -> usize {
    10
}

fn default_max_flash_candidates() -> usize {
    4
}

fn default_flash_dedup_threshold() -> f32 {
    0.85
}

fn default_merge_dedup_threshold() -> f32 {
    0.9
}

fn default_max_flash_memories() -> usize {
    200
}

fn default_max_long_term_memories() -> usize {
    200
}

fn default_retrieval_threshold() -> f32 {
    0.3
}

fn default_max_context_items() -> usize {
    3
}

fn default_extraction_timeout_secs() -> u64 {
    30
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            flash_interval: default_flash_interval(),
            long_term_interval: default_long_term_interval(),
            flash_window_turns: default_flash_window_turns(),
            long_term_window_events: default_long_term_window_events(),
            max_flash_candidates: default_max_flash_candidates(),
            flash_dedup_threshold: default_flash_dedup_threshold(),
            merge_dedup_threshold: default_merge_dedup_threshold(),
            max_flash_memories: default_max_flash_memories(),
            max_long_term_memories: default_max_long_term_memories(),
            retrieval_threshold: default_retrieval_threshold(),
            max_context_items: default_max_context_items(),
            extraction_timeout_secs: default_extraction_timeout_secs(),
            snapshot_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = MemoryConfig::default();
        assert_eq!(config.flash_interval, 2);
        assert_eq!(config.long_term_interval, 10);
        assert_eq!(config.flash_window_turns, 10);
        assert_eq!(config.long_term_window_events, 10);
        assert_eq!(config.max_flash_candidates, 4);
        assert!((config.flash_dedup_threshold - 0.85).abs() < f32::EPSILON);
        assert!((config.merge_dedup_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.max_flash_memories, 200);
        assert_eq!(config.max_long_term_memories, 200);
        assert!((config.retrieval_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.max_context_items, 3);
        assert_eq!(config.extraction_timeout_secs, 30);
        assert!(config.snapshot_dir.is_none());
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let config: MemoryConfig = toml::from_str("").unwrap();
        assert_eq!(config.flash_interval, 2);
        assert_eq!(config.max_flash_memories, 200);
    }

    #[test]
    fn test_deserialize_partial_toml() {
        let toml_str = r#"
flash_interval = 4
retrieval_threshold = 0.5
snapshot_dir = "/var/lib/mnemo"
"#;
        let config: MemoryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.flash_interval, 4);
        assert!((config.retrieval_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.snapshot_dir, Some(PathBuf::from("/var/lib/mnemo")));
        // Untouched fields keep their defaults
        assert_eq!(config.long_term_interval, 10);
        assert!((config.merge_dedup_threshold - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = MemoryConfig {
            max_context_items: 5,
            ..MemoryConfig::default()
        };
        let toml_str = toml::to_string(&config).unwrap();
        let back: MemoryConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.max_context_items, 5);
        assert_eq!(back.flash_interval, config.flash_interval);
    }
}
