//! Snapshot merge: fold new records in, dedup, and enforce capacity.
//!
//! Pure function over snapshots -- inputs are never mutated, the caller
//! gets a fresh `MemorySnapshot`. Each memory kind merges independently:
//! incoming records are checked against the merged-so-far list (existing
//! plus already-accepted incoming), then the list is trimmed to its
//! capacity bound from the front (insertion order is the recency axis, so
//! the oldest records are evicted first).

use mnemo_types::config::MemoryConfig;
use mnemo_types::memory::{MemoryRecord, MemorySnapshot};
use tracing::debug;

use crate::memory::similarity::cosine_similarity;

/// Stateless snapshot merger.
pub struct Merger;

impl Merger {
    /// Merge extractor output into `existing`, returning a new snapshot.
    pub fn merge(
        existing: &MemorySnapshot,
        new_flash: Vec<MemoryRecord>,
        new_long_term: Vec<MemoryRecord>,
        config: &MemoryConfig,
    ) -> MemorySnapshot {
        MemorySnapshot {
            flash: merge_list(
                &existing.flash,
                new_flash,
                config.merge_dedup_threshold,
                config.max_flash_memories,
            ),
            long_term: merge_list(
                &existing.long_term,
                new_long_term,
                config.merge_dedup_threshold,
                config.max_long_term_memories,
            ),
        }
    }
}

fn merge_list(
    existing: &[MemoryRecord],
    incoming: Vec<MemoryRecord>,
    threshold: f32,
    max_len: usize,
) -> Vec<MemoryRecord> {
    let mut merged: Vec<MemoryRecord> = existing.to_vec();

    for record in incoming {
        let duplicate = merged
            .iter()
            .any(|kept| cosine_similarity(&kept.embedding, &record.embedding) >= threshold);
        if duplicate {
            debug!(text = %record.text, "dropped duplicate at merge");
            continue;
        }
        merged.push(record);
    }

    // Keep the LAST max_len entries: oldest-first eviction.
    if merged.len() > max_len {
        merged.drain(..merged.len() - max_len);
    }
    merged
}
