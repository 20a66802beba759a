//! MemoryService: the per-turn orchestrator.
//!
//! Ties the pipeline together: scheduler -> extractors -> merger -> store,
//! serialized per session, with retrieval available concurrently. Generic
//! over the provider, embedder, and store traits so mnemo-core never
//! depends on mnemo-infra.
//!
//! Failure policy (the subsystem must never abort a conversation): a
//! failed or timed-out extraction is treated as "nothing extracted this
//! turn", a failed save is logged and retried implicitly next cycle, and
//! only missing/closed session context -- a wiring defect upstream --
//! propagates to the caller.

use std::future::Future;
use std::time::Duration;

use mnemo_types::config::MemoryConfig;
use mnemo_types::error::MemoryError;
use mnemo_types::event::InteractionEvent;
use mnemo_types::memory::{MemoryRecord, MemorySnapshot, MANUAL_TOPIC};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::llm::provider::CompletionProvider;
use crate::memory::embedder::Embedder;
use crate::memory::flash::FlashExtractor;
use crate::memory::longterm::LongTermExtractor;
use crate::memory::merger::Merger;
use crate::memory::retriever::Retriever;
use crate::memory::scheduler::UpdateScheduler;
use crate::memory::session::SessionRegistry;
use crate::memory::store::SnapshotStore;
use crate::memory::window::user_turn_count;

/// What one update cycle did, for telemetry and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub ran_flash: bool,
    pub ran_long_term: bool,
    /// Records the flash extractor produced (before merge dedup).
    pub new_flash: usize,
    /// Records the long-term extractor produced (before merge dedup).
    pub new_long_term: usize,
}

/// Orchestrates memory updates and retrieval for all sessions.
pub struct MemoryService<P: CompletionProvider, E: Embedder, S: SnapshotStore> {
    provider: P,
    embedder: E,
    store: S,
    config: MemoryConfig,
    registry: SessionRegistry,
}

impl<P: CompletionProvider, E: Embedder, S: SnapshotStore> MemoryService<P, E, S> {
    pub fn new(provider: P, embedder: E, store: S, config: MemoryConfig) -> Self {
        Self {
            provider,
            embedder,
            store,
            config,
            registry: SessionRegistry::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Register a session before its first update. Idempotent.
    pub fn register_session(&self, session_id: &str) {
        self.registry.register(session_id);
    }

    /// Run one update cycle for a turn.
    ///
    /// `history` is the session's full ordered dialogue history; the turn
    /// counter is derived from it. Cycles for the same session are
    /// serialized on the session's update lock.
    ///
    /// # Errors
    /// `MissingSession` if the session was never registered (or was torn
    /// down), `SessionClosed` if teardown raced this cycle. Extraction and
    /// storage failures do not propagate.
    #[tracing::instrument(name = "memory_update", skip(self, history), fields(session_id = %session_id))]
    pub async fn update(
        &self,
        session_id: &str,
        history: &[InteractionEvent],
    ) -> Result<UpdateOutcome, MemoryError> {
        let handle = self
            .registry
            .get(session_id)
            .ok_or_else(|| MemoryError::MissingSession(session_id.to_string()))?;

        let turn = user_turn_count(history);
        let plan = UpdateScheduler::plan(turn, &self.config);
        if !plan.is_due() {
            debug!(turn, "no extraction due this turn");
            return Ok(UpdateOutcome::default());
        }

        let _guard = handle.update_lock().lock().await;
        if handle.is_cancelled() {
            return Err(MemoryError::SessionClosed(session_id.to_string()));
        }

        let snapshot = self.load_snapshot(session_id).await;
        let cancel = handle.cancellation();
        let timeout = self.config.extraction_timeout_secs;

        let new_flash = if plan.run_flash {
            let fut = FlashExtractor::extract(&self.provider, &self.embedder, history, &self.config);
            match run_extraction(fut, cancel, timeout, "flash").await {
                Some(records) => records,
                None => return Err(MemoryError::SessionClosed(session_id.to_string())),
            }
        } else {
            Vec::new()
        };

        let new_long_term = if plan.run_long_term {
            let fut = LongTermExtractor::extract(
                &self.provider,
                &self.embedder,
                history,
                &snapshot,
                &self.config,
            );
            match run_extraction(fut, cancel, timeout, "long_term").await {
                Some(records) => records,
                None => return Err(MemoryError::SessionClosed(session_id.to_string())),
            }
        } else {
            Vec::new()
        };

        let outcome = UpdateOutcome {
            ran_flash: plan.run_flash,
            ran_long_term: plan.run_long_term,
            new_flash: new_flash.len(),
            new_long_term: new_long_term.len(),
        };

        // Teardown may have happened while an extractor was in flight; a
        // cancelled session must not be written back.
        if handle.is_cancelled() {
            return Err(MemoryError::SessionClosed(session_id.to_string()));
        }

        let merged = Merger::merge(&snapshot, new_flash, new_long_term, &self.config);
        self.save_snapshot(session_id, &merged).await;

        info!(
            turn,
            new_flash = outcome.new_flash,
            new_long_term = outcome.new_long_term,
            flash_total = merged.flash.len(),
            long_term_total = merged.long_term.len(),
            "memory update complete"
        );
        Ok(outcome)
    }

    /// Memories relevant to `query`, for prompt injection.
    ///
    /// Read-only and safe to run concurrently with an in-flight update:
    /// the snapshot is loaded through the store, so the reader sees
    /// strictly pre- or post-update state, never a partial merge.
    #[tracing::instrument(name = "memory_recall", skip(self, query), fields(session_id = %session_id))]
    pub async fn recall(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<Vec<String>, MemoryError> {
        let snapshot = self.load_snapshot(session_id).await;
        Retriever::retrieve(&self.embedder, query, &snapshot, &self.config).await
    }

    /// Store an explicit "remember this" memory.
    ///
    /// Goes through the normal merge path (dedup and capacity apply), so an
    /// already-known fact is a silent no-op. Unlike extraction, the
    /// embedding failure propagates: the user asked for this write.
    #[tracing::instrument(name = "memory_remember", skip(self, text), fields(session_id = %session_id))]
    pub async fn remember(&self, session_id: &str, text: &str) -> Result<(), MemoryError> {
        let handle = self
            .registry
            .get(session_id)
            .ok_or_else(|| MemoryError::MissingSession(session_id.to_string()))?;

        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let mut embeddings = self
            .embedder
            .embed(&[text.to_string()])
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        if embeddings.is_empty() {
            return Err(MemoryError::Embedding("embedding returned no vectors".to_string()));
        }
        let record = MemoryRecord::new(text, vec![MANUAL_TOPIC.to_string()])
            .with_embedding(embeddings.remove(0));

        let _guard = handle.update_lock().lock().await;
        if handle.is_cancelled() {
            return Err(MemoryError::SessionClosed(session_id.to_string()));
        }
        let snapshot = self.load_snapshot(session_id).await;
        let merged = Merger::merge(&snapshot, vec![record], Vec::new(), &self.config);
        self.save_snapshot(session_id, &merged).await;
        Ok(())
    }

    /// Tear a session down: cancel outstanding extraction, drop its
    /// registry entry, and delete its snapshot. Idempotent.
    #[tracing::instrument(name = "memory_forget", skip(self), fields(session_id = %session_id))]
    pub async fn forget(&self, session_id: &str) {
        if let Some(handle) = self.registry.remove(session_id) {
            // A cycle that already passed its cancellation re-check may
            // still be writing. Waiting on the update lock serializes the
            // delete behind that save; the token set by `remove` forbids
            // any save that has not started yet.
            let _guard = handle.update_lock().lock().await;
        }
        if let Err(e) = self.store.delete(session_id).await {
            warn!(error = %e, "snapshot delete failed");
        }
    }

    /// Load with degraded-recall semantics: a failed read logs and yields
    /// an empty snapshot rather than failing the turn.
    async fn load_snapshot(&self, session_id: &str) -> MemorySnapshot {
        match self.store.load_or_create(session_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "snapshot load failed; starting from empty");
                MemorySnapshot::empty()
            }
        }
    }

    /// Best-effort save: failure is logged; the next cycle re-merges from
    /// the last loaded state.
    async fn save_snapshot(&self, session_id: &str, snapshot: &MemorySnapshot) {
        if let Err(e) = self.store.save(session_id, snapshot).await {
            warn!(error = %e, "snapshot save failed; will retry next cycle");
        }
    }
}

/// Bound one extraction call by the session's cancellation token and the
/// configured timeout. `None` means the session was torn down mid-flight;
/// failure and timeout both collapse to "nothing extracted".
async fn run_extraction<F>(
    fut: F,
    cancel: &CancellationToken,
    timeout_secs: u64,
    kind: &str,
) -> Option<Vec<MemoryRecord>>
where
    F: Future<Output = Result<Vec<MemoryRecord>, MemoryError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(kind, "extraction cancelled by session teardown");
            None
        }
        result = tokio::time::timeout(Duration::from_secs(timeout_secs), fut) => {
            Some(match result {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    warn!(kind, error = %e, "extraction failed; continuing without records");
                    Vec::new()
                }
                Err(_) => {
                    warn!(kind, timeout_secs, "extraction timed out; continuing without records");
                    Vec::new()
                }
            })
        }
    }
}
