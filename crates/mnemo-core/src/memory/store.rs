//! SnapshotStore trait definition.
//!
//! Durable per-session snapshot persistence. Implementations live in
//! mnemo-infra (e.g., `FsSnapshotStore`). Uses native async fn in traits
//! (RPITIT, Rust 2024 edition).

use mnemo_types::error::StoreError;
use mnemo_types::memory::MemorySnapshot;

/// Repository trait for per-session memory snapshots.
///
/// Persistence is best-effort by design: the service layer logs and absorbs
/// `StoreError` from `save`, so a failed write simply means the next update
/// cycle re-merges from the last loaded state.
pub trait SnapshotStore: Send + Sync {
    /// Load a session's snapshot, or return an empty one.
    ///
    /// Missing backing data is a normal first-access case. Corrupt backing
    /// data must be tolerated (logged, empty snapshot returned), never
    /// surfaced as an error.
    fn load_or_create(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<MemorySnapshot, StoreError>> + Send;

    /// Persist a session's snapshot.
    fn save(
        &self,
        session_id: &str,
        snapshot: &MemorySnapshot,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a session's snapshot. Deleting a non-existent session is a
    /// no-op, not an error.
    fn delete(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
