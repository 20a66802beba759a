//! File-backed snapshot store: one JSON document per session.
//!
//! Lives under a configurable base directory (default: the platform temp
//! dir). Loads tolerate missing and corrupt files -- a session whose
//! snapshot cannot be read starts over with an empty one, logged but never
//! surfaced. Saves go through a temp file and rename so a crashed write
//! never leaves a half-written snapshot behind.

use std::path::{Path, PathBuf};

use mnemo_core::memory::store::SnapshotStore;
use mnemo_types::error::StoreError;
use mnemo_types::memory::MemorySnapshot;
use tracing::{debug, warn};

/// Directory under the platform temp dir used when none is configured.
const DEFAULT_DIR_NAME: &str = "mnemo-memory";

/// Filesystem implementation of [`SnapshotStore`].
///
/// All I/O goes through `tokio::fs`.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    base_dir: PathBuf,
}

impl FsSnapshotStore {
    /// Store snapshots under `base_dir`, or the platform temp dir when
    /// `None`.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self {
            base_dir: base_dir
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DIR_NAME)),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of a session's snapshot file.
    fn snapshot_path(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_session_id(session_id)))
    }
}

/// Map a session id to a filesystem-safe file stem.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, so ids from transport
/// layers (UUIDs, peer addresses, etc.) can never escape the base dir.
fn sanitize_session_id(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl SnapshotStore for FsSnapshotStore {
    async fn load_or_create(&self, session_id: &str) -> Result<MemorySnapshot, StoreError> {
        let path = self.snapshot_path(session_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(session_id, "no snapshot on disk; starting empty");
                return Ok(MemorySnapshot::empty());
            }
            Err(e) => {
                warn!(session_id, error = %e, "snapshot unreadable; starting empty");
                return Ok(MemorySnapshot::empty());
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!(session_id, error = %e, "snapshot corrupt; starting empty");
                Ok(MemorySnapshot::empty())
            }
        }
    }

    async fn save(&self, session_id: &str, snapshot: &MemorySnapshot) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let path = self.snapshot_path(session_id);
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_vec(snapshot)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        tokio::fs::write(&tmp_path, &json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        debug!(session_id, records = snapshot.record_count(), "snapshot saved");
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let path = self.snapshot_path(session_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
