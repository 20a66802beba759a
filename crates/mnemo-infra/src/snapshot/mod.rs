//! Snapshot persistence backends.
//!
//! One implementation today: JSON files, one per session, under a
//! configurable base directory.

pub mod fs;

pub use fs::FsSnapshotStore;
