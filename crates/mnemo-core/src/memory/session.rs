//! Per-session context registry.
//!
//! Each live session owns one handle holding its update lock and
//! cancellation token. Components receive the handle explicitly instead of
//! reaching into shared global state; the registry is the single place
//! sessions are created and destroyed.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Concurrency context for one session.
///
/// The update lock serializes the scheduler -> extract -> merge -> save
/// sequence: a second turn's cycle waits for the first to save, so
/// concurrent merges can never silently lose records. The token cancels
/// in-flight extraction at teardown (and the subsequent save with it).
pub struct SessionHandle {
    update_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            update_lock: Mutex::new(()),
            cancel: CancellationToken::new(),
        }
    }

    /// The lock guarding this session's update cycle.
    pub fn update_lock(&self) -> &Mutex<()> {
        &self.update_lock
    }

    /// Token observed by in-flight extraction.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel any outstanding work for this session.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Registry of live sessions, keyed by session id.
///
/// Sessions across the registry are fully independent; no cross-session
/// coordination happens here or anywhere downstream.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning its handle (existing or fresh).
    pub fn register(&self, session_id: &str) -> Arc<SessionHandle> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(SessionHandle::new()))
            .value()
            .clone()
    }

    /// Handle for a registered session, if any.
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(|h| Arc::clone(h.value()))
    }

    /// Remove a session, cancelling its outstanding work.
    ///
    /// Removing an unknown session is a no-op.
    pub fn remove(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.remove(session_id).map(|(_, h)| h);
        if let Some(handle) = &removed {
            handle.cancel();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let registry = SessionRegistry::new();
        let a = registry.register("s1");
        let b = registry.register("s1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_cancels_handle() {
        let registry = SessionRegistry::new();
        let handle = registry.register("s1");
        assert!(!handle.is_cancelled());
        registry.remove("s1");
        assert!(handle.is_cancelled());
        assert!(registry.get("s1").is_none());
    }

    #[test]
    fn test_remove_unknown_session_is_noop() {
        let registry = SessionRegistry::new();
        assert!(registry.remove("ghost").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.register("s1");
        let b = registry.register("s2");
        registry.remove("s1");
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
    }

    #[tokio::test]
    async fn test_update_lock_serializes() {
        let registry = SessionRegistry::new();
        let handle = registry.register("s1");
        let first = handle.update_lock().lock().await;
        assert!(handle.update_lock().try_lock().is_err());
        drop(first);
        assert!(handle.update_lock().try_lock().is_ok());
    }
}
