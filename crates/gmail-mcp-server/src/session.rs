//! Per-identity session instances.
//!
//! A session is created on first contact with an identity and lives until it
//! is explicitly terminated or reclaimed for being idle. Both transports
//! resolve identities through the same [`SessionStore`], so a token stored over
//! one transport is visible to the other.

use gmail_mcp_core::CredentialCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::info;

/// One long-lived instance per client identity.
pub struct Session {
    id: String,
    credentials: Arc<CredentialCell>,
    /// Serialises tool invocations within the session.
    gate: Mutex<()>,
    last_active: std::sync::Mutex<Instant>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            credentials: Arc::new(CredentialCell::new()),
            gate: Mutex::new(()),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    /// The identity this session belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's credential cell.
    pub fn credentials(&self) -> &Arc<CredentialCell> {
        &self.credentials
    }

    /// Wait for exclusive use of the session for one invocation.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Record activity.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_active.lock() {
            *last = Instant::now();
        }
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("credentials", &self.credentials)
            .finish()
    }
}

/// Resolves identities to their session instance.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh identity and create its session.
    pub async fn create(&self) -> Arc<Session> {
        self.resolve(&uuid::Uuid::new_v4().to_string()).await
    }

    /// Return the session for `id`, creating it on first contact.
    pub async fn resolve(&self, id: &str) -> Arc<Session> {
        if let Some(session) = self.sessions.read().await.get(id) {
            session.touch();
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session_id = %id, "Session created");
                Arc::new(Session::new(id.to_string()))
            })
            .clone();
        session.touch();
        session
    }

    /// Return the session for `id` without creating it.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove the session for `id`. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(session_id = %id, "Session removed");
        }
        removed
    }

    /// Remove sessions idle for at least `max_idle`, except those for which
    /// `keep` returns true. Returns the number removed.
    pub async fn reap_idle<F>(&self, max_idle: Duration, keep: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| keep(id) || session.idle_for() < max_idle);
        let reaped = before - sessions.len();
        if reaped > 0 {
            info!(reaped, remaining = sessions.len(), "Reaped idle sessions");
        }
        reaped
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_creates_once() {
        let store = SessionStore::new();
        let a = store.resolve("alice").await;
        let b = store.resolve("alice").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_credentials() {
        let store = SessionStore::new();
        let alice = store.resolve("alice").await;
        let bob = store.resolve("bob").await;

        alice.credentials().set("alice-token").await;
        assert_eq!(
            alice.credentials().get().await.as_deref(),
            Some("alice-token")
        );
        assert!(bob.credentials().get().await.is_none());
    }

    #[tokio::test]
    async fn test_create_mints_unique_ids() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a.id(), b.id());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_get_and_remove() {
        let store = SessionStore::new();
        assert!(store.get("x").await.is_none());
        store.resolve("x").await;
        assert!(store.get("x").await.is_some());
        assert!(store.remove("x").await);
        assert!(!store.remove("x").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_reap_idle_respects_keep() {
        let store = SessionStore::new();
        store.resolve("streaming").await;
        store.resolve("idle").await;

        let reaped = store
            .reap_idle(Duration::ZERO, |id| id == "streaming")
            .await;
        assert_eq!(reaped, 1);
        assert!(store.get("streaming").await.is_some());
        assert!(store.get("idle").await.is_none());
    }

    #[tokio::test]
    async fn test_reap_idle_keeps_recent_sessions() {
        let store = SessionStore::new();
        store.resolve("fresh").await;
        let reaped = store.reap_idle(Duration::from_secs(3600), |_| false).await;
        assert_eq!(reaped, 0);
    }
}
