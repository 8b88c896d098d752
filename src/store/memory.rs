//! In-memory session store
//!
//! This is primarily for development and testing.
//! Sessions live as long as the process does.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::{now_millis, SessionStore, StoredSession};
use crate::error::SessionResult;

/// In-memory session store
///
/// Clones share the same map, so one store can be handed to several
/// managers or kept around by tests for inspection.
///
/// Warning: sessions are lost on restart and memory grows with the number
/// of live sessions until a GC sweep reclaims expired ones.
pub struct MemoryStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl MemoryStore {
    /// Create a new memory store
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clean up expired sessions
    pub fn cleanup_expired(&self) {
        let now = now_millis();
        self.sessions
            .write()
            .retain(|_, stored| !stored.is_expired_at(now));
    }

    /// Get the IDs of all live sessions
    pub fn ids(&self) -> Vec<String> {
        let now = now_millis();
        self.sessions
            .read()
            .iter()
            .filter(|(_, stored)| !stored.is_expired_at(now))
            .map(|(sid, _)| sid.clone())
            .collect()
    }

    /// Raw access to a stored record, expired or not
    pub fn peek(&self, sid: &str) -> Option<StoredSession> {
        self.sessions.read().get(sid).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn read(&self, sid: &str) -> Option<StoredSession> {
        let sessions = self.sessions.read();
        let stored = sessions.get(sid)?;

        if stored.is_expired_at(now_millis()) {
            return None;
        }
        Some(stored.clone())
    }

    async fn write(&self, sid: &str, data: &str, expires_at: i64) -> SessionResult<()> {
        self.sessions
            .write()
            .insert(sid.to_string(), StoredSession::new(data, expires_at));
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> SessionResult<()> {
        self.sessions.write().remove(sid);
        Ok(())
    }

    async fn list_expired(&self, now_millis: i64) -> SessionResult<Vec<String>> {
        let sessions = self.sessions.read();
        Ok(sessions
            .iter()
            .filter(|(_, stored)| stored.is_expired_at(now_millis))
            .map(|(sid, _)| sid.clone())
            .collect())
    }

    async fn clear(&self) -> SessionResult<()> {
        self.sessions.write().clear();
        Ok(())
    }

    async fn length(&self) -> SessionResult<usize> {
        Ok(self.ids().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let expires = now_millis() + 60_000;

        store.write("session1", "data1", expires).await.unwrap();
        store.write("session2", "data2", expires).await.unwrap();

        assert_eq!(store.read("session1").await.unwrap().data, "data1");
        assert_eq!(store.read("session2").await.unwrap().data, "data2");

        // Overwrite
        store.write("session1", "data1b", expires).await.unwrap();
        assert_eq!(store.read("session1").await.unwrap().data, "data1b");

        store.destroy("session1").await.unwrap();
        assert!(store.read("session1").await.is_none());
        assert_eq!(store.length().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_destroy_missing_is_noop() {
        let store = MemoryStore::new();
        store.destroy("missing").await.unwrap();
        assert!(store.read("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        let now = now_millis();

        store.write("old", "data", now - 1).await.unwrap();
        store.write("live", "data", now + 60_000).await.unwrap();

        // Expired records are hidden on read even though nothing swept them
        assert!(store.read("old").await.is_none());
        assert!(store.peek("old").is_some());

        assert_eq!(store.list_expired(now).await.unwrap(), vec!["old".to_string()]);
        assert_eq!(store.ids(), vec!["live".to_string()]);

        store.cleanup_expired();
        assert!(store.peek("old").is_none());
        assert!(store.peek("live").is_some());
    }

    #[tokio::test]
    async fn test_clones_share_sessions() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.write("sid", "data", now_millis() + 1000).await.unwrap();
        assert!(other.read("sid").await.is_some());

        other.clear().await.unwrap();
        assert!(store.read("sid").await.is_none());
    }
}
