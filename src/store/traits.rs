//! Session store trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{SessionError, SessionResult};

/// Persisted form of a session.
///
/// `data` is the codec output and stays opaque to stores. `expires` is an
/// epoch-milliseconds timestamp and the only expiration signal: a record is
/// dead once `expires <= now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub data: String,
    pub expires: i64,
}

impl StoredSession {
    pub fn new<S: Into<String>>(data: S, expires: i64) -> Self {
        Self {
            data: data.into(),
            expires,
        }
    }

    /// Check expiry against an epoch-milliseconds timestamp
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expires <= now_millis
    }
}

/// Trait for session storage backends
///
/// Stores decide expiry on read themselves, using [`now_millis`](super::now_millis),
/// so a record past its `expires` is never handed out whether or not a
/// sweep has run yet.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Get a session by ID
    ///
    /// Returns None if the session doesn't exist, has expired, or cannot be
    /// read. Read failures are logged, never returned.
    async fn read(&self, sid: &str) -> Option<StoredSession>;

    /// Insert or overwrite a session
    async fn write(&self, sid: &str, data: &str, expires_at: i64) -> SessionResult<()>;

    /// Destroy/delete a session; missing sessions are not an error
    async fn destroy(&self, sid: &str) -> SessionResult<()>;

    /// List IDs of every session with `expires <= now_millis`
    async fn list_expired(&self, now_millis: i64) -> SessionResult<Vec<String>>;

    /// Clear all sessions (optional)
    async fn clear(&self) -> SessionResult<()> {
        Err(SessionError::Store("clear not implemented".to_string()))
    }

    /// Get the count of live sessions (optional)
    async fn length(&self) -> SessionResult<usize> {
        Err(SessionError::Store("length not implemented".to_string()))
    }
}
