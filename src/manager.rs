//! Session lifecycle: binding, hydration, commit, rotation and GC

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::boundary::SessionBoundary;
use crate::codec::Codec;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::id::{generate_session_id, is_valid_session_id};
use crate::session::{Session, SessionData};
use crate::store::{now_millis, SessionStore};

/// Whether a session is bound to the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No session has been started, or it was destroyed or aborted
    None,
    /// A session is bound and can be read and written
    Active,
}

/// Result of a [`SessionManager::gc`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcOutcome {
    /// The previous sweep is more recent than the configured interval
    Throttled,
    /// The probability roll decided against sweeping
    Skipped,
    /// A sweep ran and purged this many sessions
    Swept(usize),
}

/// Drives the session lifecycle for one store.
///
/// The store is injected at construction and shared by every request; the
/// manager itself keeps no per-request state.
pub struct SessionManager<S: SessionStore> {
    store: Arc<S>,
    config: SessionConfig,
    codec: Option<Codec>,
    last_gc: Mutex<Option<Instant>>,
}

impl<S: SessionStore> SessionManager<S> {
    /// Create a new session manager
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a session manager over a store that is already shared
    pub fn with_shared_store(store: Arc<S>, config: SessionConfig) -> Self {
        let codec = Codec::new(&config.secrets).ok();
        Self {
            store,
            config,
            codec,
            last_gc: Mutex::new(None),
        }
    }

    /// The session store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the secret
    pub fn set_secret<T: Into<String>>(&mut self, secret: T) {
        self.set_secrets([secret]);
    }

    /// Replace the secret list, primary first
    pub fn set_secrets<I, T>(&mut self, secrets: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.config.secrets = secrets.into_iter().map(Into::into).collect();
        self.codec = Codec::new(&self.config.secrets).ok();
    }

    /// Fail unless a secret is configured
    pub fn assert_ready(&self) -> SessionResult<()> {
        self.codec().map(|_| ())
    }

    fn codec(&self) -> SessionResult<&Codec> {
        self.codec.as_ref().ok_or(SessionError::NotConfigured)
    }

    /// Name of the session cookie
    pub fn name(&self) -> &str {
        &self.config.cookie_name
    }

    /// Current session ID: the bound session's, else a well-formed cookie value
    pub fn id<B: SessionBoundary>(&self, boundary: &B) -> Option<String> {
        match boundary.session() {
            Some(session) => Some(session.id()),
            None => self.cookie_id(boundary),
        }
    }

    fn cookie_id<B: SessionBoundary>(&self, boundary: &B) -> Option<String> {
        boundary
            .get_cookie(&self.config.cookie_name)
            .filter(|sid| is_valid_session_id(sid))
    }

    /// Whether a session is bound to the request
    pub fn status<B: SessionBoundary>(&self, boundary: &B) -> SessionStatus {
        match boundary.session() {
            Some(_) => SessionStatus::Active,
            None => SessionStatus::None,
        }
    }

    fn expires_at(&self) -> i64 {
        let duration_ms =
            i64::try_from(self.config.duration.saturating_mul(1000)).unwrap_or(i64::MAX);
        now_millis().saturating_add(duration_ms)
    }

    /// Load a session's data from the store.
    ///
    /// Missing, expired and undecodable sessions all come back as `None`.
    async fn load(&self, codec: &Codec, sid: &str) -> Option<SessionData> {
        let stored = self.store.read(sid).await?;

        match codec.decode(&stored.data) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!("Discarding undecodable session {}: {}", sid, e);
                None
            }
        }
    }

    /// Start a new session or resume the one named by the request cookie.
    ///
    /// A request without a usable cookie gets a freshly minted ID and a
    /// `Set-Cookie` for it. A cookie naming no readable record keeps its ID
    /// but starts empty and unstored. The session is bound to the boundary
    /// and returned.
    pub async fn start<B: SessionBoundary>(&self, boundary: &mut B) -> SessionResult<Session> {
        let codec = self.codec()?;

        let session = match self.cookie_id(boundary) {
            Some(sid) => match self.load(codec, &sid).await {
                Some(data) => Session::resumed(sid, data),
                None => Session::new(sid, SessionData::default(), false),
            },
            None => {
                let sid = generate_session_id();
                tracing::debug!("Issuing new session {}", sid);
                boundary.set_cookie(
                    &self.config.cookie_name,
                    &sid,
                    &self.config.cookie_attributes(),
                );
                Session::new(sid, SessionData::default(), true)
            }
        };

        boundary.bind_session(session.clone());
        Ok(session)
    }

    /// Persist the bound session with a refreshed expiry.
    ///
    /// Returns `Ok(false)` when no session is bound. The write is an
    /// unconditional overwrite, so concurrent requests on one ID resolve as
    /// last-writer-wins.
    pub async fn commit<B: SessionBoundary>(&self, boundary: &mut B) -> SessionResult<bool> {
        let codec = self.codec()?;
        let Some(session) = boundary.session() else {
            return Ok(false);
        };

        let sid = session.id();
        let encoded = codec.encode(&session.data())?;
        self.store.write(&sid, &encoded, self.expires_at()).await?;
        Ok(true)
    }

    /// Destroy the current session: stored record, cookie and bound state.
    ///
    /// The bound session is dropped even when the store fails; the store
    /// error is returned afterwards.
    pub async fn destroy<B: SessionBoundary>(&self, boundary: &mut B) -> SessionResult<()> {
        let result = match self.id(boundary) {
            Some(sid) => {
                let result = self.store.destroy(&sid).await;
                boundary.delete_cookie(
                    &self.config.cookie_name,
                    &self.config.cookie_attributes(),
                );
                result
            }
            None => Ok(()),
        };

        boundary.unbind_session();
        result
    }

    /// Move the stored session to a new ID.
    ///
    /// Returns `Ok(false)`, changing nothing, when there is no current ID or
    /// nothing stored under it. Otherwise the stored record is copied to a
    /// new ID with a fresh expiry and the cookie is switched over.
    ///
    /// Unless `delete_old` is set, the old ID keeps resolving to the
    /// pre-rotation content until it expires. That keeps in-flight requests
    /// working but leaves a fixated ID usable for that window.
    pub async fn regenerate<B: SessionBoundary>(
        &self,
        boundary: &mut B,
        delete_old: bool,
    ) -> SessionResult<bool> {
        let Some(old_id) = self.id(boundary) else {
            tracing::debug!("No session ID to regenerate");
            return Ok(false);
        };

        let Some(stored) = self.store.read(&old_id).await else {
            tracing::debug!("Session {} has no stored record to regenerate", old_id);
            return Ok(false);
        };

        let new_id = generate_session_id();
        self.store.write(&new_id, &stored.data, self.expires_at()).await?;

        boundary.set_cookie(
            &self.config.cookie_name,
            &new_id,
            &self.config.cookie_attributes(),
        );
        if let Some(session) = boundary.session() {
            session.set_id(new_id.clone());
        }

        if delete_old {
            if let Err(e) = self.store.destroy(&old_id).await {
                tracing::error!("Failed to destroy old session during regeneration: {}", e);
            }
        }

        tracing::debug!("Regenerated session {} -> {}", old_id, new_id);
        Ok(true)
    }

    /// Discard in-request changes and unbind the session without saving
    pub fn abort<B: SessionBoundary>(&self, boundary: &mut B) {
        boundary.unbind_session();
    }

    /// Remove every key from the bound session
    pub fn unset<B: SessionBoundary>(&self, boundary: &mut B) -> bool {
        match boundary.session() {
            Some(session) => {
                session.clear();
                true
            }
            None => false,
        }
    }

    /// Reload the bound session from the store, dropping in-request changes
    pub async fn reset<B: SessionBoundary>(&self, boundary: &mut B) -> SessionResult<bool> {
        let codec = self.codec()?;
        let Some(session) = boundary.session() else {
            return Ok(false);
        };

        let data = self.load(codec, &session.id()).await.unwrap_or_default();
        session.replace_data(data);
        Ok(true)
    }

    /// Purge expired sessions from the store.
    ///
    /// Runs at most once per `gc_interval`, and then only with
    /// `gc_probability`. Store errors are logged, never returned: reads
    /// already hide expired sessions, so a missed sweep only costs space.
    ///
    /// Each listed ID is read again right before it is destroyed, and IDs
    /// that turned live in the meantime are kept. A commit landing between
    /// that read and the destroy can still be lost; stores do not offer a
    /// conditional delete.
    pub async fn gc(&self) -> GcOutcome {
        {
            let mut last = self.last_gc.lock();
            let now = Instant::now();
            if let Some(prev) = *last {
                if now.duration_since(prev) < self.config.gc_interval {
                    return GcOutcome::Throttled;
                }
            }
            *last = Some(now);
        }

        if rand::random::<f64>() >= self.config.gc_probability {
            return GcOutcome::Skipped;
        }

        let expired = match self.store.list_expired(now_millis()).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!("Failed to list expired sessions: {}", e);
                return GcOutcome::Swept(0);
            }
        };

        let mut purged = 0;
        for sid in expired {
            if self.store.read(&sid).await.is_some() {
                tracing::debug!("Session {} was refreshed during GC, keeping it", sid);
                continue;
            }
            match self.store.destroy(&sid).await {
                Ok(()) => purged += 1,
                Err(e) => tracing::warn!("Failed to purge expired session {}: {}", sid, e),
            }
        }

        if purged > 0 {
            tracing::debug!("Session GC purged {} expired sessions", purged);
        }
        GcOutcome::Swept(purged)
    }
}

impl<S: SessionStore> std::fmt::Debug for SessionManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("cookie_name", &self.config.cookie_name)
            .field("duration", &self.config.duration)
            .field("ready", &self.codec.is_some())
            .finish()
    }
}
