//! File-backed session store
//!
//! Each session is a JSON document `{"data": ..., "expires": ...}` stored at
//! `<dir>/<session id>.json`. The expiry sits outside the ciphertext so GC can
//! find dead sessions without the secret.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::{now_millis, SessionStore, StoredSession};
use crate::error::{SessionError, SessionResult};
use crate::id::is_valid_session_id;

const EXTENSION: &str = "json";

/// File-backed session store, one file per session.
///
/// Writes land in a temporary file first and are renamed into place, so a
/// reader never observes a half-written session.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub async fn new<P: Into<PathBuf>>(dir: P) -> SessionResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        tracing::debug!("File session store ready at {}", dir.display());
        Ok(Self { dir })
    }

    /// Directory holding the session files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Make the file path for a session ID, refusing anything that is not a
    /// plain identifier
    fn session_path(&self, sid: &str) -> Option<PathBuf> {
        is_valid_session_id(sid).then(|| self.dir.join(format!("{}.{}", sid, EXTENSION)))
    }

    /// Session ID for a directory entry, if it is a session file
    fn session_id_of(path: &Path) -> Option<String> {
        if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
            return None;
        }
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| is_valid_session_id(stem))
            .map(str::to_string)
    }

    /// Load and parse a session file.
    ///
    /// `Ok(None)` means the file does not exist.
    async fn load(path: &Path) -> SessionResult<Option<StoredSession>> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn session_files(&self) -> SessionResult<Vec<(String, PathBuf)>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(sid) = Self::session_id_of(&path) {
                files.push((sid, path));
            }
        }
        Ok(files)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    async fn read(&self, sid: &str) -> Option<StoredSession> {
        let path = self.session_path(sid)?;

        match Self::load(&path).await {
            Ok(Some(stored)) if !stored.is_expired_at(now_millis()) => Some(stored),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn write(&self, sid: &str, data: &str, expires_at: i64) -> SessionResult<()> {
        let path = self
            .session_path(sid)
            .ok_or_else(|| SessionError::InvalidSessionId(sid.to_string()))?;

        let json = serde_json::to_string(&StoredSession::new(data, expires_at))?;

        // The directory may have been removed since construction
        fs::create_dir_all(&self.dir).await?;

        let tmp = self.dir.join(format!(".{}.{}.tmp", sid, Uuid::new_v4().simple()));
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> SessionResult<()> {
        let Some(path) = self.session_path(sid) else {
            return Ok(());
        };

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_expired(&self, now_millis: i64) -> SessionResult<Vec<String>> {
        let mut expired = Vec::new();

        for (sid, path) in self.session_files().await? {
            match Self::load(&path).await {
                Ok(Some(stored)) if stored.is_expired_at(now_millis) => expired.push(sid),
                Ok(_) => {}
                Err(SessionError::Io(e)) => {
                    tracing::warn!("Skipping unreadable session file {}: {}", path.display(), e);
                }
                // Unparseable files can never be read back, so let GC reclaim them
                Err(_) => expired.push(sid),
            }
        }

        Ok(expired)
    }

    async fn clear(&self) -> SessionResult<()> {
        for (sid, _) in self.session_files().await? {
            self.destroy(&sid).await?;
        }
        Ok(())
    }

    async fn length(&self) -> SessionResult<usize> {
        let now = now_millis();
        let mut count = 0;
        for (_, path) in self.session_files().await? {
            if let Ok(Some(stored)) = Self::load(&path).await {
                if !stored.is_expired_at(now) {
                    count += 1;
                }
            }
        }
        Ok(count)
    }
}
