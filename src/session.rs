//! Session record and the per-request handle around it

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The key/value bag persisted for one session.
///
/// Keys are kept ordered so that the serialized form is canonical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData {
    data: BTreeMap<String, Value>,
}

impl SessionData {
    /// Get a value from session data
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in session data
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        match serde_json::to_value(value) {
            Ok(v) => {
                self.data.insert(key.to_string(), v);
            }
            Err(e) => tracing::warn!("Dropping unserializable session value {:?}: {}", key, e),
        }
    }

    /// Remove a value from session data
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Clear all session data
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Check if session data is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of keys in the session
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Session handle bound to one request.
///
/// Clones share the same record, so route handlers and the middleware see
/// the same state. Mutations are only persisted when the manager commits.
pub struct Session {
    /// Session ID, replaced on rotation
    id: Arc<RwLock<String>>,

    /// Session data
    data: Arc<RwLock<SessionData>>,

    /// Whether the session has been modified
    modified: Arc<AtomicBool>,

    /// Whether the ID was minted for this request
    is_new: bool,

    /// Whether the data was loaded from a stored record
    stored: bool,

    /// Whether the session should be destroyed
    destroy: Arc<AtomicBool>,

    /// Whether the session should be regenerated
    regenerate: Arc<AtomicBool>,

    /// Whether regeneration should also delete the old record
    delete_old: Arc<AtomicBool>,
}

impl Session {
    /// Create a new session with the given ID and data
    pub fn new(id: String, data: SessionData, is_new: bool) -> Self {
        Self {
            id: Arc::new(RwLock::new(id)),
            data: Arc::new(RwLock::new(data)),
            modified: Arc::new(AtomicBool::new(false)),
            is_new,
            stored: false,
            destroy: Arc::new(AtomicBool::new(false)),
            regenerate: Arc::new(AtomicBool::new(false)),
            delete_old: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Resume a session whose record was found in the store
    pub(crate) fn resumed(id: String, data: SessionData) -> Self {
        Self {
            stored: true,
            ..Self::new(id, data, false)
        }
    }

    /// Get the session ID
    pub fn id(&self) -> String {
        self.id.read().clone()
    }

    pub(crate) fn set_id(&self, id: String) {
        *self.id.write() = id;
    }

    /// Check if the ID was issued during this request
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Check if the data came from a stored record.
    ///
    /// False for fresh IDs and for cookies naming a missing, expired or
    /// undecodable record.
    pub fn is_stored(&self) -> bool {
        self.stored
    }

    /// Check if the session has been modified
    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::SeqCst)
    }

    /// Check if the session should be destroyed
    pub fn should_destroy(&self) -> bool {
        self.destroy.load(Ordering::SeqCst)
    }

    /// Pending rotation request, with its delete-old flag
    pub fn should_regenerate(&self) -> Option<bool> {
        self.regenerate
            .load(Ordering::SeqCst)
            .then(|| self.delete_old.load(Ordering::SeqCst))
    }

    /// Get a value from the session
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.read().get(key)
    }

    /// Set a value in the session
    pub fn set<T: Serialize>(&self, key: &str, value: T) {
        self.data.write().set(key, value);
        self.modified.store(true, Ordering::SeqCst);
    }

    /// Remove a value from the session
    pub fn remove(&self, key: &str) -> Option<Value> {
        let result = self.data.write().remove(key);
        if result.is_some() {
            self.modified.store(true, Ordering::SeqCst);
        }
        result
    }

    /// Read a value and remove it, e.g. a flash message
    pub fn take<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let value = self.remove(key)?;
        serde_json::from_value(value).ok()
    }

    /// Check if a key exists in the session
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains(key)
    }

    /// Clear all session data
    pub fn clear(&self) {
        self.data.write().clear();
        self.modified.store(true, Ordering::SeqCst);
    }

    /// Mark the session for destruction
    pub fn destroy(&self) {
        self.destroy.store(true, Ordering::SeqCst);
    }

    /// Mark the session for regeneration (new ID, same data).
    ///
    /// With `delete_old` unset the previous ID keeps resolving to the
    /// pre-rotation content until it expires.
    pub fn regenerate(&self, delete_old: bool) {
        self.delete_old.store(delete_old, Ordering::SeqCst);
        self.regenerate.store(true, Ordering::SeqCst);
        self.modified.store(true, Ordering::SeqCst);
    }

    /// Get a copy of the session data
    pub fn data(&self) -> SessionData {
        self.data.read().clone()
    }

    pub(crate) fn replace_data(&self, data: SessionData) {
        *self.data.write() = data;
        self.modified.store(false, Ordering::SeqCst);
    }

    /// Check if the session is empty (no user data)
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            id: Arc::clone(&self.id),
            data: Arc::clone(&self.data),
            modified: Arc::clone(&self.modified),
            is_new: self.is_new,
            stored: self.stored,
            destroy: Arc::clone(&self.destroy),
            regenerate: Arc::clone(&self.regenerate),
            delete_old: Arc::clone(&self.delete_old),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &*self.id.read())
            .field("data", &*self.data.read())
            .field("modified", &self.modified.load(Ordering::SeqCst))
            .field("is_new", &self.is_new)
            .field("stored", &self.stored)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let session = Session::new("sid".to_string(), SessionData::default(), true);
        let handle = session.clone();

        handle.set("views", 2);
        assert_eq!(session.get::<i32>("views"), Some(2));
        assert!(session.is_modified());

        handle.set_id("rotated".to_string());
        assert_eq!(session.id(), "rotated");
    }

    #[test]
    fn test_resumed_session_is_stored() {
        let fresh = Session::new("sid".to_string(), SessionData::default(), false);
        assert!(!fresh.is_stored());

        let resumed = Session::resumed("sid".to_string(), SessionData::default());
        assert!(resumed.is_stored());
        assert!(!resumed.is_new());
        assert!(resumed.clone().is_stored());
    }

    #[test]
    fn test_take_consumes_value() {
        let session = Session::new("sid".to_string(), SessionData::default(), false);
        session.set("flash", "hi");

        assert_eq!(session.take::<String>("flash"), Some("hi".to_string()));
        assert!(!session.contains("flash"));
        assert_eq!(session.take::<String>("flash"), None);
    }

    #[test]
    fn test_regenerate_flags() {
        let session = Session::new("sid".to_string(), SessionData::default(), false);
        assert_eq!(session.should_regenerate(), None);

        session.regenerate(true);
        assert_eq!(session.should_regenerate(), Some(true));
        assert!(session.is_modified());
    }

    #[test]
    fn test_serialized_form_is_plain_map() {
        let mut data = SessionData::default();
        data.set("b", 2);
        data.set("a", 1);
        assert_eq!(serde_json::to_string(&data).unwrap(), r#"{"a":1,"b":2}"#);
    }
}
