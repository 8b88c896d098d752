//! Session identifier generation

use uuid::Uuid;

/// Longest identifier accepted from a client.
const MAX_SESSION_ID_LEN: usize = 128;

/// Generate a new session ID.
///
/// UUID v4 carries 122 random bits and no counter state, so issued IDs say
/// nothing about how many sessions exist.
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Check that a client-supplied identifier is well formed.
///
/// Only ASCII letters, digits, `-` and `_` are accepted. Stores may use the
/// identifier as a file name, so anything else is rejected outright.
pub fn is_valid_session_id(sid: &str) -> bool {
    !sid.is_empty()
        && sid.len() <= MAX_SESSION_ID_LEN
        && sid
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_unique_and_valid() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| is_valid_session_id(id)));
    }

    #[test]
    fn test_rejects_path_like_ids() {
        assert!(!is_valid_session_id(""));
        assert!(!is_valid_session_id("../etc/passwd"));
        assert!(!is_valid_session_id("abc/def"));
        assert!(!is_valid_session_id("abc.json"));
        assert!(!is_valid_session_id(&"a".repeat(129)));
        assert!(is_valid_session_id("session_1-A"));
    }
}
