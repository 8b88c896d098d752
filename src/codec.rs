//! Authenticated session encoding
//!
//! Session records are serialized to JSON and sealed with AES-256-GCM.
//! The format is: base64url(nonce || ciphertext || tag), without padding.
//! The key is the SHA-256 digest of the secret, and the 96-bit nonce is
//! random per encode, so only the secret is needed to decode.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

use crate::error::{SessionError, SessionResult};
use crate::session::SessionData;

const NONCE_LEN: usize = 12;

/// Encrypts and decrypts session records with one or more secrets.
///
/// The first secret seals new records. Every secret is tried when opening,
/// which lets a deployment rotate secrets without dropping live sessions.
#[derive(Clone)]
pub struct Codec {
    ciphers: Vec<Aes256Gcm>,
}

impl Codec {
    /// Build a codec from a list of secrets, primary first.
    ///
    /// Fails with [`SessionError::NotConfigured`] if there is no secret or
    /// the primary one is empty.
    pub fn new<S: AsRef<str>>(secrets: &[S]) -> SessionResult<Self> {
        match secrets.first() {
            Some(primary) if !primary.as_ref().is_empty() => {}
            _ => return Err(SessionError::NotConfigured),
        }

        let ciphers = secrets
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty())
            .map(cipher_for)
            .collect();

        Ok(Self { ciphers })
    }

    /// Serialize and encrypt a session record.
    pub fn encode(&self, data: &SessionData) -> SessionResult<String> {
        let plaintext = serde_json::to_vec(data)?;
        let cipher = &self.ciphers[0];

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| SessionError::Serialization(format!("encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    /// Decrypt and deserialize a session record.
    ///
    /// Any integrity failure is an error, never an empty record.
    pub fn decode(&self, encoded: &str) -> SessionResult<SessionData> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| SessionError::Decode(e.to_string()))?;

        if raw.len() <= NONCE_LEN {
            return Err(SessionError::Decode("ciphertext too short".to_string()));
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);

        let plaintext = self
            .ciphers
            .iter()
            .find_map(|cipher| cipher.decrypt(nonce, sealed).ok())
            .ok_or_else(|| SessionError::Decode("authentication failed".to_string()))?;

        serde_json::from_slice(&plaintext).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("secrets", &self.ciphers.len())
            .finish()
    }
}

fn cipher_for(secret: &str) -> Aes256Gcm {
    let digest = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(digest.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionData {
        let mut data = SessionData::default();
        data.set("user", "alice");
        data.set("views", 3);
        data.set("flash", serde_json::json!({"type": "danger", "message": "nope"}));
        data
    }

    #[test]
    fn test_encode_and_decode() {
        let codec = Codec::new(&["keyboard cat"]).unwrap();
        let data = sample();

        let encoded = codec.encode(&data).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_empty_record() {
        let codec = Codec::new(&["keyboard cat"]).unwrap();
        let encoded = codec.encode(&SessionData::default()).unwrap();
        assert!(codec.decode(&encoded).unwrap().is_empty());
    }

    #[test]
    fn test_nonce_makes_output_differ() {
        let codec = Codec::new(&["keyboard cat"]).unwrap();
        let data = sample();
        assert_ne!(codec.encode(&data).unwrap(), codec.encode(&data).unwrap());
    }

    #[test]
    fn test_wrong_secret() {
        let encoded = Codec::new(&["k1"]).unwrap().encode(&sample()).unwrap();
        let result = Codec::new(&["k2"]).unwrap().decode(&encoded);
        assert!(matches!(result, Err(SessionError::Decode(_))));
    }

    #[test]
    fn test_tampering_is_detected() {
        let codec = Codec::new(&["keyboard cat"]).unwrap();
        let encoded = codec.encode(&sample()).unwrap();
        let raw = URL_SAFE_NO_PAD.decode(&encoded).unwrap();

        for i in 0..raw.len() {
            let mut flipped = raw.clone();
            flipped[i] ^= 0x01;
            let tampered = URL_SAFE_NO_PAD.encode(&flipped);
            assert!(codec.decode(&tampered).is_err(), "byte {} flip went unnoticed", i);
        }
    }

    #[test]
    fn test_malformed_input() {
        let codec = Codec::new(&["keyboard cat"]).unwrap();
        assert!(codec.decode("").is_err());
        assert!(codec.decode("not base64 !!").is_err());
        assert!(codec.decode("AAAA").is_err());
    }

    #[test]
    fn test_missing_secret() {
        let none: [&str; 0] = [];
        assert!(matches!(Codec::new(&none), Err(SessionError::NotConfigured)));
        assert!(matches!(Codec::new(&[""]), Err(SessionError::NotConfigured)));
    }

    #[test]
    fn test_secret_rotation() {
        let old = Codec::new(&["old-secret"]).unwrap();
        let encoded = old.encode(&sample()).unwrap();

        // New primary first, old one kept for decoding
        let rotated = Codec::new(&["new-secret", "old-secret"]).unwrap();
        assert_eq!(rotated.decode(&encoded).unwrap(), sample());

        // Fresh records are sealed with the new primary only
        let fresh = rotated.encode(&sample()).unwrap();
        assert!(old.decode(&fresh).is_err());
    }
}
