//! Session configuration

use std::time::Duration;

/// Default session cookie name
pub const DEFAULT_COOKIE_NAME: &str = "KITSESSID";

/// Default session lifetime: one week
pub const DEFAULT_DURATION_SECS: u64 = 60 * 60 * 24 * 7;

/// Default minimum interval between GC sweeps: one hour
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Configuration for the session manager
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Secret key(s) for encrypting sessions.
    /// The first secret is used for encrypting.
    /// All secrets are tried when decrypting (for secret rotation).
    /// There is no default: the manager is not ready until one is set.
    pub secrets: Vec<String>,

    /// Name of the session cookie (default: "KITSESSID")
    pub cookie_name: String,

    /// Session lifetime in seconds (default: one week).
    /// Used for both the stored expiry and the cookie Max-Age.
    pub duration: u64,

    /// Cookie path (default: "/")
    pub cookie_path: String,

    /// Cookie domain (default: None - current domain only)
    pub cookie_domain: Option<String>,

    /// HttpOnly flag for cookie (default: true)
    pub cookie_http_only: bool,

    /// Secure flag for cookie (default: false)
    pub cookie_secure: bool,

    /// SameSite attribute for cookie (default: None - not sent)
    pub cookie_same_site: Option<SameSite>,

    /// Minimum time between two GC sweeps (default: one hour)
    pub gc_interval: Duration,

    /// Chance that an eligible GC call actually sweeps (default: 1.0)
    pub gc_probability: f64,

    /// Whether to save new sessions nobody wrote to (default: false)
    pub save_uninitialized: bool,
}

/// SameSite cookie attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    /// Strict - cookie only sent for same-site requests
    Strict,
    /// Lax - cookie sent for same-site requests and top-level navigations
    Lax,
    /// None - cookie sent for all requests (requires Secure)
    None,
}

/// Cookie attributes handed to the boundary verbatim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    /// Max-Age in seconds
    pub max_age: u64,
    pub same_site: Option<SameSite>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secrets: Vec::new(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            duration: DEFAULT_DURATION_SECS,
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_http_only: true,
            cookie_secure: false,
            cookie_same_site: None,
            gc_interval: DEFAULT_GC_INTERVAL,
            gc_probability: 1.0,
            save_uninitialized: false,
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with the given secret
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self {
            secrets: vec![secret.into()],
            ..Default::default()
        }
    }

    /// Create a new session configuration with multiple secrets for rotation
    pub fn with_secrets<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            secrets: secrets.into_iter().map(|s| s.into()).collect(),
            ..Default::default()
        }
    }

    /// Set the cookie name (default: "KITSESSID")
    pub fn with_cookie_name<S: Into<String>>(mut self, name: S) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the session lifetime in seconds (default: one week)
    pub fn with_duration(mut self, secs: u64) -> Self {
        self.duration = secs;
        self
    }

    /// Set the cookie path (default: "/")
    pub fn with_cookie_path<S: Into<String>>(mut self, path: S) -> Self {
        self.cookie_path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_cookie_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.cookie_http_only = http_only;
        self
    }

    /// Set the Secure flag (default: false)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Set the SameSite attribute
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.cookie_same_site = Some(same_site);
        self
    }

    /// Set the minimum interval between GC sweeps (default: one hour)
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }

    /// Set the GC probability, clamped to [0, 1]. Zero disables request-driven GC.
    pub fn with_gc_probability(mut self, probability: f64) -> Self {
        self.gc_probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    /// Set whether to save uninitialized sessions (default: false)
    pub fn with_save_uninitialized(mut self, save: bool) -> Self {
        self.save_uninitialized = save;
        self
    }

    /// Cookie attributes for the session cookie
    pub fn cookie_attributes(&self) -> CookieAttributes {
        CookieAttributes {
            path: self.cookie_path.clone(),
            domain: self.cookie_domain.clone(),
            secure: self.cookie_secure,
            http_only: self.cookie_http_only,
            max_age: self.duration,
            same_site: self.cookie_same_site,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(config.secrets.is_empty());
        assert_eq!(config.cookie_name, "KITSESSID");
        assert_eq!(config.duration, 604_800);
        assert_eq!(config.gc_interval, Duration::from_secs(3600));
        assert_eq!(config.gc_probability, 1.0);

        let attrs = config.cookie_attributes();
        assert_eq!(attrs.path, "/");
        assert!(attrs.http_only);
        assert!(!attrs.secure);
        assert_eq!(attrs.domain, None);
        assert_eq!(attrs.same_site, None);
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::with_secrets(["new", "old"])
            .with_cookie_name("sid")
            .with_duration(60)
            .with_cookie_domain("example.com")
            .with_secure(true)
            .with_same_site(SameSite::Strict)
            .with_gc_probability(3.0);

        assert_eq!(config.secrets, vec!["new".to_string(), "old".to_string()]);
        assert_eq!(config.gc_probability, 1.0);

        let attrs = config.cookie_attributes();
        assert_eq!(attrs.max_age, 60);
        assert_eq!(attrs.domain.as_deref(), Some("example.com"));
        assert!(attrs.secure);
        assert_eq!(attrs.same_site, Some(SameSite::Strict));
    }
}
