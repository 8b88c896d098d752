//! Request/response boundary used by the session manager
//!
//! The manager never touches HTTP types directly. It reads and writes the
//! session cookie and stashes the active [`Session`] through this trait.

use salvo_core::http::cookie::{self, Cookie, CookieJar};
use salvo_core::{Depot, Request, Response};

use crate::config::{CookieAttributes, SameSite};
use crate::session::Session;

/// Depot key under which the active session is stored
pub(crate) const SESSION_KEY: &str = "salvo.server.session";

/// Cookie access and a per-request session slot
pub trait SessionBoundary: Send {
    /// Cookie value sent by the client
    fn get_cookie(&self, name: &str) -> Option<String>;

    /// Set a cookie on the response
    fn set_cookie(&mut self, name: &str, value: &str, attributes: &CookieAttributes);

    /// Instruct the client to drop a cookie
    fn delete_cookie(&mut self, name: &str, attributes: &CookieAttributes);

    /// Session bound to the current request
    fn session(&self) -> Option<Session>;

    /// Bind a session to the current request, replacing any previous one
    fn bind_session(&mut self, session: Session);

    /// Drop the session bound to the current request
    fn unbind_session(&mut self);
}

/// Salvo implementation of [`SessionBoundary`].
///
/// Incoming cookies are snapshotted at construction so the boundary does not
/// borrow the request across the manager's await points.
pub struct SalvoBoundary<'a> {
    incoming: CookieJar,
    depot: &'a mut Depot,
    res: &'a mut Response,
}

impl<'a> SalvoBoundary<'a> {
    pub fn new(req: &Request, depot: &'a mut Depot, res: &'a mut Response) -> Self {
        Self {
            incoming: req.cookies().clone(),
            depot,
            res,
        }
    }
}

impl SessionBoundary for SalvoBoundary<'_> {
    fn get_cookie(&self, name: &str) -> Option<String> {
        let raw = self.incoming.get(name)?.value();
        // Cookies may arrive URL encoded
        match urlencoding::decode(raw) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(_) => Some(raw.to_string()),
        }
    }

    fn set_cookie(&mut self, name: &str, value: &str, attributes: &CookieAttributes) {
        let mut builder = Cookie::build((name.to_string(), value.to_string()))
            .path(attributes.path.clone())
            .http_only(attributes.http_only)
            .secure(attributes.secure)
            .max_age(cookie::time::Duration::seconds(
                i64::try_from(attributes.max_age).unwrap_or(i64::MAX),
            ));

        if let Some(domain) = &attributes.domain {
            builder = builder.domain(domain.clone());
        }

        if let Some(same_site) = attributes.same_site {
            builder = builder.same_site(match same_site {
                SameSite::Strict => cookie::SameSite::Strict,
                SameSite::Lax => cookie::SameSite::Lax,
                SameSite::None => cookie::SameSite::None,
            });
        }

        self.res.add_cookie(builder.build());
    }

    fn delete_cookie(&mut self, name: &str, attributes: &CookieAttributes) {
        let mut builder = Cookie::build((name.to_string(), String::new()))
            .path(attributes.path.clone())
            .max_age(cookie::time::Duration::ZERO);

        if let Some(domain) = &attributes.domain {
            builder = builder.domain(domain.clone());
        }

        self.res.add_cookie(builder.build());
    }

    fn session(&self) -> Option<Session> {
        self.depot.get::<Session>(SESSION_KEY).ok().cloned()
    }

    fn bind_session(&mut self, session: Session) {
        self.depot.insert(SESSION_KEY, session);
    }

    fn unbind_session(&mut self) {
        let _ = self.depot.remove::<Session>(SESSION_KEY);
    }
}
