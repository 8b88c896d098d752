//! Session middleware for Salvo

use salvo_core::http::StatusCode;
use salvo_core::prelude::*;
use std::sync::Arc;

use crate::boundary::{SalvoBoundary, SessionBoundary};
use crate::config::SessionConfig;
use crate::manager::SessionManager;
use crate::store::SessionStore;

/// Session middleware for Salvo
///
/// Starts a session before the rest of the chain runs and, afterwards,
/// applies whatever the handlers asked for: destroy, commit, regenerate.
/// Each request also gives the manager a chance to run its GC sweep.
pub struct SessionHandler<S: SessionStore> {
    manager: Arc<SessionManager<S>>,
}

impl<S: SessionStore> SessionHandler<S> {
    /// Create a new session handler
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self::from_manager(Arc::new(SessionManager::new(store, config)))
    }

    /// Create a handler around an existing manager
    pub fn from_manager(manager: Arc<SessionManager<S>>) -> Self {
        if let Err(e) = manager.assert_ready() {
            tracing::error!("Session handler created without a secret: {}", e);
        }
        Self { manager }
    }

    /// Apply the session's pending destroy/commit/rotation after the handlers ran
    async fn finish(&self, boundary: &mut SalvoBoundary<'_>) {
        // Aborted sessions are left as last persisted
        let Some(session) = boundary.session() else {
            return;
        };

        if session.should_destroy() {
            if let Err(e) = self.manager.destroy(boundary).await {
                tracing::error!("Failed to destroy session: {}", e);
            }
            return;
        }

        // A cookie naming no stored record counts as uninitialized too
        let should_save = session.is_modified()
            || session.is_stored()
            || self.manager.config().save_uninitialized;

        if should_save {
            if let Err(e) = self.manager.commit(boundary).await {
                tracing::error!("Failed to save session: {}", e);
                return;
            }
        }

        if let Some(delete_old) = session.should_regenerate() {
            match self.manager.regenerate(boundary, delete_old).await {
                Ok(true) => {}
                Ok(false) => tracing::debug!("Session {} could not be regenerated", session.id()),
                Err(e) => tracing::error!("Failed to regenerate session: {}", e),
            }
        }
    }
}

impl<S: SessionStore> Clone for SessionHandler<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
        }
    }
}

#[async_trait]
impl<S: SessionStore> Handler for SessionHandler<S> {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        let started = {
            let mut boundary = SalvoBoundary::new(req, depot, res);
            self.manager.start(&mut boundary).await
        };

        if let Err(e) = started {
            tracing::error!("Failed to start session: {}", e);
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
            ctrl.skip_rest();
            return;
        }

        // Continue with the request
        ctrl.call_next(req, depot, res).await;

        let mut boundary = SalvoBoundary::new(req, depot, res);
        self.finish(&mut boundary).await;

        self.manager.gc().await;
    }
}

#[cfg(test)]
mod tests {
    use salvo::prelude::*;
    use salvo::test::{ResponseExt, TestClient};

    use super::SessionHandler;
    use crate::{MemoryStore, SessionConfig, SessionDepotExt};

    const BASE: &str = "http://127.0.0.1:5801";

    #[handler]
    async fn count(depot: &mut Depot) -> String {
        let session = depot.session_mut().expect("session is started");
        let views = session.get::<i32>("views").unwrap_or(0) + 1;
        session.set("views", views);
        views.to_string()
    }

    #[handler]
    async fn peek(depot: &mut Depot) -> &'static str {
        let session = depot.session_mut().expect("session is started");
        if session.is_empty() {
            "empty"
        } else {
            "full"
        }
    }

    #[handler]
    async fn logout(depot: &mut Depot) -> &'static str {
        depot.session_mut().expect("session is started").destroy();
        "bye"
    }

    #[handler]
    async fn rotate(depot: &mut Depot) -> &'static str {
        depot
            .session_mut()
            .expect("session is started")
            .regenerate(true);
        "rotated"
    }

    fn service(store: MemoryStore, config: SessionConfig) -> Service {
        let router = Router::new()
            .hoop(SessionHandler::new(store, config))
            .get(count)
            .push(Router::with_path("peek").get(peek))
            .push(Router::with_path("logout").get(logout))
            .push(Router::with_path("rotate").get(rotate));
        Service::new(router)
    }

    async fn get(service: &Service, path: &str, sid: Option<&str>) -> String {
        let mut req = TestClient::get(format!("{}{}", BASE, path));
        if let Some(sid) = sid {
            req = req.add_header("cookie", format!("KITSESSID={}", sid), true);
        }
        req.send(service).await.take_string().await.unwrap()
    }

    #[tokio::test]
    async fn test_session_persists_across_requests() {
        let store = MemoryStore::new();
        let service = service(store.clone(), SessionConfig::new("k1"));

        assert_eq!(get(&service, "/", None).await, "1");
        let ids = store.ids();
        assert_eq!(ids.len(), 1);
        let sid = ids[0].clone();

        assert_eq!(get(&service, "/", Some(&sid)).await, "2");
        assert_eq!(get(&service, "/", Some(&sid)).await, "3");
        assert_eq!(store.ids(), vec![sid]);
    }

    #[tokio::test]
    async fn test_untouched_new_session_is_not_saved() {
        let store = MemoryStore::new();
        let lazy = service(store.clone(), SessionConfig::new("k1"));

        assert_eq!(get(&lazy, "/peek", None).await, "empty");
        assert!(store.ids().is_empty());

        let eager = service(
            store.clone(),
            SessionConfig::new("k1").with_save_uninitialized(true),
        );
        assert_eq!(get(&eager, "/peek", None).await, "empty");
        assert_eq!(store.ids().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_cookie_id_is_not_saved() {
        let store = MemoryStore::new();
        let service = service(store.clone(), SessionConfig::new("k1"));

        assert_eq!(get(&service, "/peek", Some("invented-id")).await, "empty");
        assert!(store.ids().is_empty());

        // Writing to it is what makes it a real session
        assert_eq!(get(&service, "/", Some("invented-id")).await, "1");
        assert_eq!(store.ids(), vec!["invented-id".to_string()]);
        assert_eq!(get(&service, "/peek", Some("invented-id")).await, "full");
    }

    #[tokio::test]
    async fn test_logout_destroys_session() {
        let store = MemoryStore::new();
        let service = service(store.clone(), SessionConfig::new("k1"));

        get(&service, "/", None).await;
        let sid = store.ids()[0].clone();

        assert_eq!(get(&service, "/logout", Some(&sid)).await, "bye");
        assert!(store.ids().is_empty());
        assert_eq!(get(&service, "/peek", Some(&sid)).await, "empty");
    }

    #[tokio::test]
    async fn test_rotate_moves_session() {
        let store = MemoryStore::new();
        let service = service(store.clone(), SessionConfig::new("k1"));

        get(&service, "/", None).await;
        let old_id = store.ids()[0].clone();

        assert_eq!(get(&service, "/rotate", Some(&old_id)).await, "rotated");
        let ids = store.ids();
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], old_id);

        assert_eq!(get(&service, "/", Some(&ids[0])).await, "2");
    }

    #[tokio::test]
    async fn test_missing_secret_fails_request() {
        let service = service(MemoryStore::new(), SessionConfig::default());
        let res = TestClient::get(BASE).send(&service).await;
        assert_eq!(res.status_code, Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}
