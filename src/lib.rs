//! # salvo-server-session
//!
//! Encrypted server-side sessions for the Salvo web framework.
//!
//! The cookie only carries an opaque session ID. Session data lives in a
//! pluggable store, sealed with AES-256-GCM under a server secret, and
//! expires after a configurable duration.
//!
//! ## Features
//!
//! - **Authenticated encryption**: tampered or foreign records degrade to an empty session
//! - **Pluggable storage backends**: in-memory, one-file-per-session, or custom stores
//! - **Full session lifecycle**: start, commit, destroy, regenerate, abort, reset
//! - **Rate-limited garbage collection** of expired sessions
//! - **Secret rotation**: old secrets keep decoding while the new one encrypts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salvo::prelude::*;
//! use salvo_server_session::{MemoryStore, SessionConfig, SessionDepotExt, SessionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryStore::new();
//!     let session_config = SessionConfig::new("your-secret-key")
//!         .with_cookie_name("sid")
//!         .with_duration(86400);
//!
//!     let session_handler = SessionHandler::new(store, session_config);
//!
//!     let router = Router::new()
//!         .hoop(session_handler)
//!         .get(index);
//!
//!     let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
//!     Server::new(acceptor).serve(router).await;
//! }
//!
//! #[handler]
//! async fn index(depot: &mut Depot) -> &'static str {
//!     let session = depot.session_mut().unwrap();
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1);
//!     "Hello, World!"
//! }
//! ```
//!
//! Frameworks other than Salvo can drive [`SessionManager`] directly by
//! implementing [`SessionBoundary`].

pub mod boundary;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod id;
pub mod manager;
pub mod session;
pub mod store;

pub use boundary::{SalvoBoundary, SessionBoundary};
pub use codec::Codec;
pub use config::{CookieAttributes, SameSite, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use handler::SessionHandler;
pub use manager::{GcOutcome, SessionManager, SessionStatus};
pub use session::{Session, SessionData};
pub use store::{FileStore, MemoryStore, SessionStore, StoredSession};

/// Extension trait for Depot to easily access session
pub mod depot_ext;
pub use depot_ext::SessionDepotExt;
