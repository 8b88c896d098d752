//! Basic demo: file-backed sessions with a flash message and login flag

use salvo::prelude::*;
use salvo_server_session::{FileStore, SessionConfig, SessionDepotExt, SessionHandler};

#[handler]
async fn index(depot: &mut Depot) -> String {
    let session = depot.session_mut().expect("Session not found");

    // Consume the flash message
    let flash = session.take::<String>("flash");
    let logged_in = session.get::<bool>("logged_in").unwrap_or(false);

    format!(
        "Logged in: {}\nFlash: {}\nSession ID: {}",
        logged_in,
        flash.as_deref().unwrap_or("-"),
        session.id()
    )
}

#[handler]
async fn protected(depot: &mut Depot, res: &mut Response) {
    let session = depot.session_mut().expect("Session not found");

    if session.get::<bool>("logged_in").unwrap_or(false) {
        res.render("Secret area");
        return;
    }

    session.set("flash", "You are not authorized to view this page");
    res.render(Redirect::found("/"));
}

#[handler]
async fn login(depot: &mut Depot) -> &'static str {
    let session = depot.session_mut().expect("Session not found");
    session.set("logged_in", true);

    // New privileges, new ID; drop the old one so it cannot be replayed
    session.regenerate(true);

    "Logged in"
}

#[handler]
async fn logout(depot: &mut Depot) -> &'static str {
    let session = depot.session_mut().expect("Session not found");
    session.destroy();
    "Logged out"
}

#[tokio::main]
async fn main() {
    // Set up logging
    tracing_subscriber::fmt::init();

    let secret = std::env::var("SESSION_SECRET")
        .unwrap_or_else(|_| "your-super-secret-key-change-in-production".to_string());

    // Create file store
    let store = FileStore::new(std::env::temp_dir().join("salvo-sessions"))
        .await
        .expect("Failed to create session directory");

    // Configure session
    let config = SessionConfig::new(secret)
        .with_duration(3600) // 1 hour
        .with_save_uninitialized(false);

    // Create session handler
    let session_handler = SessionHandler::new(store, config);

    // Build router
    let router = Router::new()
        .hoop(session_handler)
        .get(index)
        .push(Router::with_path("protected").get(protected))
        .push(Router::with_path("login").get(login))
        .push(Router::with_path("logout").get(logout));

    // Start server
    let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
    println!("Server running at http://127.0.0.1:5800");
    println!("Try these endpoints:");
    println!("  GET /          - Show login state and flash message");
    println!("  GET /protected - Redirects with a flash message unless logged in");
    println!("  GET /login     - Log in (rotates the session ID)");
    println!("  GET /logout    - Destroy session");

    Server::new(acceptor).serve(router).await;
}
