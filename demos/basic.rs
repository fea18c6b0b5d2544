//! Basic example using the redb session store

use std::sync::Arc;

use salvo::prelude::*;
use salvo_redb_session::{Config, KeyPair, RedbStore, SessionDepotExt, SessionHandler};

#[handler]
async fn index(depot: &mut Depot) -> String {
    let session = depot.session().expect("Session not found");

    // Get current view count
    let views: i32 = session.get("views").unwrap_or(0);

    // Increment view count
    if let Err(e) = session.set("views", views + 1) {
        return format!("Failed to update session: {}", e);
    }

    format!(
        "Hello! You have viewed this page {} time(s).\nSession ID: {}",
        views + 1,
        session.id()
    )
}

#[handler]
async fn get_user(depot: &mut Depot) -> String {
    let session = depot.session().expect("Session not found");

    match session.get::<String>("user") {
        Some(user) => format!("Logged in as: {}", user),
        None => "Not logged in".to_string(),
    }
}

#[handler]
async fn set_user(req: &mut Request, depot: &mut Depot) -> String {
    let session = depot.session().expect("Session not found");

    // Get username from query parameter
    let username = req.query::<String>("name").unwrap_or_else(|| "anonymous".to_string());

    match session.set("user", &username) {
        Ok(()) => format!("User set to: {}", username),
        Err(e) => format!("Failed to set user: {}", e),
    }
}

#[handler]
async fn logout(depot: &mut Depot) -> &'static str {
    let session = depot.session().expect("Session not found");

    // Delete the stored session and expire the cookie
    session.destroy();

    "Logged out successfully"
}

#[tokio::main]
async fn main() {
    // Set up logging
    tracing_subscriber::fmt::init();

    let config = Config::new("./demo-sessions.db")
        .with_bucket_name("sessions")
        .with_max_age(3600)
        .with_http_only(true);

    // The first pair signs and encrypts new cookies; the second is only
    // accepted so cookies issued before the rotation stay valid.
    let key_pairs = [
        KeyPair::encrypted("new-hash-key-change-me", *b"0123456789abcdef0123456789abcdef"),
        KeyPair::signed("old-hash-key"),
    ];

    let store = match RedbStore::new(config, &key_pairs) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open session store: {}", e);
            return;
        }
    };

    let router = Router::new()
        .hoop(SessionHandler::new(Arc::clone(&store), "app"))
        .get(index)
        .push(Router::with_path("user").get(get_user))
        .push(Router::with_path("login").get(set_user))
        .push(Router::with_path("logout").get(logout));

    println!("Server running at http://127.0.0.1:5800");
    println!("Try these endpoints:");
    println!("  GET /           - View counter");
    println!("  GET /user       - Get current user");
    println!("  GET /login?name=alice - Set user");
    println!("  GET /logout     - Delete the session");

    let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
    Server::new(acceptor).serve(router).await;

    if let Err(e) = store.close() {
        tracing::error!("Failed to close session store: {}", e);
    }
}
