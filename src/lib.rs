//! # salvo-redb-session
//!
//! Session store for the Salvo web framework backed by an embedded
//! [redb](https://docs.rs/redb) database.
//!
//! Only the session identifier is sent to the client, inside a cookie that is
//! signed with HMAC-SHA256 and optionally encrypted with AES-GCM. Session
//! values are stored in a single redb table keyed by that identifier.
//!
//! ## Features
//!
//! - **Small cookies**: the cookie carries an authenticated identifier, never the payload
//! - **Key rotation**: several key pairs can be configured, the first signs new cookies
//! - **Lazy expiration**: expired records are removed the next time they are read
//! - **Per-request registry**: repeated lookups within one request return the same session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use salvo::prelude::*;
//! use salvo_redb_session::{Config, KeyPair, RedbStore, SessionDepotExt, SessionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::new("./sessions.db")
//!         .with_bucket_name("sessions")
//!         .with_max_age(3600);
//!     let store = RedbStore::new(config, &[KeyPair::signed("your-secret-key")]).unwrap();
//!
//!     let router = Router::new()
//!         .hoop(SessionHandler::new(Arc::new(store), "app"))
//!         .get(index);
//!
//!     let acceptor = TcpListener::new("127.0.0.1:5800").bind().await;
//!     Server::new(acceptor).serve(router).await;
//! }
//!
//! #[handler]
//! async fn index(depot: &mut Depot) -> &'static str {
//!     let session = depot.session().unwrap();
//!     let views: i32 = session.get("views").unwrap_or(0);
//!     session.set("views", views + 1).unwrap();
//!     "Hello, World!"
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod record;
pub mod securecookie;
pub mod session;
pub mod store;

pub use config::{Config, DbOptions, SameSite, SessionOptions};
pub use error::SessionError;
pub use handler::SessionHandler;
pub use securecookie::KeyPair;
pub use session::{Session, SessionRegistry, SessionValues};
pub use store::{Backend, RedbStore, SessionStore};

/// Extension trait for Depot to easily access session
pub mod depot_ext;
pub use depot_ext::SessionDepotExt;
