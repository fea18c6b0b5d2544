//! Session store trait

use async_trait::async_trait;
use salvo_core::{Request, Response};

use crate::error::SessionError;
use crate::session::Session;

/// Trait for session stores
///
/// A store resolves the session named by a request cookie and writes it
/// back along with the response cookie.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Look up or create the session for the cookie `name` without
    /// registering it on the request.
    ///
    /// The session is always returned. A cookie that fails verification or
    /// a store failure during lookup leaves it new, and the error is handed
    /// back alongside so the caller can decide whether it matters.
    async fn new_session(&self, req: &mut Request, name: &str) -> (Session, Option<SessionError>);

    /// Like [`new_session`](Self::new_session), but the session is registered
    /// on the request so later lookups for the same name return the same
    /// session without touching the store.
    async fn get_session(&self, req: &mut Request, name: &str) -> (Session, Option<SessionError>);

    /// Persist the session and set its cookie on the response.
    ///
    /// A negative max age deletes the stored session and expires the cookie.
    async fn save(&self, res: &mut Response, session: &Session) -> Result<(), SessionError>;
}
