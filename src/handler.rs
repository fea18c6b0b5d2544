//! Session middleware for Salvo

use async_trait::async_trait;
use salvo_core::{Depot, FlowCtrl, Handler, Request, Response};
use std::sync::Arc;

use crate::depot_ext::insert_session;
use crate::store::SessionStore;

/// Middleware that resolves the session before the route runs and saves it
/// afterwards if the route changed it.
///
/// The session is available to handlers through
/// [`SessionDepotExt`](crate::SessionDepotExt).
pub struct SessionHandler<S: SessionStore> {
    store: Arc<S>,
    name: String,
}

impl<S: SessionStore> SessionHandler<S> {
    /// Create a handler for sessions stored under the cookie `name`
    pub fn new<N: Into<String>>(store: Arc<S>, name: N) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// The store sessions are read from and written to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl<S: SessionStore> Clone for SessionHandler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
        }
    }
}

#[async_trait]
impl<S: SessionStore> Handler for SessionHandler<S> {
    async fn handle(&self, req: &mut Request, depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
        let (session, error) = self.store.get_session(req, &self.name).await;
        if let Some(e) = error {
            tracing::warn!(cookie = %self.name, error = %e, "session lookup failed, starting a new session");
        }

        insert_session(depot, &session);

        ctrl.call_next(req, depot, res).await;

        if !session.is_modified() {
            return;
        }

        if let Err(e) = self.store.save(res, &session).await {
            tracing::error!(cookie = %self.name, error = %e, "failed to save session");
        }
    }
}
