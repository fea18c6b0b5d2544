//! Access to the request's sessions from Salvo's Depot

use salvo_core::Depot;

use crate::session::Session;

const SESSION_KEY: &str = "salvo.redb.session";

/// Depot key of the session bound to the cookie `name`
pub(crate) fn session_key(name: &str) -> String {
    format!("{}:{}", SESSION_KEY, name)
}

/// Store `session` in the depot. The most recent one also becomes the
/// default returned by [`SessionDepotExt::session`].
pub(crate) fn insert_session(depot: &mut Depot, session: &Session) {
    depot.insert(session_key(session.name()), session.clone());
    depot.insert(SESSION_KEY, session.clone());
}

/// Extension trait for Salvo's Depot to provide easy session access
pub trait SessionDepotExt {
    /// The session installed by the innermost [`SessionHandler`](crate::SessionHandler)
    fn session(&self) -> Option<Session>;

    /// The session bound to the cookie `name`, when several handlers are stacked
    fn session_named(&self, name: &str) -> Option<Session>;
}

impl SessionDepotExt for Depot {
    fn session(&self) -> Option<Session> {
        self.get::<Session>(SESSION_KEY).ok().cloned()
    }

    fn session_named(&self, name: &str) -> Option<Session> {
        self.get::<Session>(&session_key(name)).ok().cloned()
    }
}
