//! Session handle and per-request registry

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SessionOptions;
use crate::error::SessionError;

/// Application values carried by a session
pub type SessionValues = HashMap<String, Value>;

/// Serialize values into the blob stored inside a record
pub(crate) fn encode_values(values: &SessionValues) -> Result<Vec<u8>, SessionError> {
    Ok(rmp_serde::to_vec_named(values)?)
}

/// Inverse of [`encode_values`]
pub(crate) fn decode_values(bytes: &[u8]) -> Result<SessionValues, SessionError> {
    rmp_serde::from_slice(bytes).map_err(|e| SessionError::MalformedRecord(e.to_string()))
}

#[derive(Debug)]
struct SessionState {
    id: String,
    is_new: bool,
    values: SessionValues,
    options: SessionOptions,
    modified: bool,
}

/// A session for one cookie name.
///
/// Clones share state, so every holder (the request registry, the depot,
/// handlers) sees the same values and the identifier assigned on save.
#[derive(Clone)]
pub struct Session {
    name: Arc<str>,
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    /// Create a new, empty session for the cookie `name`
    pub fn new<S: AsRef<str>>(name: S, options: SessionOptions) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            state: Arc::new(RwLock::new(SessionState {
                id: String::new(),
                is_new: true,
                values: SessionValues::new(),
                options,
                modified: false,
            })),
        }
    }

    /// Cookie name this session is bound to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session identifier, empty until the first save
    pub fn id(&self) -> String {
        self.state.read().id.clone()
    }

    /// Whether no stored data was found for this session
    pub fn is_new(&self) -> bool {
        self.state.read().is_new
    }

    /// Whether values or options were changed since the session was loaded
    pub fn is_modified(&self) -> bool {
        self.state.read().modified
    }

    /// Get a value from the session
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.state
            .read()
            .values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut state = self.state.write();
        state.values.insert(key.to_string(), value);
        state.modified = true;
        Ok(())
    }

    /// Remove a value from the session
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.state.write();
        let removed = state.values.remove(key);
        if removed.is_some() {
            state.modified = true;
        }
        removed
    }

    /// Check if a key exists in the session
    pub fn contains(&self, key: &str) -> bool {
        self.state.read().values.contains_key(key)
    }

    /// Clear all session values
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.values.clear();
        state.modified = true;
    }

    /// Check if the session has no values
    pub fn is_empty(&self) -> bool {
        self.state.read().values.is_empty()
    }

    /// Get a copy of the session values
    pub fn values(&self) -> SessionValues {
        self.state.read().values.clone()
    }

    /// Get a copy of the cookie options
    pub fn options(&self) -> SessionOptions {
        self.state.read().options.clone()
    }

    /// Replace the cookie options used on the next save
    pub fn set_options(&self, options: SessionOptions) {
        let mut state = self.state.write();
        state.options = options;
        state.modified = true;
    }

    /// Change the max age used on the next save. Negative deletes the session.
    pub fn set_max_age(&self, max_age: i64) {
        let mut state = self.state.write();
        state.options.max_age = max_age;
        state.modified = true;
    }

    /// Mark the session for deletion on the next save
    pub fn destroy(&self) {
        self.set_max_age(-1);
    }

    pub(crate) fn set_id(&self, id: String) {
        self.state.write().id = id;
    }

    /// Install values loaded from the store
    pub(crate) fn install(&self, values: SessionValues) {
        let mut state = self.state.write();
        state.values = values;
        state.is_new = false;
    }

    pub(crate) fn mark_saved(&self) {
        self.state.write().modified = false;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("id", &state.id)
            .field("is_new", &state.is_new)
            .field("values", &state.values)
            .field("modified", &state.modified)
            .finish()
    }
}

/// Sessions already looked up during one request, by cookie name.
///
/// Lives in the request's extensions so a repeated lookup for the same
/// name returns the same session (and the same lookup error) without
/// touching the store again.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, (Session, Option<SessionError>)>,
}

impl SessionRegistry {
    /// Look up a registered session
    pub fn get(&self, name: &str) -> Option<(Session, Option<SessionError>)> {
        self.sessions.get(name).cloned()
    }

    /// Register a session and the error its lookup produced
    pub fn insert(&mut self, session: Session, error: Option<SessionError>) {
        self.sessions
            .insert(session.name().to_string(), (session, error));
    }

    /// All registered sessions
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().map(|(session, _)| session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_values() {
        let session = Session::new("app", SessionOptions::default());
        assert!(session.is_new());
        assert!(!session.is_modified());
        assert_eq!(session.id(), "");

        session.set("uid", "42").unwrap();
        session.set("views", 3).unwrap();
        assert!(session.is_modified());
        assert_eq!(session.get::<String>("uid"), Some("42".to_string()));
        assert_eq!(session.get::<i32>("views"), Some(3));
        assert_eq!(session.get::<i32>("uid"), None);

        assert!(session.remove("views").is_some());
        assert!(!session.contains("views"));

        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new("app", SessionOptions::default());
        let other = session.clone();

        other.set("user", "alice").unwrap();
        other.set_id("abc".to_string());

        assert_eq!(session.get::<String>("user"), Some("alice".to_string()));
        assert_eq!(session.id(), "abc");
    }

    #[test]
    fn test_destroy_sets_negative_max_age() {
        let session = Session::new("app", SessionOptions::default());
        session.destroy();
        assert_eq!(session.options().max_age, -1);
        assert!(session.is_modified());
    }

    #[test]
    fn test_values_blob() {
        let mut values = SessionValues::new();
        values.insert("uid".to_string(), Value::from("42"));
        values.insert("roles".to_string(), serde_json::json!(["admin", "ops"]));
        values.insert("profile".to_string(), serde_json::json!({"age": 30, "active": true}));

        let bytes = encode_values(&values).unwrap();
        assert_eq!(decode_values(&bytes).unwrap(), values);

        assert!(matches!(
            decode_values(b"\xc1"),
            Err(SessionError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_registry() {
        let mut registry = SessionRegistry::default();
        assert!(registry.get("app").is_none());

        let session = Session::new("app", SessionOptions::default());
        registry.insert(session.clone(), None);

        let (found, error) = registry.get("app").unwrap();
        found.set("k", 1).unwrap();
        assert_eq!(session.get::<i32>("k"), Some(1));
        assert!(error.is_none());
        assert_eq!(registry.sessions().count(), 1);
    }
}
