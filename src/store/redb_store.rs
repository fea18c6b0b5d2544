//! Session store backed by an embedded redb database
//!
//! Only the session identifier travels in the cookie. Values live in the
//! database under that identifier, each record carrying its own expiration,
//! which is enforced when the record is next read.

use async_trait::async_trait;
use data_encoding::BASE32;
use rand::{rngs::OsRng, RngCore};
use salvo_core::{Request, Response};
use std::sync::Arc;

use super::backend::{Backend, Lookup};
use super::SessionStore;
use crate::config::Config;
use crate::error::SessionError;
use crate::record::Record;
use crate::securecookie::{
    codecs_from_pairs, decode_multi, encode_multi, KeyPair, SecureCookie, DEFAULT_MAX_AGE,
};
use crate::session::{decode_values, encode_values, Session, SessionRegistry};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Session store persisting records in a redb file
pub struct RedbStore {
    codecs: Vec<SecureCookie>,
    config: Config,
    backend: Backend,
    clock: Clock,
}

impl RedbStore {
    /// Open (or create) the database described by `config`.
    ///
    /// `key_pairs` build the cookie codec chain: the first pair signs new
    /// cookies, all pairs are tried when verifying (for key rotation).
    /// Cookie tokens are accepted for the configured max age plus
    /// [`DEFAULT_MAX_AGE`], so an expired record is still reached and removed
    /// by the next lookup.
    pub fn new(mut config: Config, key_pairs: &[KeyPair]) -> Result<Self, SessionError> {
        config.apply_defaults();
        config.validate()?;
        let token_max_age = config
            .session_options
            .max_age
            .max(0)
            .saturating_add(DEFAULT_MAX_AGE);
        let codecs: Vec<SecureCookie> = codecs_from_pairs(key_pairs)?
            .into_iter()
            .map(|codec| codec.with_max_age(token_max_age))
            .collect();
        let backend = Backend::open(&config.db_options.path, &config.db_options.bucket_name)?;

        Ok(Self {
            codecs,
            config,
            backend,
            clock: Arc::new(|| chrono::Utc::now().timestamp()),
        })
    }

    /// Replace the time source, in Unix seconds
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// The configuration with defaults applied
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct access to the backing key-value adapter
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Close the database. Later store operations fail with `StoreClosed`.
    pub fn close(&self) -> Result<(), SessionError> {
        self.backend.close()
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Verify the request cookie and extract the session identifier
    fn session_id_from_cookie(&self, req: &Request, name: &str) -> Option<Result<String, SessionError>> {
        let cookie = req.cookie(name)?;
        let raw = cookie.value();

        // URL decode the value (cookies may be URL encoded)
        let decoded = match urlencoding::decode(raw) {
            Ok(d) => d.into_owned(),
            Err(_) => raw.to_string(),
        };

        Some(decode_multi(name, &decoded, &self.codecs, self.now()))
    }

    /// Load stored values into `session`. Returns whether live data was found.
    async fn load(&self, session: &Session) -> Result<bool, SessionError> {
        match self.backend.load_live(&session.id(), self.now()).await {
            Ok(Lookup::Live(record)) => match decode_values(&record.values) {
                Ok(values) => {
                    session.install(values);
                    Ok(true)
                }
                Err(_) => Ok(false),
            },
            Ok(Lookup::Missing) | Ok(Lookup::Expired) => Ok(false),
            Err(SessionError::MalformedRecord(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Write the session's values under its identifier
    async fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let values = encode_values(&session.values())?;
        let record = Record::new(values, session.options().max_age, self.now()).encode()?;
        self.backend.put(&session.id(), record).await
    }
}

/// Generate a new session identifier: 32 random bytes in unpadded base32
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    BASE32.encode(&bytes).trim_end_matches('=').to_string()
}

#[async_trait]
impl SessionStore for RedbStore {
    async fn new_session(&self, req: &mut Request, name: &str) -> (Session, Option<SessionError>) {
        let session = Session::new(name, self.config.session_options.clone());

        let id = match self.session_id_from_cookie(req, name) {
            None => return (session, None),
            Some(Err(e)) => return (session, Some(e)),
            Some(Ok(id)) => id,
        };
        session.set_id(id);

        match self.load(&session).await {
            Ok(_) => (session, None),
            Err(e) => (session, Some(e)),
        }
    }

    async fn get_session(&self, req: &mut Request, name: &str) -> (Session, Option<SessionError>) {
        if let Some(found) = req
            .extensions()
            .get::<SessionRegistry>()
            .and_then(|registry| registry.get(name))
        {
            return found;
        }

        let (session, error) = self.new_session(req, name).await;

        match req.extensions_mut().get_mut::<SessionRegistry>() {
            Some(registry) => registry.insert(session.clone(), error.clone()),
            None => {
                let mut registry = SessionRegistry::default();
                registry.insert(session.clone(), error.clone());
                req.extensions_mut().insert(registry);
            }
        }

        (session, error)
    }

    async fn save(&self, res: &mut Response, session: &Session) -> Result<(), SessionError> {
        let options = session.options();

        if options.max_age < 0 {
            let id = session.id();
            if !id.is_empty() {
                self.backend.delete(&id).await?;
            }
            res.add_cookie(options.build_cookie(session.name(), String::new()));
            session.mark_saved();
            return Ok(());
        }

        if session.id().is_empty() {
            session.set_id(generate_session_id());
        }

        // The record must be stored before the client is handed the cookie.
        self.persist(session).await?;

        let encoded = encode_multi(session.name(), &session.id(), &self.codecs, self.now())?;
        res.add_cookie(options.build_cookie(session.name(), encoded));
        session.mark_saved();
        Ok(())
    }
}
