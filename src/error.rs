//! Session error types

use std::fmt;

/// Errors that can occur during session operations
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Invalid or missing configuration at store construction
    Config(String),
    /// Error from the backing database (open, transaction, get/put/delete)
    Store(String),
    /// The backing database has been closed
    StoreClosed,
    /// Stored bytes could not be decoded into a session record
    MalformedRecord(String),
    /// Session values could not be serialized
    Serialization(String),
    /// Inbound cookie failed authentication or decryption
    CookieDecode(String),
    /// Outbound cookie could not be produced
    CookieEncode(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(msg) => write!(f, "Invalid session configuration: {}", msg),
            SessionError::Store(msg) => write!(f, "Session store error: {}", msg),
            SessionError::StoreClosed => write!(f, "Session store is closed"),
            SessionError::MalformedRecord(msg) => write!(f, "Malformed session record: {}", msg),
            SessionError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            SessionError::CookieDecode(msg) => write!(f, "Cookie decode error: {}", msg),
            SessionError::CookieEncode(msg) => write!(f, "Cookie encode error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<redb::Error> for SessionError {
    fn from(err: redb::Error) -> Self {
        SessionError::Store(err.to_string())
    }
}

impl From<redb::DatabaseError> for SessionError {
    fn from(err: redb::DatabaseError) -> Self {
        SessionError::Store(err.to_string())
    }
}

impl From<redb::TransactionError> for SessionError {
    fn from(err: redb::TransactionError) -> Self {
        SessionError::Store(err.to_string())
    }
}

impl From<redb::TableError> for SessionError {
    fn from(err: redb::TableError) -> Self {
        SessionError::Store(err.to_string())
    }
}

impl From<redb::StorageError> for SessionError {
    fn from(err: redb::StorageError) -> Self {
        SessionError::Store(err.to_string())
    }
}

impl From<redb::CommitError> for SessionError {
    fn from(err: redb::CommitError) -> Self {
        SessionError::Store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(err: tokio::task::JoinError) -> Self {
        SessionError::Store(format!("database task failed: {}", err))
    }
}

impl From<rmp_serde::encode::Error> for SessionError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Serialization(err.to_string())
    }
}
