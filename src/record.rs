//! Storage record for a session
//!
//! A record packs the serialized session values together with an absolute
//! expiration timestamp. The format is internal to this store and only needs
//! to stay readable across restarts of the same version.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// One persisted session, keyed by its identifier in the bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Serialized session values, opaque to the store
    #[serde(with = "serde_bytes_compat")]
    pub values: Vec<u8>,

    /// Unix timestamp in seconds, `0` means the record never expires
    pub expires_at: i64,
}

impl Record {
    /// Build a record expiring `max_age` seconds after `now`.
    /// A non-positive `max_age` produces a record without expiration.
    pub fn new(values: Vec<u8>, max_age: i64, now: i64) -> Self {
        let expires_at = if max_age > 0 {
            now.saturating_add(max_age)
        } else {
            0
        };
        Self { values, expires_at }
    }

    /// Whether the record is logically absent at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at > 0 && self.expires_at < now
    }

    /// Encode the record for storage
    pub fn encode(&self) -> Result<Vec<u8>, SessionError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Decode a stored record. Never panics on malformed input.
    pub fn decode(bytes: &[u8]) -> Result<Self, SessionError> {
        rmp_serde::from_slice(bytes).map_err(|e| SessionError::MalformedRecord(e.to_string()))
    }
}

/// Encode the values blob as a MessagePack binary rather than an array of integers
mod serde_bytes_compat {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte buffer")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(v.to_vec())
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(v)
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}
