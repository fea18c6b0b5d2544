//! redb-backed key-value adapter
//!
//! Every operation runs in its own write transaction on a blocking thread.
//! Records live in a single table (the bucket) keyed by session identifier.

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

use crate::error::SessionError;
use crate::record::Record;

/// Outcome of reading a record while enforcing expiration
#[derive(Debug, PartialEq)]
pub(crate) enum Lookup {
    /// A record that has not expired
    Live(Record),
    /// No record under the key
    Missing,
    /// The record had expired and was deleted
    Expired,
}

/// Handle to the session database and its bucket
pub struct Backend {
    db: RwLock<Option<Arc<Database>>>,
    bucket: Arc<str>,
}

impl Backend {
    /// Open or create the database file and make sure the bucket exists
    pub fn open(path: &Path, bucket: &str) -> Result<Self, SessionError> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        {
            txn.open_table(bucket_table(bucket))?;
        }
        txn.commit()?;

        tracing::debug!(path = %path.display(), bucket, "session database opened");

        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
            bucket: Arc::from(bucket),
        })
    }

    /// Name of the bucket this adapter reads and writes
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn handle(&self) -> Result<Arc<Database>, SessionError> {
        self.db.read().clone().ok_or(SessionError::StoreClosed)
    }

    /// Run `op` against the database on the blocking pool
    pub(crate) async fn run<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Database, &str) -> Result<T, SessionError> + Send + 'static,
    {
        let db = self.handle()?;
        let bucket = Arc::clone(&self.bucket);
        tokio::task::spawn_blocking(move || op(&*db, &*bucket)).await?
    }

    /// Point lookup
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionError> {
        let key = key.to_string();
        self.run(move |db, bucket| {
            let txn = db.begin_write()?;
            let value = {
                let table = txn.open_table(bucket_table(bucket))?;
                let value = table.get(key.as_str())?.map(|v| v.value().to_vec());
                value
            };
            txn.commit()?;
            Ok(value)
        })
        .await
    }

    /// Insert or replace the value under `key`
    pub async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), SessionError> {
        let key = key.to_string();
        self.run(move |db, bucket| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(bucket_table(bucket))?;
                table.insert(key.as_str(), value.as_slice())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    /// Remove the value under `key`; succeeds when the key is absent
    pub async fn delete(&self, key: &str) -> Result<(), SessionError> {
        let key = key.to_string();
        self.run(move |db, bucket| {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(bucket_table(bucket))?;
                table.remove(key.as_str())?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }

    /// Read and decode the record under `key`, deleting it if it expired
    /// before `now`. Everything happens in one transaction.
    pub(crate) async fn load_live(&self, key: &str, now: i64) -> Result<Lookup, SessionError> {
        let key = key.to_string();
        self.run(move |db, bucket| {
            let txn = db.begin_write()?;
            let lookup = {
                let mut table = txn.open_table(bucket_table(bucket))?;
                let bytes = table.get(key.as_str())?.map(|v| v.value().to_vec());
                match bytes {
                    None => Lookup::Missing,
                    Some(bytes) => {
                        let record = Record::decode(&bytes)?;
                        if record.is_expired(now) {
                            table.remove(key.as_str())?;
                            tracing::debug!(bucket, expires_at = record.expires_at, "expired session removed");
                            Lookup::Expired
                        } else {
                            Lookup::Live(record)
                        }
                    }
                }
            };
            txn.commit()?;
            Ok(lookup)
        })
        .await
    }

    /// Release the database handle. Later operations fail with `StoreClosed`.
    pub fn close(&self) -> Result<(), SessionError> {
        let db = self.db.write().take().ok_or(SessionError::StoreClosed)?;
        drop(db);
        tracing::debug!(bucket = %self.bucket, "session database closed");
        Ok(())
    }
}

fn bucket_table(bucket: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(bucket)
}
