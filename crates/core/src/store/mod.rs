//! Asynchronous key/value store with named object stores.
//!
//! Every `put` runs in its own read-write transaction and resolves only after
//! the transaction has committed. Values are JSON text; typed access lives in
//! [`records`].

pub mod records;

pub use records::{ManifestGenerationRecord, ManifestHistory};

use crate::Error;
use crate::cache::StoreDb;
use async_trait::async_trait;
use std::fmt;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// The object stores known to the migration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectStore {
    /// Manifest URL to its generation history.
    ManifestHistory,
    /// Page URL to the manifest URL it belongs to.
    PageAssociation,
}

impl ObjectStore {
    pub fn name(self) -> &'static str {
        match self {
            ObjectStore::ManifestHistory => "manifest-url-to-contents",
            ObjectStore::PageAssociation => "path-to-manifest",
        }
    }
}

impl fmt::Display for ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transactional key/value access to the [`ObjectStore`]s.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, store: ObjectStore, key: &str) -> Result<Option<String>, Error>;

    /// Write `value` under `key`, returning once the transaction has committed.
    async fn put(&self, store: ObjectStore, key: &str, value: String) -> Result<(), Error>;

    /// Every `(key, value)` pair of `store`, in key order.
    async fn entries(&self, store: ObjectStore) -> Result<Vec<(String, String)>, Error>;
}

#[async_trait]
impl PersistentStore for StoreDb {
    async fn get(&self, store: ObjectStore, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let value = conn
                    .query_row(
                        "SELECT value FROM object_entries WHERE store = ?1 AND key = ?2",
                        params![store.name(), key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, store: ObjectStore, key: &str, value: String) -> Result<(), Error> {
        let key = key.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO object_entries (store, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(store, key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![store.name(), key, value, now],
                )?;
                tx.commit()
                    .map_err(|e| Error::StoreTransaction(format!("commit to {store} failed: {e}")))?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn entries(&self, store: ObjectStore) -> Result<Vec<(String, String)>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT key, value FROM object_entries WHERE store = ?1 ORDER BY key")?;
                let rows = stmt.query_map(params![store.name()], |row| Ok((row.get(0)?, row.get(1)?)))?;
                let entries = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
