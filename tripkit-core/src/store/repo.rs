//! Cache repository
//!
//! Provides get/put/clear over the `cache_records` table.

use crate::error::StoreError;
use crate::types::{CacheRecord, Dataset};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persisted key-value cache, one record per dataset.
///
/// Every write replaces the whole record; readers see either the previous
/// record or the new one.
pub trait CatalogStore: Send + Sync {
    /// Cached record for `dataset`, if one was ever written.
    fn get(&self, dataset: Dataset) -> Result<Option<CacheRecord<Value>>, StoreError>;

    /// Replace the record for `dataset`.
    fn put(
        &self,
        dataset: Dataset,
        payload: &Value,
        synced_at: DateTime<Utc>,
    ) -> Result<PutOutcome, StoreError>;

    /// When `dataset` was last confirmed against the remote source.
    fn last_synced_at(&self, dataset: Dataset) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.get(dataset)?.and_then(|record| record.last_synced_at))
    }

    /// Drop the record for `dataset`. Missing records are not an error.
    fn clear(&self, dataset: Dataset) -> Result<(), StoreError>;
}

/// What a [`CatalogStore::put`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// First record for the dataset
    Inserted,
    /// Payload differed from the stored one
    Replaced,
    /// Payload hash matched; only the sync timestamp moved
    Unchanged,
}

/// SQLite-backed cache (single connection)
pub struct SqliteCatalogStore {
    conn: Mutex<Connection>,
}

impl SqliteCatalogStore {
    /// Open or create a cache database at the given path and migrate it
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL so a sync process and a reader can share the file
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        super::schema::run_migrations(&conn)?;

        tracing::debug!(path = %path.display(), "Opened cache database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a migrated in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        super::schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // Transactions roll back on drop; a poisoned connection is still consistent
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stored hash for `dataset`, if any
    pub fn payload_hash(&self, dataset: Dataset) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let hash = conn
            .query_row(
                "SELECT payload_hash FROM cache_records WHERE dataset = ?1",
                [dataset.key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(hash)
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get(&self, dataset: Dataset) -> Result<Option<CacheRecord<Value>>, StoreError> {
        let conn = self.lock();
        let row: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT payload, last_synced_at FROM cache_records WHERE dataset = ?1",
                [dataset.key()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        drop(conn);

        let Some((payload, synced)) = row else {
            return Ok(None);
        };

        let payload: Value = serde_json::from_str(&payload).map_err(|e| StoreError::Corrupt {
            dataset: dataset.key(),
            message: e.to_string(),
        })?;

        let last_synced_at = synced
            .map(|text| parse_synced_at(dataset, &text))
            .transpose()?;

        Ok(Some(CacheRecord {
            dataset,
            payload,
            last_synced_at,
        }))
    }

    fn put(
        &self,
        dataset: Dataset,
        payload: &Value,
        synced_at: DateTime<Utc>,
    ) -> Result<PutOutcome, StoreError> {
        let text = serde_json::to_string(payload).map_err(|source| StoreError::Serialization {
            dataset: dataset.key(),
            source,
        })?;
        let hash = hex::encode(Sha256::digest(text.as_bytes()));

        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT payload_hash FROM cache_records WHERE dataset = ?1",
                [dataset.key()],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match previous {
            None => PutOutcome::Inserted,
            Some(prev) if prev == hash => PutOutcome::Unchanged,
            Some(_) => PutOutcome::Replaced,
        };

        if outcome == PutOutcome::Unchanged {
            tx.execute(
                "UPDATE cache_records SET last_synced_at = ?2, updated_at = ?3 WHERE dataset = ?1",
                params![
                    dataset.key(),
                    synced_at.to_rfc3339(),
                    Utc::now().to_rfc3339()
                ],
            )?;
        } else {
            tx.execute(
                r#"
                INSERT INTO cache_records (dataset, payload, payload_hash, last_synced_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(dataset) DO UPDATE SET
                    payload = excluded.payload,
                    payload_hash = excluded.payload_hash,
                    last_synced_at = excluded.last_synced_at,
                    updated_at = excluded.updated_at
                "#,
                params![
                    dataset.key(),
                    text,
                    hash,
                    synced_at.to_rfc3339(),
                    Utc::now().to_rfc3339()
                ],
            )?;
        }

        tx.commit()?;

        tracing::debug!(dataset = %dataset, ?outcome, bytes = text.len(), "Cached dataset");
        Ok(outcome)
    }

    fn last_synced_at(&self, dataset: Dataset) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.lock();
        let text: Option<Option<String>> = conn
            .query_row(
                "SELECT last_synced_at FROM cache_records WHERE dataset = ?1",
                [dataset.key()],
                |row| row.get(0),
            )
            .optional()?;

        text.flatten()
            .map(|s| parse_synced_at(dataset, &s))
            .transpose()
    }

    fn clear(&self, dataset: Dataset) -> Result<(), StoreError> {
        let conn = self.lock();
        let removed = conn.execute(
            "DELETE FROM cache_records WHERE dataset = ?1",
            [dataset.key()],
        )?;
        tracing::debug!(dataset = %dataset, removed, "Cleared cached dataset");
        Ok(())
    }
}

fn parse_synced_at(dataset: Dataset, text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            dataset: dataset.key(),
            message: format!("bad last_synced_at {:?}: {}", text, e),
        })
}
