//! Offline-first dataset synchronization
//!
//! Every dataset is served from a [`Snapshot`] that is always populated:
//!
//! 1. At construction the cached record is decoded (`Cached`); if there is
//!    none, or it no longer decodes, the bundled copy is used (`Bootstrapped`).
//! 2. [`CatalogSynchronizer::refresh`] fetches, decodes and persists a new
//!    document, then publishes it as `Fresh`.
//! 3. Any failure along the way leaves the served snapshot untouched.
//!
//! Refreshes of the same dataset are serialized by a per-dataset gate; a
//! caller that finds a refresh already running waits for it and reports
//! [`RefreshOutcome::Joined`] instead of fetching again. Datasets never wait
//! on each other.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripkit_core::sync::{CatalogSynchronizer, HttpCatalogSource};
//! use tripkit_core::{Config, InteractionTable, SqliteCatalogStore};
//!
//! # async fn run() -> tripkit_core::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(SqliteCatalogStore::open(&Config::cache_path())?);
//! let source = Arc::new(HttpCatalogSource::new(&config)?);
//! let sync = CatalogSynchronizer::new(store, source);
//!
//! let report = sync.refresh_all().await;
//! let combos = sync.load::<InteractionTable>();
//! println!("{} combos ({:?}), {} failures", combos.data.len(), combos.state, report.failures().count());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod source;

pub use client::HttpCatalogSource;
pub use source::CatalogSource;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::bundled;
use crate::catalog::{CatalogData, DefinitionTable, InteractionTable, SubstanceCatalog};
use crate::error::SyncError;
use crate::store::CatalogStore;
use crate::types::Dataset;

/// Default upper bound on one refresh's fetch, retries included
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Where the served data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    /// Compiled-in copy; never synced
    Bootstrapped,
    /// Loaded from the local cache at startup
    Cached,
    /// Fetched from the remote source during this process
    Fresh,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotState::Bootstrapped => "bootstrapped",
            SnapshotState::Cached => "cached",
            SnapshotState::Fresh => "fresh",
        }
    }
}

impl std::fmt::Display for SnapshotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of one dataset currently served to readers.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub dataset: Dataset,
    pub state: SnapshotState,
    /// `None` for bundled data
    pub last_synced_at: Option<DateTime<Utc>>,
    pub data: Arc<T>,
}

/// Result of one successful [`CatalogSynchronizer::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The source reported no connectivity; nothing changed
    Offline,
    /// A fresh snapshot is being served
    Updated {
        /// False when the cache write failed and the data lives only in memory
        persisted: bool,
    },
    /// Another refresh of the same dataset was running; this call waited for
    /// it and did not fetch
    Joined,
}

/// Per-dataset results of [`CatalogSynchronizer::refresh_all`].
#[derive(Debug)]
pub struct SyncReport {
    pub substances: Result<RefreshOutcome, SyncError>,
    pub interactions: Result<RefreshOutcome, SyncError>,
    pub definitions: Result<RefreshOutcome, SyncError>,
}

impl SyncReport {
    /// Results in refresh order
    pub fn iter(&self) -> impl Iterator<Item = (Dataset, &Result<RefreshOutcome, SyncError>)> {
        [
            (Dataset::Substances, &self.substances),
            (Dataset::Interactions, &self.interactions),
            (Dataset::Definitions, &self.definitions),
        ]
        .into_iter()
    }

    /// Datasets whose refresh failed
    pub fn failures(&self) -> impl Iterator<Item = (Dataset, &SyncError)> {
        self.iter()
            .filter_map(|(dataset, result)| result.as_ref().err().map(|e| (dataset, e)))
    }

    /// True when every dataset skipped its fetch for lack of connectivity
    pub fn is_offline(&self) -> bool {
        self.iter()
            .all(|(_, result)| matches!(result, Ok(RefreshOutcome::Offline)))
    }

    pub fn all_ok(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// One line of [`CatalogSynchronizer::summary`].
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub dataset: Dataset,
    pub state: SnapshotState,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub records: usize,
}

/// Publication point and refresh gate for one dataset.
pub struct Slot<T> {
    tx: watch::Sender<Arc<Snapshot<T>>>,
    gate: Mutex<()>,
}

impl<T> Slot<T> {
    fn new(initial: Snapshot<T>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            tx,
            gate: Mutex::new(()),
        }
    }

    fn current(&self) -> Arc<Snapshot<T>> {
        self.tx.borrow().clone()
    }
}

/// All dataset slots, addressed through [`CatalogData::slot`].
pub struct Slots {
    pub(crate) substances: Slot<SubstanceCatalog>,
    pub(crate) interactions: Slot<InteractionTable>,
    pub(crate) definitions: Slot<DefinitionTable>,
}

/// Reconciles bundled, cached and remote copies of every dataset.
pub struct CatalogSynchronizer {
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn CatalogSource>,
    slots: Slots,
    fetch_timeout: Duration,
}

impl CatalogSynchronizer {
    /// Bootstrap every dataset from the cache, falling back to bundled data.
    ///
    /// Never touches the network.
    pub fn new(store: Arc<dyn CatalogStore>, source: Arc<dyn CatalogSource>) -> Self {
        let slots = Slots {
            substances: Slot::new(bootstrap(store.as_ref())),
            interactions: Slot::new(bootstrap(store.as_ref())),
            definitions: Slot::new(bootstrap(store.as_ref())),
        };

        Self {
            store,
            source,
            slots,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Bound each refresh's fetch (retries included) by `timeout`
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// The snapshot currently served for `T`. Never blocks on the network.
    pub fn load<T: CatalogData>(&self) -> Arc<Snapshot<T>> {
        T::slot(&self.slots).current()
    }

    /// Observe snapshot replacements for `T`.
    pub fn subscribe<T: CatalogData>(&self) -> watch::Receiver<Arc<Snapshot<T>>> {
        T::slot(&self.slots).tx.subscribe()
    }

    /// Fetch, decode, persist and publish a fresh copy of `T`.
    ///
    /// On `Err` the previous snapshot is still served. Dropping the returned
    /// future before it completes writes nothing.
    ///
    /// The cache write is a synchronous [`CatalogStore::put`] on the calling
    /// task. With [`SqliteCatalogStore`](crate::SqliteCatalogStore) that can
    /// block the worker thread for up to the store's busy timeout (5s) when
    /// another process holds the database. Callers on a latency-sensitive
    /// runtime should drive refreshes from a dedicated task or runtime.
    pub async fn refresh<T: CatalogData>(&self) -> Result<RefreshOutcome, SyncError> {
        let dataset = T::DATASET;
        let slot = T::slot(&self.slots);

        let _gate = match slot.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(dataset = %dataset, "Refresh already running, waiting for it");
                let _joined = slot.gate.lock().await;
                return Ok(RefreshOutcome::Joined);
            }
        };

        if !self.source.is_online().await {
            tracing::info!(dataset = %dataset, "Offline, serving {} data", slot.current().state);
            return Ok(RefreshOutcome::Offline);
        }

        let doc = tokio::time::timeout(self.fetch_timeout, self.source.fetch(dataset))
            .await
            .map_err(|_| SyncError::Timeout {
                dataset: dataset.key(),
                secs: self.fetch_timeout.as_secs(),
            })?
            .map_err(|e| {
                tracing::warn!(dataset = %dataset, error = %e, "Refresh failed");
                e
            })?;

        let data = T::from_document(&doc).map_err(|e| {
            tracing::warn!(dataset = %dataset, error = %e, "Fetched document did not decode");
            SyncError::from(e)
        })?;

        // Nothing below awaits: persist and publish happen together or not at all.
        // The put blocks this worker for at most the SQLite busy timeout.
        let synced_at = Utc::now();
        let persisted = match self.store.put(dataset, &doc, synced_at) {
            Ok(outcome) => {
                tracing::debug!(dataset = %dataset, ?outcome, "Persisted refreshed dataset");
                true
            }
            Err(e) => {
                tracing::warn!(dataset = %dataset, error = %e, "Failed to cache dataset, serving from memory");
                false
            }
        };

        tracing::info!(
            dataset = %dataset,
            records = data.record_count(),
            persisted,
            "Dataset refreshed"
        );

        slot.tx.send_replace(Arc::new(Snapshot {
            dataset,
            state: SnapshotState::Fresh,
            last_synced_at: Some(synced_at),
            data: Arc::new(data),
        }));

        Ok(RefreshOutcome::Updated { persisted })
    }

    /// Refresh every dataset concurrently, reporting each independently.
    pub async fn refresh_all(&self) -> SyncReport {
        let (substances, interactions, definitions) = tokio::join!(
            self.refresh::<SubstanceCatalog>(),
            self.refresh::<InteractionTable>(),
            self.refresh::<DefinitionTable>(),
        );

        SyncReport {
            substances,
            interactions,
            definitions,
        }
    }

    /// State, provenance and size of every dataset
    pub fn summary(&self) -> Vec<DatasetSummary> {
        vec![
            summarize(&self.load::<SubstanceCatalog>()),
            summarize(&self.load::<InteractionTable>()),
            summarize(&self.load::<DefinitionTable>()),
        ]
    }
}

fn summarize<T: CatalogData>(snapshot: &Snapshot<T>) -> DatasetSummary {
    DatasetSummary {
        dataset: snapshot.dataset,
        state: snapshot.state,
        last_synced_at: snapshot.last_synced_at,
        records: snapshot.data.record_count(),
    }
}

/// Initial snapshot for `T`: cached record if it decodes, else bundled.
fn bootstrap<T: CatalogData>(store: &dyn CatalogStore) -> Snapshot<T> {
    let dataset = T::DATASET;

    match store.get(dataset) {
        Ok(Some(record)) => match T::from_document(&record.payload) {
            Ok(data) => {
                tracing::debug!(dataset = %dataset, records = data.record_count(), "Loaded cached dataset");
                return Snapshot {
                    dataset,
                    state: SnapshotState::Cached,
                    last_synced_at: record.last_synced_at,
                    data: Arc::new(data),
                };
            }
            Err(e) => {
                tracing::warn!(dataset = %dataset, error = %e, "Cached dataset no longer decodes, using bundled copy");
            }
        },
        Ok(None) => {
            tracing::debug!(dataset = %dataset, "No cached dataset, using bundled copy");
        }
        Err(e) => {
            tracing::warn!(dataset = %dataset, error = %e, "Cache unreadable, using bundled copy");
        }
    }

    Snapshot {
        dataset,
        state: SnapshotState::Bootstrapped,
        last_synced_at: None,
        data: Arc::new(bundled::load::<T>()),
    }
}
