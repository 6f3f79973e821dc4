//! # tripkit-core
//!
//! Core library for tripkit - offline-first harm-reduction data for
//! psychoactive substances and their combinations.
//!
//! This library provides:
//! - Domain types for substances, interactions and status definitions
//! - A catalog synchronizer reconciling bundled, cached and remote datasets
//! - Symmetric interaction lookup with a closed status taxonomy
//! - Duration parsing and effect timelines
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Each dataset (substances, interactions, definitions) is served from one
//! of three places, in order of preference:
//! - **Fresh:** fetched from the remote source during this process
//! - **Cached:** the last fetched document, persisted in SQLite
//! - **Bootstrapped:** the copy compiled into this crate
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tripkit_core::sync::{CatalogSynchronizer, HttpCatalogSource};
//! use tripkit_core::{Config, InteractionResolver, SqliteCatalogStore};
//!
//! # async fn run() -> tripkit_core::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(SqliteCatalogStore::open(&Config::cache_path())?);
//! let source = Arc::new(HttpCatalogSource::new(&config)?);
//!
//! // Serves cached or bundled data immediately
//! let sync = CatalogSynchronizer::new(store, source);
//! sync.refresh_all().await;
//!
//! let resolver = InteractionResolver::from_synchronizer(&sync);
//! if let Some(entry) = resolver.resolve("MDMA", "alcohol") {
//!     println!("{}: {}", entry.status, resolver.describe(entry.status));
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use catalog::{CatalogData, DefinitionTable, InteractionTable, SubstanceCatalog};
pub use config::Config;
pub use duration::{DurationRange, DurationUnit};
pub use error::{Error, Result};
pub use resolver::{InteractionResolver, NO_DEFINITION};
pub use store::{CatalogStore, SqliteCatalogStore};
pub use sync::{CatalogSynchronizer, RefreshOutcome, Snapshot, SnapshotState, SyncReport};
pub use timeline::Timeline;
pub use types::*;

// Public modules
pub mod bundled;
pub mod catalog;
pub mod config;
pub mod duration;
pub mod error;
pub mod format;
pub mod logging;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod timeline;
pub mod types;
