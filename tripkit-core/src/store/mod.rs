//! Persistence layer for tripkit
//!
//! Each dataset is cached as one record: the document exactly as it was
//! fetched, plus the time it was last confirmed against the remote source.
//! This module provides:
//! - The [`CatalogStore`] seam the synchronizer writes through
//! - A SQLite implementation with embedded schema migrations

pub mod repo;
pub mod schema;

pub use repo::{CatalogStore, PutOutcome, SqliteCatalogStore};
