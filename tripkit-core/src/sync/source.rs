//! Remote source seam

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SyncError;
use crate::types::Dataset;

/// Where fresh dataset documents come from.
///
/// Implementations bound each call with their own timeout; the synchronizer
/// never waits on a source indefinitely.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Whether a fetch is worth attempting right now.
    ///
    /// `false` turns a refresh into a no-op instead of an error.
    async fn is_online(&self) -> bool;

    /// Fetch the complete document for `dataset`.
    async fn fetch(&self, dataset: Dataset) -> Result<Value, SyncError>;
}
