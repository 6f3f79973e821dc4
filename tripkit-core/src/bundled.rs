//! Compiled-in copies of every dataset
//!
//! Served until the first successful refresh, and whenever the cache is
//! missing or unreadable.

use serde_json::Value;

use crate::catalog::CatalogData;
use crate::types::Dataset;

const DRUGS: &str = include_str!("../data/drugs.json");
const COMBOS: &str = include_str!("../data/combos.json");
const COMBO_DEFINITIONS: &str = include_str!("../data/combo_definitions.json");

/// Raw bundled document text for `dataset`
pub fn document_text(dataset: Dataset) -> &'static str {
    match dataset {
        Dataset::Substances => DRUGS,
        Dataset::Interactions => COMBOS,
        Dataset::Definitions => COMBO_DEFINITIONS,
    }
}

/// Parsed bundled document for `dataset`
pub fn document(dataset: Dataset) -> serde_json::Result<Value> {
    serde_json::from_str(document_text(dataset))
}

/// Decode the bundled copy of `T`.
///
/// A bundled file that fails to decode yields an empty table and an error
/// log; it is a build defect, not a runtime condition callers can act on.
pub fn load<T: CatalogData>() -> T {
    let dataset = T::DATASET;
    let decoded = document(dataset)
        .map_err(|e| e.to_string())
        .and_then(|doc| T::from_document(&doc).map_err(|e| e.to_string()));

    match decoded {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(dataset = %dataset, error = %e, "Bundled dataset is unreadable");
            T::default()
        }
    }
}
