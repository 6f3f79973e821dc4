//! Symmetric interaction lookup
//!
//! The resolver reads from one interaction table and one definition table,
//! typically the snapshots a [`CatalogSynchronizer`] is serving at the time
//! it is built. A resolver never changes under a caller; build a new one to
//! pick up a refresh.

use std::sync::Arc;

use crate::catalog::{DefinitionTable, InteractionTable};
use crate::sync::CatalogSynchronizer;
use crate::types::{InteractionEntry, StatusCode, StatusDefinition};

/// Text shown for a status with no published definition
pub const NO_DEFINITION: &str = "No definition available for this status.";

/// Looks up the documented relationship between two substances.
#[derive(Debug, Clone)]
pub struct InteractionResolver {
    interactions: Arc<InteractionTable>,
    definitions: Arc<DefinitionTable>,
}

impl InteractionResolver {
    pub fn new(interactions: Arc<InteractionTable>, definitions: Arc<DefinitionTable>) -> Self {
        Self {
            interactions,
            definitions,
        }
    }

    /// Resolver over the snapshots currently served by `sync`
    pub fn from_synchronizer(sync: &CatalogSynchronizer) -> Self {
        Self::new(
            Arc::clone(&sync.load::<InteractionTable>().data),
            Arc::clone(&sync.load::<DefinitionTable>().data),
        )
    }

    /// Documented interaction between `a` and `b`, in either order.
    ///
    /// Names are trimmed and compared case-insensitively. `None` means the
    /// pair is undocumented, which says nothing about its safety.
    pub fn resolve(&self, a: &str, b: &str) -> Option<&InteractionEntry> {
        self.interactions.get(a, b)
    }

    /// Published definition for `status`
    pub fn definition_for(&self, status: StatusCode) -> Option<&StatusDefinition> {
        self.definitions.get(status)
    }

    /// Definition text for `status`, or [`NO_DEFINITION`]
    pub fn describe(&self, status: StatusCode) -> &str {
        self.definition_for(status)
            .map(|d| d.definition.as_str())
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(NO_DEFINITION)
    }

    /// Every documented interaction involving `name`, most severe first,
    /// then by partner name.
    pub fn interactions_for(&self, name: &str) -> Vec<&InteractionEntry> {
        let mut entries = self.interactions.entries_for(name);
        entries.sort_by(|x, y| {
            y.status
                .cmp(&x.status)
                .then_with(|| x.partner_of(name).cmp(&y.partner_of(name)))
        });
        entries
    }

    pub fn interactions(&self) -> &InteractionTable {
        &self.interactions
    }

    pub fn definitions(&self) -> &DefinitionTable {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogData;
    use serde_json::json;

    fn resolver() -> InteractionResolver {
        let interactions = InteractionTable::from_document(&json!({
            "mdma": {
                "alcohol": {"status": "Caution", "note": "Dehydration."},
                "lsd": {"status": "Low Risk & Synergy"},
                "tramadol": {"status": "Dangerous"}
            },
            "alcohol": {
                "ghb": {"status": "Dangerous"},
                "lsd": {"status": "Low Risk & Decrease"}
            },
            "dxm": {"mdma": {"status": "Something New"}}
        }))
        .unwrap();
        let definitions = DefinitionTable::from_document(&json!([
            {"status": "Caution", "definition": "Take care.", "emoji": "⚠️", "color": "#FFC107"},
            {"status": "Dangerous", "definition": "Avoid.", "emoji": "☠️", "color": "#F44336"},
            {"status": "Unsafe", "definition": "  ", "emoji": "🛑", "color": "#FF9800"}
        ]))
        .unwrap();
        InteractionResolver::new(Arc::new(interactions), Arc::new(definitions))
    }

    #[test]
    fn test_resolve_is_symmetric() {
        let resolver = resolver();
        let forward = resolver.resolve("mdma", "alcohol").unwrap();
        let backward = resolver.resolve("alcohol", "mdma").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.status, StatusCode::Caution);
    }

    #[test]
    fn test_resolve_normalizes_names() {
        let resolver = resolver();
        assert!(resolver.resolve("  MDMA ", "Alcohol").is_some());
    }

    #[test]
    fn test_undocumented_pair_is_none() {
        let resolver = resolver();
        assert!(resolver.resolve("lsd", "ghb").is_none());
        assert!(resolver.resolve("", "mdma").is_none());
        assert!(resolver.resolve("mdma", "mdma").is_none());
    }

    #[test]
    fn test_unknown_status_is_not_absence() {
        let resolver = resolver();
        let entry = resolver.resolve("mdma", "dxm").unwrap();
        assert_eq!(entry.status, StatusCode::Unknown);
        assert_eq!(entry.raw_status, "Something New");
    }

    #[test]
    fn test_definitions_and_fallback() {
        let resolver = resolver();
        assert_eq!(
            resolver.definition_for(StatusCode::Dangerous).unwrap().emoji,
            "☠️"
        );
        assert_eq!(resolver.describe(StatusCode::Caution), "Take care.");
        assert!(resolver.definition_for(StatusCode::LowRiskSynergy).is_none());
        assert_eq!(resolver.describe(StatusCode::LowRiskSynergy), NO_DEFINITION);
        assert_eq!(resolver.describe(StatusCode::Unsafe), NO_DEFINITION);
        assert_eq!(resolver.describe(StatusCode::Unknown), NO_DEFINITION);
    }

    #[test]
    fn test_interactions_for_sorted_by_severity() {
        let resolver = resolver();
        let partners: Vec<(&str, StatusCode)> = resolver
            .interactions_for("MDMA")
            .into_iter()
            .map(|e| (e.partner_of("mdma").unwrap(), e.status))
            .collect();
        assert_eq!(
            partners,
            vec![
                ("tramadol", StatusCode::Dangerous),
                ("alcohol", StatusCode::Caution),
                ("lsd", StatusCode::LowRiskSynergy),
                ("dxm", StatusCode::Unknown),
            ]
        );
        assert!(resolver.interactions_for("nothing").is_empty());
    }
}
