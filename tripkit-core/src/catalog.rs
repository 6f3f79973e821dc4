//! Dataset documents decoded into queryable tables
//!
//! Each dataset arrives as a JSON document whose shape is owned by the
//! upstream project. The three table types here are the only code that knows
//! those shapes:
//!
//! - [`SubstanceCatalog`]: `{"data": [{"<name>": {..}}]}`, `[{"<name>": {..}}]`,
//!   or `{"<name>": {..}}`
//! - [`InteractionTable`]: `{"<a>": {"<b>": {"status": .., "note": .., "sources": [..]}}}`
//! - [`DefinitionTable`]: `[{"status": .., "definition": .., "emoji": .., "color": ..}]`
//!
//! Individual malformed records are skipped with a warning; only a document
//! whose overall shape is wrong is an error.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{Map, Value};

use crate::error::DocumentError;
use crate::sync::{Slot, Slots};
use crate::types::{
    canonical_name, capitalize, Citation, Dataset, InteractionEntry, StatusCode,
    StatusDefinition, Substance, SubstanceTiming,
};

/// A dataset the synchronizer can serve.
pub trait CatalogData: Default + Send + Sync + Sized + 'static {
    /// Which dataset this type decodes
    const DATASET: Dataset;

    /// Decode a full document.
    fn from_document(doc: &Value) -> Result<Self, DocumentError>;

    /// Number of records, for logging and status output
    fn record_count(&self) -> usize;

    #[doc(hidden)]
    fn slot(slots: &Slots) -> &Slot<Self>;
}

// ============================================
// Substances
// ============================================

/// All substances, sorted by canonical name.
#[derive(Debug, Clone, Default)]
pub struct SubstanceCatalog {
    substances: Vec<Substance>,
    /// canonical name -> index
    by_name: HashMap<String, usize>,
    /// lowercased alias -> index (names take precedence)
    by_alias: HashMap<String, usize>,
}

impl SubstanceCatalog {
    /// Build a catalog from already-decoded substances.
    ///
    /// Duplicate names keep the first occurrence.
    pub fn from_substances(substances: impl IntoIterator<Item = Substance>) -> Self {
        let mut unique: BTreeMap<String, Substance> = BTreeMap::new();
        for substance in substances {
            if unique.contains_key(&substance.name) {
                tracing::warn!(name = %substance.name, "Duplicate substance in catalog, keeping first");
                continue;
            }
            unique.insert(substance.name.clone(), substance);
        }

        let substances: Vec<Substance> = unique.into_values().collect();
        let by_name = substances
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect::<HashMap<_, _>>();

        let mut by_alias = HashMap::new();
        for (i, substance) in substances.iter().enumerate() {
            for alias in &substance.aliases {
                let alias = canonical_name(alias);
                if !by_name.contains_key(&alias) {
                    by_alias.entry(alias).or_insert(i);
                }
            }
        }

        Self {
            substances,
            by_name,
            by_alias,
        }
    }

    pub fn len(&self) -> usize {
        self.substances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Substance> {
        self.substances.iter()
    }

    /// Look up by name or alias, case-insensitively.
    pub fn get(&self, name_or_alias: &str) -> Option<&Substance> {
        let key = canonical_name(name_or_alias);
        self.by_name
            .get(&key)
            .or_else(|| self.by_alias.get(&key))
            .map(|&i| &self.substances[i])
    }

    /// Substances whose name, display name, or an alias contains `query`.
    pub fn search(&self, query: &str) -> Vec<&Substance> {
        self.filter(query, &[])
    }

    /// Search combined with a category filter.
    ///
    /// An empty query matches everything; an empty category list applies no
    /// category filter. Otherwise a substance must be in at least one of
    /// `categories` (case-insensitive).
    pub fn filter(&self, query: &str, categories: &[String]) -> Vec<&Substance> {
        let query = query.trim().to_lowercase();
        let categories: Vec<String> = categories.iter().map(|c| c.to_lowercase()).collect();

        self.substances
            .iter()
            .filter(|s| query.is_empty() || s.matches_query(&query))
            .filter(|s| categories.is_empty() || s.in_any_category(&categories))
            .collect()
    }

    /// Every category in the catalog, lowercased and sorted.
    pub fn categories(&self) -> Vec<String> {
        self.substances
            .iter()
            .flat_map(|s| s.categories.iter().map(|c| c.to_lowercase()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl CatalogData for SubstanceCatalog {
    const DATASET: Dataset = Dataset::Substances;

    fn from_document(doc: &Value) -> Result<Self, DocumentError> {
        let dataset = Self::DATASET.key();

        // The API wraps its payload as {"err": .., "data": [..]}
        let root = match doc.get("data") {
            Some(data) if data.is_array() => data,
            _ => doc,
        };

        let mut substances = Vec::new();
        let mut seen = 0;
        match root {
            Value::Array(items) => {
                for item in items {
                    match item.as_object() {
                        Some(map) => {
                            seen += map.len();
                            substances.extend(decode_substance_map(map));
                        }
                        None => {
                            seen += 1;
                            tracing::warn!(dataset, "Skipping non-object catalog entry");
                        }
                    }
                }
            }
            Value::Object(map) => {
                seen += map.len();
                substances.extend(decode_substance_map(map));
            }
            _ => {
                return Err(DocumentError::new(
                    dataset,
                    "expected an object keyed by name or an array of such objects",
                ))
            }
        }

        ensure_decoded(dataset, seen, substances.len())?;
        Ok(Self::from_substances(substances))
    }

    fn record_count(&self) -> usize {
        self.len()
    }

    fn slot(slots: &Slots) -> &Slot<Self> {
        &slots.substances
    }
}

/// A document that has records but none that decode is a failed payload
/// (an error body, a schema change), not an empty dataset.
fn ensure_decoded(dataset: &'static str, seen: usize, decoded: usize) -> Result<(), DocumentError> {
    if seen > 0 && decoded == 0 {
        return Err(DocumentError::new(
            dataset,
            format!("none of {} records could be decoded", seen),
        ));
    }
    if decoded < seen {
        tracing::warn!(dataset, seen, decoded, "Some records were skipped");
    }
    Ok(())
}

fn decode_substance_map(map: &Map<String, Value>) -> Vec<Substance> {
    map.iter()
        .filter_map(|(key, detail)| decode_substance(key, detail))
        .collect()
}

/// Decode one catalog record; `None` (with a warning) if it is not an object.
pub fn decode_substance(key: &str, detail: &Value) -> Option<Substance> {
    let Some(obj) = detail.as_object() else {
        tracing::warn!(name = %key, "Skipping substance with non-object details");
        return None;
    };

    let name = canonical_name(
        obj.get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(key),
    );
    if name.is_empty() {
        tracing::warn!("Skipping substance with empty name");
        return None;
    }

    let display_name = obj
        .get("pretty_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| capitalize(&name));

    let mut aliases: Vec<String> = Vec::new();
    for alias in string_list(obj.get("aliases")) {
        if !aliases.iter().any(|a| a.eq_ignore_ascii_case(&alias)) {
            aliases.push(alias);
        }
    }

    let properties = obj.get("properties").cloned().unwrap_or(Value::Null);
    let summary = properties
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let timing = SubstanceTiming {
        onset: timing_text(obj.get("formatted_onset")),
        duration: timing_text(obj.get("formatted_duration")),
        after_effects: timing_text(obj.get("formatted_aftereffects")),
    };

    Some(Substance {
        name,
        display_name,
        aliases,
        categories: string_list(obj.get("categories")),
        summary,
        timing,
        dose_table: obj.get("formatted_dose").cloned().unwrap_or(Value::Null),
        effects: obj.get("formatted_effects").cloned().unwrap_or(Value::Null),
        links: obj.get("links").cloned().unwrap_or(Value::Null),
        sources: obj.get("sources").cloned().unwrap_or(Value::Null),
        properties,
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Join a `formatted_*` timing field into one duration expression.
///
/// Upstream uses `{"value": "20-40", "_unit": "minutes"}`, or per-route keys
/// such as `{"Oral": "1-2", "_unit": "hours"}`, or occasionally a bare string.
fn timing_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Object(obj) => {
            let amount = obj.get("value").and_then(Value::as_str).or_else(|| {
                obj.iter()
                    .filter(|(k, _)| !k.starts_with('_'))
                    .find_map(|(_, v)| v.as_str())
            })?;
            let unit = obj.get("_unit").and_then(Value::as_str).unwrap_or_default();
            format!("{} {}", amount.trim(), unit.trim()).trim().to_string()
        }
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

// ============================================
// Interactions
// ============================================

/// Order-independent key for a pair of substances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    a: String,
    b: String,
}

impl PairKey {
    /// Canonicalize both names and sort them.
    pub fn new(first: &str, second: &str) -> Self {
        let first = canonical_name(first);
        let second = canonical_name(second);
        if first <= second {
            Self {
                a: first,
                b: second,
            }
        } else {
            Self {
                a: second,
                b: first,
            }
        }
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }
}

/// Documented interactions, keyed by unordered pair.
#[derive(Debug, Clone, Default)]
pub struct InteractionTable {
    entries: HashMap<PairKey, InteractionEntry>,
    /// substance -> pairs it appears in
    by_substance: BTreeMap<String, Vec<PairKey>>,
}

impl InteractionTable {
    /// Build a table from entries.
    ///
    /// When a pair appears twice the more severe status wins; a note or
    /// sources missing from the winner are taken from the other entry.
    pub fn from_entries(entries: impl IntoIterator<Item = InteractionEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    fn insert(&mut self, entry: InteractionEntry) {
        let key = PairKey::new(&entry.a, &entry.b);
        let entry = InteractionEntry {
            a: key.a.clone(),
            b: key.b.clone(),
            ..entry
        };

        match self.entries.get_mut(&key) {
            Some(existing) => {
                if entry.status != existing.status {
                    tracing::debug!(
                        a = %key.a,
                        b = %key.b,
                        kept = %existing.status.max(entry.status),
                        "Conflicting statuses for pair, keeping the more severe"
                    );
                }
                let (mut winner, loser) = if entry.status > existing.status {
                    (entry, existing.clone())
                } else {
                    (existing.clone(), entry)
                };
                if winner.note.is_none() {
                    winner.note = loser.note;
                }
                if winner.sources.is_empty() {
                    winner.sources = loser.sources;
                }
                *existing = winner;
            }
            None => {
                self.by_substance
                    .entry(key.a.clone())
                    .or_default()
                    .push(key.clone());
                if key.b != key.a {
                    self.by_substance
                        .entry(key.b.clone())
                        .or_default()
                        .push(key.clone());
                }
                self.entries.insert(key, entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for the pair, in either order.
    pub fn get(&self, first: &str, second: &str) -> Option<&InteractionEntry> {
        self.entries.get(&PairKey::new(first, second))
    }

    /// Every documented entry involving `name`, in partner-name order.
    pub fn entries_for(&self, name: &str) -> Vec<&InteractionEntry> {
        let mut keys: Vec<&PairKey> = self
            .by_substance
            .get(&canonical_name(name))
            .map(|keys| keys.iter().collect())
            .unwrap_or_default();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| self.entries.get(key))
            .collect()
    }

    /// Every substance named in the table, sorted.
    pub fn substances(&self) -> impl Iterator<Item = &str> {
        self.by_substance.keys().map(String::as_str)
    }

    pub fn contains_substance(&self, name: &str) -> bool {
        self.by_substance.contains_key(&canonical_name(name))
    }
}

impl CatalogData for InteractionTable {
    const DATASET: Dataset = Dataset::Interactions;

    fn from_document(doc: &Value) -> Result<Self, DocumentError> {
        let dataset = Self::DATASET.key();
        let outer = doc.as_object().ok_or_else(|| {
            DocumentError::new(dataset, "expected an object keyed by substance name")
        })?;

        let mut entries = Vec::new();
        let mut seen = 0;
        for (a, partners) in outer {
            let Some(partners) = partners.as_object() else {
                seen += 1;
                tracing::warn!(dataset, substance = %a, "Skipping non-object interaction row");
                continue;
            };
            for (b, detail) in partners {
                seen += 1;
                match decode_interaction(a, b, detail) {
                    Some(entry) => entries.push(entry),
                    None => tracing::warn!(dataset, a = %a, b = %b, "Skipping interaction without status"),
                }
            }
        }

        ensure_decoded(dataset, seen, entries.len())?;
        Ok(Self::from_entries(entries))
    }

    fn record_count(&self) -> usize {
        self.len()
    }

    fn slot(slots: &Slots) -> &Slot<Self> {
        &slots.interactions
    }
}

fn decode_interaction(a: &str, b: &str, detail: &Value) -> Option<InteractionEntry> {
    let raw_status = detail.get("status")?.as_str()?.trim().to_string();
    let note = detail
        .get("note")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    let sources = detail
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<Citation>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    Some(InteractionEntry {
        a: a.to_string(),
        b: b.to_string(),
        status: StatusCode::normalize(&raw_status),
        raw_status,
        note,
        sources,
    })
}

// ============================================
// Status definitions
// ============================================

/// Definitions for each known status.
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    definitions: HashMap<StatusCode, StatusDefinition>,
}

impl DefinitionTable {
    pub fn from_definitions(definitions: impl IntoIterator<Item = StatusDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .filter(|d| d.status != StatusCode::Unknown)
                .map(|d| (d.status, d))
                .collect(),
        }
    }

    pub fn get(&self, status: StatusCode) -> Option<&StatusDefinition> {
        self.definitions.get(&status)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions, most severe first.
    pub fn iter(&self) -> impl Iterator<Item = &StatusDefinition> {
        StatusCode::KNOWN
            .into_iter()
            .filter_map(|code| self.definitions.get(&code))
    }
}

impl CatalogData for DefinitionTable {
    const DATASET: Dataset = Dataset::Definitions;

    fn from_document(doc: &Value) -> Result<Self, DocumentError> {
        let dataset = Self::DATASET.key();
        let items = doc
            .as_array()
            .ok_or_else(|| DocumentError::new(dataset, "expected an array of definitions"))?;

        let mut definitions = Vec::new();
        for item in items {
            let Some(raw_status) = item.get("status").and_then(Value::as_str) else {
                tracing::warn!(dataset, "Skipping definition without status");
                continue;
            };
            let status = StatusCode::normalize(raw_status);
            if status == StatusCode::Unknown {
                tracing::debug!(dataset, status = %raw_status, "Skipping definition for unknown status");
                continue;
            }
            let text = |key: &str| {
                item.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            definitions.push(StatusDefinition {
                status,
                definition: text("definition"),
                emoji: text("emoji"),
                color: text("color"),
                thumbnail: item
                    .get("thumbnail")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }

        ensure_decoded(dataset, items.len(), definitions.len())?;
        Ok(Self::from_definitions(definitions))
    }

    fn record_count(&self) -> usize {
        self.len()
    }

    fn slot(slots: &Slots) -> &Slot<Self> {
        &slots.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog_doc() -> Value {
        json!({
            "mdma": {
                "pretty_name": "MDMA",
                "aliases": ["molly", "ecstasy", "Molly"],
                "categories": ["empathogen", "stimulant"],
                "properties": {"summary": "An empathogen."},
                "formatted_onset": {"value": "30-45", "_unit": "minutes"},
                "formatted_duration": {"value": "3-5", "_unit": "hours"},
                "formatted_aftereffects": {"value": "12-48", "_unit": "hours"},
                "formatted_dose": {"Oral": {"Common": "75-125mg"}}
            },
            "alcohol": {
                "categories": ["depressant"],
                "formatted_onset": {"Oral": "5-10", "_unit": "minutes"}
            },
            "broken": "not an object"
        })
    }

    #[test]
    fn test_decode_bundled_shape() {
        let catalog = SubstanceCatalog::from_document(&catalog_doc()).unwrap();
        assert_eq!(catalog.len(), 2);

        let names: Vec<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alcohol", "mdma"]);

        let mdma = catalog.get("MDMA").unwrap();
        assert_eq!(mdma.display_name, "MDMA");
        assert_eq!(mdma.aliases, vec!["molly", "ecstasy"]);
        assert_eq!(mdma.categories, vec!["empathogen", "stimulant"]);
        assert_eq!(mdma.summary, "An empathogen.");
        assert_eq!(mdma.timing.onset.as_deref(), Some("30-45 minutes"));
        assert_eq!(mdma.timing.duration.as_deref(), Some("3-5 hours"));
        assert!(mdma.dose_table.get("Oral").is_some());

        let alcohol = catalog.get("alcohol").unwrap();
        assert_eq!(alcohol.display_name, "Alcohol");
        assert_eq!(alcohol.summary, "");
        assert_eq!(alcohol.timing.onset.as_deref(), Some("5-10 minutes"));
        assert!(alcohol.timing.duration.is_none());
    }

    #[test]
    fn test_decode_api_shape() {
        let doc = json!({
            "err": null,
            "data": [
                {"lsd": {"name": "lsd", "pretty_name": "LSD", "aliases": ["acid"]}},
                {"dmt": {"pretty_name": "DMT"}, "2c-b": {"pretty_name": "2C-B"}}
            ]
        });
        let catalog = SubstanceCatalog::from_document(&doc).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("acid").unwrap().name, "lsd");
        assert_eq!(catalog.get("2C-B").unwrap().display_name, "2C-B");
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let err = SubstanceCatalog::from_document(&json!("nope")).unwrap_err();
        assert_eq!(err.dataset, "substances");
        assert!(InteractionTable::from_document(&json!([])).is_err());
        assert!(DefinitionTable::from_document(&json!({})).is_err());
    }

    #[test]
    fn test_documents_with_no_usable_records_are_rejected() {
        let err = SubstanceCatalog::from_document(&json!({"message": "rate limited"})).unwrap_err();
        assert_eq!(err.dataset, "substances");
        assert!(SubstanceCatalog::from_document(&json!({"err": "down", "data": null})).is_err());
        assert!(InteractionTable::from_document(&json!({"error": "upstream unavailable"})).is_err());
        assert!(InteractionTable::from_document(&json!({"x": {"y": {"note": "no status"}}})).is_err());
        assert!(DefinitionTable::from_document(&json!([{"oops": 1}])).is_err());
        assert!(DefinitionTable::from_document(&json!([{"status": "Mystery"}])).is_err());
    }

    #[test]
    fn test_empty_documents_decode_to_empty_tables() {
        assert!(SubstanceCatalog::from_document(&json!({"err": null, "data": []}))
            .unwrap()
            .is_empty());
        assert!(InteractionTable::from_document(&json!({})).unwrap().is_empty());
        assert!(DefinitionTable::from_document(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_search_and_filter() {
        let catalog = SubstanceCatalog::from_document(&catalog_doc()).unwrap();

        let hits: Vec<&str> = catalog.search("ECST").iter().map(|s| s.name.as_str()).collect();
        assert_eq!(hits, vec!["mdma"]);

        assert_eq!(catalog.search("").len(), 2);

        let depressants = catalog.filter("", &["Depressant".to_string()]);
        assert_eq!(depressants.len(), 1);
        assert_eq!(depressants[0].name, "alcohol");

        assert!(catalog
            .filter("molly", &["depressant".to_string()])
            .is_empty());

        assert_eq!(
            catalog.categories(),
            vec!["depressant", "empathogen", "stimulant"]
        );
    }

    #[test]
    fn test_alias_does_not_shadow_name() {
        let doc = json!({
            "speed": {"aliases": ["amphetamine"]},
            "amphetamine": {"pretty_name": "Amphetamine"}
        });
        let catalog = SubstanceCatalog::from_document(&doc).unwrap();
        assert_eq!(catalog.get("amphetamine").unwrap().name, "amphetamine");
    }

    #[test]
    fn test_interactions_are_symmetric() {
        let doc = json!({
            "mdma": {
                "alcohol": {"status": "Caution", "note": "Dehydration."},
                "lsd": {"status": "Low Risk & Synergy"}
            },
            "alcohol": {"ghb": {"status": "Dangerous", "sources": [
                {"author": "A", "title": "T", "url": "https://example.org"},
                "not a citation"
            ]}}
        });
        let table = InteractionTable::from_document(&doc).unwrap();
        assert_eq!(table.len(), 3);

        let forward = table.get("mdma", "alcohol").unwrap();
        let backward = table.get("Alcohol", " MDMA ").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.a, "alcohol");
        assert_eq!(forward.b, "mdma");
        assert_eq!(forward.status, StatusCode::Caution);
        assert_eq!(forward.note.as_deref(), Some("Dehydration."));

        let ghb = table.get("ghb", "alcohol").unwrap();
        assert_eq!(ghb.sources.len(), 1);

        assert!(table.get("lsd", "ghb").is_none());
    }

    #[test]
    fn test_conflicting_directions_keep_most_severe() {
        let doc = json!({
            "a": {"b": {"status": "Caution", "note": "from a"}},
            "b": {"a": {"status": "Unsafe"}}
        });
        let table = InteractionTable::from_document(&doc).unwrap();
        assert_eq!(table.len(), 1);
        let entry = table.get("a", "b").unwrap();
        assert_eq!(entry.status, StatusCode::Unsafe);
        assert_eq!(entry.note.as_deref(), Some("from a"));
    }

    #[test]
    fn test_entries_for_and_substances() {
        let doc = json!({
            "mdma": {"alcohol": {"status": "Caution"}, "lsd": {"status": "Low Risk & Synergy"}},
            "ketamine": {"alcohol": {"status": "Dangerous"}},
            "x": {"y": {"note": "no status"}}
        });
        let table = InteractionTable::from_document(&doc).unwrap();

        let partners: Vec<&str> = table
            .entries_for("alcohol")
            .into_iter()
            .filter_map(|e| e.partner_of("alcohol"))
            .collect();
        assert_eq!(partners, vec!["ketamine", "mdma"]);

        let names: Vec<&str> = table.substances().collect();
        assert_eq!(names, vec!["alcohol", "ketamine", "lsd", "mdma"]);
        assert!(table.contains_substance("LSD"));
        assert!(!table.contains_substance("x"));
    }

    #[test]
    fn test_unknown_status_is_kept_with_raw_text() {
        let doc = json!({"a": {"b": {"status": "Serotonin Syndrome"}}});
        let table = InteractionTable::from_document(&doc).unwrap();
        let entry = table.get("a", "b").unwrap();
        assert_eq!(entry.status, StatusCode::Unknown);
        assert_eq!(entry.raw_status, "Serotonin Syndrome");
    }

    #[test]
    fn test_definitions() {
        let doc = json!([
            {"status": "Dangerous", "emoji": "☠️", "color": "#F44336", "definition": "Avoid."},
            {"status": "low risk & no synergy", "emoji": "➖", "color": "#4CAF50", "definition": "Additive."},
            {"status": "Mystery", "definition": "?"},
            {"emoji": "x"}
        ]);
        let table = DefinitionTable::from_document(&doc).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(StatusCode::Dangerous).unwrap().definition,
            "Avoid."
        );
        assert!(table.get(StatusCode::Caution).is_none());
        assert!(table.get(StatusCode::Unknown).is_none());

        let order: Vec<StatusCode> = table.iter().map(|d| d.status).collect();
        assert_eq!(
            order,
            vec![StatusCode::Dangerous, StatusCode::LowRiskNoSynergy]
        );
    }
}
