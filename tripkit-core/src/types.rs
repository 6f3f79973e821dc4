//! Core domain types for tripkit
//!
//! These types represent the normalized data model that every dataset
//! document (remote, cached, or bundled) is decoded into.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Substance** | A catalog entry, keyed by its canonical lowercase name |
//! | **Interaction** | The documented outcome of combining two substances |
//! | **Status** | The closed risk taxonomy an interaction is classified under |
//! | **Definition** | Human-readable explanation of a status |
//! | **Dataset** | One independently synced document (substances, interactions, definitions) |
//! | **Snapshot** | The dataset value currently served to readers, with its provenance |
//!
//! Status text arrives in several spellings ("Low Risk & Synergy",
//! "low_risk_synergy", "CAUTION"). [`StatusCode::normalize`] is the single
//! place that spelling is resolved; nothing downstream compares strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Datasets
// ============================================

/// One independently synced document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Substance catalog
    Substances,
    /// Pairwise interaction table
    Interactions,
    /// Status definitions for the interaction table
    Definitions,
}

impl Dataset {
    /// Every dataset, in refresh order
    pub const ALL: [Dataset; 3] = [
        Dataset::Substances,
        Dataset::Interactions,
        Dataset::Definitions,
    ];

    /// Storage key, also used in logs and error messages
    pub fn key(&self) -> &'static str {
        match self {
            Dataset::Substances => "substances",
            Dataset::Interactions => "interactions",
            Dataset::Definitions => "definitions",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for Dataset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substances" | "drugs" => Ok(Dataset::Substances),
            "interactions" | "combos" => Ok(Dataset::Interactions),
            "definitions" | "combo_definitions" => Ok(Dataset::Definitions),
            other => Err(format!("unknown dataset: {}", other)),
        }
    }
}

/// A persisted dataset document.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord<T> {
    /// Which dataset this record holds
    pub dataset: Dataset,
    /// The document as it was fetched
    pub payload: T,
    /// When the payload was last confirmed against the remote source
    pub last_synced_at: Option<DateTime<Utc>>,
}

// ============================================
// Interaction status
// ============================================

/// Closed risk taxonomy for substance combinations.
///
/// Variants are declared in ascending severity, so the derived `Ord` ranks
/// them. `Unknown` sorts lowest: any documented status outranks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// Status text that did not match any known code
    Unknown,
    /// Effects are additive at most
    LowRiskNoSynergy,
    /// One substance reduces the effects of the other
    LowRiskDecrease,
    /// Effects are enhanced, low risk
    LowRiskSynergy,
    /// Use caution, may be harmful in combination
    Caution,
    /// Considerable risk of physical harm
    Unsafe,
    /// Life-threatening in combination
    Dangerous,
}

impl StatusCode {
    /// Every known code, most severe first
    pub const KNOWN: [StatusCode; 6] = [
        StatusCode::Dangerous,
        StatusCode::Unsafe,
        StatusCode::Caution,
        StatusCode::LowRiskSynergy,
        StatusCode::LowRiskDecrease,
        StatusCode::LowRiskNoSynergy,
    ];

    /// Resolve any accepted spelling of a status.
    ///
    /// Matching is case-insensitive and treats `&`, `_`, `-` and runs of
    /// whitespace as equivalent separators, so both the upstream display
    /// labels and snake-case codes resolve to the same variant.
    pub fn normalize(text: &str) -> StatusCode {
        let canonical: String = text
            .to_lowercase()
            .replace('&', " ")
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        match canonical.as_str() {
            "low risk no synergy" => StatusCode::LowRiskNoSynergy,
            "low risk decrease" => StatusCode::LowRiskDecrease,
            "low risk synergy" => StatusCode::LowRiskSynergy,
            "caution" => StatusCode::Caution,
            "unsafe" => StatusCode::Unsafe,
            "dangerous" => StatusCode::Dangerous,
            _ => StatusCode::Unknown,
        }
    }

    /// Snake-case code
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Unknown => "unknown",
            StatusCode::LowRiskNoSynergy => "low_risk_no_synergy",
            StatusCode::LowRiskDecrease => "low_risk_decrease",
            StatusCode::LowRiskSynergy => "low_risk_synergy",
            StatusCode::Caution => "caution",
            StatusCode::Unsafe => "unsafe",
            StatusCode::Dangerous => "dangerous",
        }
    }

    /// Label as published upstream
    pub fn label(&self) -> &'static str {
        match self {
            StatusCode::Unknown => "Unknown",
            StatusCode::LowRiskNoSynergy => "Low Risk & No Synergy",
            StatusCode::LowRiskDecrease => "Low Risk & Decrease",
            StatusCode::LowRiskSynergy => "Low Risk & Synergy",
            StatusCode::Caution => "Caution",
            StatusCode::Unsafe => "Unsafe",
            StatusCode::Dangerous => "Dangerous",
        }
    }

    /// True for the three low-risk codes
    pub fn is_low_risk(&self) -> bool {
        matches!(
            self,
            StatusCode::LowRiskNoSynergy | StatusCode::LowRiskDecrease | StatusCode::LowRiskSynergy
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for StatusCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match StatusCode::normalize(s) {
            StatusCode::Unknown => Err(format!("unknown status: {}", s)),
            code => Ok(code),
        }
    }
}

// ============================================
// Interactions
// ============================================

/// A reference backing an interaction claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Citation {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Documented interaction between two substances.
///
/// `a` and `b` are canonical names with `a <= b`; the entry carries no
/// direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionEntry {
    pub a: String,
    pub b: String,
    pub status: StatusCode,
    /// Status text exactly as published, for display when `status` is Unknown
    pub raw_status: String,
    pub note: Option<String>,
    pub sources: Vec<Citation>,
}

impl InteractionEntry {
    /// The member of the pair that is not `name`, if `name` is a member.
    pub fn partner_of(&self, name: &str) -> Option<&str> {
        let name = canonical_name(name);
        if self.a == name {
            Some(self.b.as_str())
        } else if self.b == name {
            Some(self.a.as_str())
        } else {
            None
        }
    }
}

/// Human-readable explanation of a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDefinition {
    pub status: StatusCode,
    pub definition: String,
    pub emoji: String,
    pub color: String,
    pub thumbnail: Option<String>,
}

// ============================================
// Substances
// ============================================

/// Raw timing text for the three effect phases, e.g. `"20-40 minutes"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SubstanceTiming {
    pub onset: Option<String>,
    pub duration: Option<String>,
    pub after_effects: Option<String>,
}

impl SubstanceTiming {
    /// True when no phase has any text
    pub fn is_empty(&self) -> bool {
        self.onset.is_none() && self.duration.is_none() && self.after_effects.is_none()
    }
}

/// A catalog entry.
///
/// `dose_table`, `effects`, `links`, `sources` and `properties` are passed
/// through untouched for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Substance {
    /// Canonical lowercase name (primary key)
    pub name: String,
    pub display_name: String,
    pub aliases: Vec<String>,
    pub categories: Vec<String>,
    pub summary: String,
    pub timing: SubstanceTiming,
    pub dose_table: serde_json::Value,
    pub effects: serde_json::Value,
    pub links: serde_json::Value,
    pub sources: serde_json::Value,
    pub properties: serde_json::Value,
}

impl Substance {
    /// Whether `query` (already lowercased) occurs in the name, display name, or an alias.
    pub(crate) fn matches_query(&self, query: &str) -> bool {
        self.name.contains(query)
            || self.display_name.to_lowercase().contains(query)
            || self
                .aliases
                .iter()
                .any(|alias| alias.to_lowercase().contains(query))
    }

    /// Whether any category equals one of `wanted` (already lowercased).
    pub(crate) fn in_any_category(&self, wanted: &[String]) -> bool {
        self.categories
            .iter()
            .any(|c| wanted.iter().any(|w| c.eq_ignore_ascii_case(w)))
    }

    /// Effect timeline derived from this substance's timing text.
    ///
    /// `None` when the catalog has no usable timing data.
    pub fn timeline(&self) -> Option<crate::timeline::Timeline> {
        crate::timeline::build_timeline(
            self.timing.onset.as_deref(),
            self.timing.duration.as_deref(),
            self.timing.after_effects.as_deref(),
        )
    }
}

/// Canonical form of a substance name: trimmed and lowercased.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Name with its first character uppercased, for entries with no display name.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
