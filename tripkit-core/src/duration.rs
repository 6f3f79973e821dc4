//! Free-text duration parsing
//!
//! Catalog timing fields look like `"45-90 minutes"`, `"8-12 hours"`,
//! `"1.5 hrs"` or just `"30"`. Upstream data is hand-edited and sometimes
//! malformed, so [`parse`] never fails: anything it cannot read becomes the
//! zero sentinel, which downstream code treats as "no data".

use crate::error::ParseError;
use serde::Serialize;
use std::fmt;

/// Unit a range was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Minutes,
    Hours,
}

impl DurationUnit {
    /// Minutes per one of this unit
    pub fn minutes(&self) -> f64 {
        match self {
            DurationUnit::Minutes => 1.0,
            DurationUnit::Hours => 60.0,
        }
    }

    /// Detect the unit by case-insensitive substring match.
    ///
    /// Hours win when both appear; no match means minutes.
    pub fn detect(text: &str) -> DurationUnit {
        DurationUnit::named_in(text).unwrap_or(DurationUnit::Minutes)
    }

    /// The unit `text` spells out, if any.
    pub fn named_in(text: &str) -> Option<DurationUnit> {
        let lower = text.to_lowercase();
        if lower.contains("hour") || lower.contains("hr") {
            Some(DurationUnit::Hours)
        } else if lower.contains("min") {
            Some(DurationUnit::Minutes)
        } else {
            None
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationUnit::Minutes => f.write_str("minutes"),
            DurationUnit::Hours => f.write_str("hours"),
        }
    }
}

/// A `min..=max` span in a stated unit. Always `0 <= min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationRange {
    pub min: f64,
    pub max: f64,
    pub unit: DurationUnit,
}

impl DurationRange {
    /// The "no data" sentinel.
    pub const ZERO: DurationRange = DurationRange {
        min: 0.0,
        max: 0.0,
        unit: DurationUnit::Minutes,
    };

    /// Build a range, reordering the bounds if they arrive reversed.
    pub fn new(a: f64, b: f64, unit: DurationUnit) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Self { min, max, unit }
    }

    /// Midpoint, in the stated unit
    pub fn avg(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Midpoint, in minutes
    pub fn avg_minutes(&self) -> f64 {
        self.avg() * self.unit.minutes()
    }

    pub fn min_minutes(&self) -> f64 {
        self.min * self.unit.minutes()
    }

    pub fn max_minutes(&self) -> f64 {
        self.max * self.unit.minutes()
    }

    /// True for the sentinel and for any explicit zero-length range
    pub fn is_zero(&self) -> bool {
        self.max == 0.0
    }
}

impl Default for DurationRange {
    fn default() -> Self {
        DurationRange::ZERO
    }
}

impl fmt::Display for DurationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{} {}", self.min, self.unit)
        } else {
            write!(f, "{}-{} {}", self.min, self.max, self.unit)
        }
    }
}

/// Parse duration text, degrading any failure to [`DurationRange::ZERO`].
///
/// Failures are logged at warn level so bad upstream rows stay visible.
pub fn parse(text: Option<&str>) -> DurationRange {
    match try_parse(text) {
        Ok(range) => range,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable duration, treating as unavailable");
            DurationRange::ZERO
        }
    }
}

/// Parse duration text, reporting why it could not be read.
///
/// Absent or blank text is not an error: it is the zero sentinel.
pub fn try_parse(text: Option<&str>) -> Result<DurationRange, ParseError> {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(DurationRange::ZERO),
    };

    let parts: Vec<&str> = text.split(['-', '–']).collect();

    match parts.as_slice() {
        [single] => {
            let value = leading_number(text, single)?;
            Ok(DurationRange::new(value, value, DurationUnit::detect(text)))
        }
        [low, high] => {
            let low_value = leading_number(text, low)?;
            let high_value = leading_number(text, high)?;

            // A side without its own unit takes the other side's ("1-2 hours")
            let low_own = DurationUnit::named_in(low);
            let high_own = DurationUnit::named_in(high);
            let shared = high_own.or(low_own).unwrap_or(DurationUnit::Minutes);
            let low_unit = low_own.unwrap_or(shared);
            let high_unit = high_own.unwrap_or(shared);

            if low_unit == high_unit {
                return Ok(DurationRange::new(low_value, high_value, shared));
            }
            // "30 minutes - 1 hour": compare like with like
            Ok(DurationRange::new(
                low_value * low_unit.minutes(),
                high_value * high_unit.minutes(),
                DurationUnit::Minutes,
            ))
        }
        _ => Err(ParseError::Malformed {
            text: text.to_string(),
        }),
    }
}

/// Read the number at the start of one side of a range (`"12 hours"` -> 12).
fn leading_number(text: &str, part: &str) -> Result<f64, ParseError> {
    let part = part.trim().trim_start_matches(['~', '<', '>', '+']);
    let end = part
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(part.len());
    let token = &part[..end];

    let invalid = || ParseError::InvalidNumber {
        text: text.to_string(),
        token: part.split_whitespace().next().unwrap_or("").to_string(),
    };

    let value: f64 = token.parse().map_err(|_| invalid())?;
    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}
