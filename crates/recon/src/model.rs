use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EurocodeError;

// ---------------------------------------------------------------------------
// Codes
// ---------------------------------------------------------------------------

/// A normalized (uppercase) Eurocode: optional marker, 4-digit prefix, suffix.
///
/// Only the extractor and [`Code::parse`] construct values, so every `Code`
/// satisfies the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Parse a single token. The whole input must be one code.
    pub fn parse(input: &str) -> Result<Self, EurocodeError> {
        let trimmed = input.trim();
        match crate::extract::extract_codes(trimmed).as_slice() {
            [only] if only.as_str().len() == trimmed.len() => Ok(only.clone()),
            _ => Err(EurocodeError::InvalidCodeFormat { code: trimmed.to_string() }),
        }
    }

    /// Caller guarantees `normalized` already matches the grammar.
    pub(crate) fn from_normalized(normalized: String) -> Self {
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The 4-digit vehicle lookup key.
    pub fn prefix(&self) -> Prefix {
        let digits = self.0.trim_start_matches(['#', '*']);
        Prefix(digits[..4].to_string())
    }
}

impl TryFrom<String> for Code {
    type Error = EurocodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Code::parse(&value)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exactly four ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Prefix(String);

impl Prefix {
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.len() == 4 && input.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(input.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Prefix {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Prefix::parse(&value).ok_or_else(|| format!("'{value}' is not a 4-digit prefix"))
    }
}

impl From<Prefix> for String {
    fn from(prefix: Prefix) -> Self {
        prefix.0
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Stock category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// No marker: regular ("rede") stock.
    Standard,
    /// `#` marker.
    Complementary,
    /// `*` marker.
    Oem,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Standard, Category::Complementary, Category::Oem];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Complementary => "complementary",
            Self::Oem => "oem",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "standard" => Ok(Self::Standard),
            "complementary" => Ok(Self::Complementary),
            "oem" => Ok(Self::Oem),
            other => Err(format!(
                "unknown category '{other}' (expected standard, complementary or oem)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Vehicle resolution
// ---------------------------------------------------------------------------

/// One row of the prefix table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMapping {
    pub brand: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Unknown,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    PrefixTable,
    OcrFreeText,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrefixTable => "prefix_table",
            Self::OcrFreeText => "ocr_free_text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleResolution {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub confidence: Confidence,
    pub source: ResolutionSource,
}

impl VehicleResolution {
    /// The defined "not found" result.
    pub fn unknown() -> Self {
        Self {
            brand: None,
            model: None,
            confidence: Confidence::Unknown,
            source: ResolutionSource::PrefixTable,
        }
    }

    /// Display label: "brand model", "brand", or `None` when the brand is unknown.
    pub fn label(&self) -> Option<String> {
        vehicle_label(self.brand.as_deref(), self.model.as_deref())
    }
}

pub(crate) fn vehicle_label(brand: Option<&str>, model: Option<&str>) -> Option<String> {
    let brand = brand.map(str::trim).filter(|s| !s.is_empty());
    let model = model.map(str::trim).filter(|s| !s.is_empty());
    match (brand, model) {
        (Some(b), Some(m)) => Some(format!("{b} {m}")),
        (Some(b), None) => Some(b.to_string()),
        // A model alone does not identify the vehicle.
        (None, _) => None,
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Tenant-isolation key: the user who captured a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One OCR capture event. `id` is `None` until the store assigns one.
///
/// `code` is kept as free text because stored rows may carry placeholders
/// or hand-edited values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub code: Option<String>,
    pub raw_text: String,
    pub vehicle_brand: Option<String>,
    pub vehicle_model: Option<String>,
    pub captured_at: DateTime<Utc>,
    pub location: Option<String>,
    pub captured_by: UserId,
    pub category: Category,
}

impl RawRecord {
    pub fn vehicle_label(&self) -> Option<String> {
        vehicle_label(self.vehicle_brand.as_deref(), self.vehicle_model.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Aggregation output
// ---------------------------------------------------------------------------

/// Per-code inventory view. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventorySummary {
    pub code: String,
    pub vehicle_label: Option<String>,
    pub brand: Option<String>,
    pub total_quantity: usize,
    pub locations: BTreeSet<String>,
    pub category: Category,
}

/// Dashboard totals partitioned by the code's marker character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryRollup {
    pub standard: usize,
    pub complementary: usize,
    pub oem: usize,
    pub total: usize,
}

impl CategoryRollup {
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Standard => self.standard,
            Category::Complementary => self.complementary,
            Category::Oem => self.oem,
        }
    }
}
