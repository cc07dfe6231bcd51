use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{classify, classify_opt};
use crate::model::{Category, CategoryRollup, InventorySummary, RawRecord};

/// Codes that stand for "unidentified stock" in stored rows.
pub const DEFAULT_PLACEHOLDERS: [&str; 2] = ["—", "-"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Keep only groups whose code classifies to this category.
    pub category: Option<Category>,
    /// Codes excluded from grouping, in addition to empty ones.
    pub placeholders: Vec<String>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            category: None,
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AggregateOptions {
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    /// Normalized grouping key, or `None` for missing/placeholder codes.
    fn group_key(&self, code: Option<&str>) -> Option<String> {
        let code = code?.trim();
        if code.is_empty() || self.placeholders.iter().any(|p| p.trim() == code) {
            return None;
        }
        Some(code.to_uppercase())
    }
}

/// Group records by code into per-code inventory summaries.
///
/// Every record counts as one unit. Output is sorted by code, so running
/// twice over the same records yields identical summaries. The category is
/// recomputed from the code, not read from storage.
pub fn aggregate_records(records: &[RawRecord], options: &AggregateOptions) -> Vec<InventorySummary> {
    let mut groups: BTreeMap<String, (usize, BTreeSet<String>, &RawRecord)> = BTreeMap::new();

    for record in records {
        let Some(key) = options.group_key(record.code.as_deref()) else {
            continue;
        };
        if options.category.is_some_and(|c| c != classify(&key)) {
            continue;
        }
        let entry = groups.entry(key).or_insert_with(|| (0, BTreeSet::new(), record));
        entry.0 += 1;
        if let Some(location) = record.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            entry.1.insert(location.to_string());
        }
        // Prefer a representative that actually carries vehicle info.
        if entry.2.vehicle_brand.is_none() && record.vehicle_brand.is_some() {
            entry.2 = record;
        }
    }

    groups
        .into_iter()
        .map(|(code, (count, locations, representative))| InventorySummary {
            category: classify(&code),
            vehicle_label: representative.vehicle_label(),
            brand: representative.vehicle_brand.clone(),
            total_quantity: count,
            locations,
            code,
        })
        .collect()
}

/// Category totals over the full record set, independent of grouping.
///
/// Records without a code count as standard so the three buckets always sum
/// to `total`.
pub fn category_rollup(records: &[RawRecord]) -> CategoryRollup {
    let mut rollup = CategoryRollup::default();
    for record in records {
        match classify_opt(record.code.as_deref()) {
            Category::Standard => rollup.standard += 1,
            Category::Complementary => rollup.complementary += 1,
            Category::Oem => rollup.oem += 1,
        }
        rollup.total += 1;
    }
    rollup
}
