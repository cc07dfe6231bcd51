use serde::Serialize;

use crate::aggregate::{aggregate_records, category_rollup, AggregateOptions};
use crate::model::{Category, CategoryRollup, InventorySummary, RawRecord, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub user: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub record_count: usize,
    pub engine_version: String,
    pub generated_at: String,
}

/// Per-code summaries plus dashboard totals for one user's records.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub meta: ReportMeta,
    pub totals: CategoryRollup,
    pub summaries: Vec<InventorySummary>,
}

impl InventoryReport {
    /// Units across all summaries: every record with a usable code.
    pub fn total_units(&self) -> usize {
        self.summaries.iter().map(|s| s.total_quantity).sum()
    }
}

/// Build a report from records already scoped to `user`.
///
/// Totals cover every record; summaries honour the category filter.
pub fn build_report(user: &UserId, records: &[RawRecord], options: &AggregateOptions) -> InventoryReport {
    let summaries = aggregate_records(records, options);
    let totals = category_rollup(records);
    tracing::debug!(
        user = %user,
        records = records.len(),
        codes = summaries.len(),
        "inventory report built"
    );

    InventoryReport {
        meta: ReportMeta {
            user: user.clone(),
            category: options.category,
            record_count: records.len(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        },
        totals,
        summaries,
    }
}
