//! `eurostock-recon`: Eurocode resolution and inventory reconciliation engine.
//!
//! Pure engine crate: receives OCR text and pre-loaded records, returns
//! resolved captures and per-code inventory summaries. No CLI or IO
//! dependencies; persistence and the operator prompt are supplied by callers.

pub mod aggregate;
pub mod capture;
pub mod classify;
pub mod disambiguate;
pub mod error;
pub mod extract;
pub mod model;
pub mod prefix;
pub mod report;
pub mod scope;

pub use aggregate::{aggregate_records, category_rollup, AggregateOptions};
pub use capture::{CaptureContext, CaptureOutcome, CodelessPolicy, OcrGuess, OcrInput};
pub use classify::classify;
pub use disambiguate::{
    disambiguate, Disambiguation, Operator, ScriptedChoice, ScriptedOperator, Selection,
};
pub use error::{CaptureError, EurocodeError, LookupError, ScopeError};
pub use extract::extract_codes;
pub use model::{
    Category, CategoryRollup, Code, Confidence, InventorySummary, Prefix, PrefixMapping, RawRecord,
    ResolutionSource, UserId, VehicleResolution,
};
pub use prefix::{resolve, resolve_code, PrefixSource, SharedPrefixTable, StaticPrefixTable};
pub use report::{build_report, InventoryReport, ReportMeta};
pub use scope::{authorize, Caller, Role, Scope};
