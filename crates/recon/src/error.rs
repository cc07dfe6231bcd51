use thiserror::Error;

/// Errors raised while interpreting a single code.
#[derive(Debug, Error)]
pub enum EurocodeError {
    /// The token has no valid 4-digit prefix after stripping the marker.
    #[error("invalid code format: '{code}' has no 4-digit prefix")]
    InvalidCodeFormat { code: String },
    /// A prefix table could not be parsed or contains a bad key.
    #[error("prefix table error: {0}")]
    PrefixTable(String),
    /// The prefix source itself failed (not a miss).
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Backend failure while reading a prefix mapping. A miss is `Ok(None)`, never this.
#[derive(Debug, Error)]
#[error("prefix lookup failed: {0}")]
pub struct LookupError(pub String);

/// Terminal outcomes of a capture that do not produce a record.
///
/// None of these are fatal: the in-flight capture is dropped and nothing is
/// persisted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    /// Extraction found no candidates and no codeless record was confirmed.
    #[error("no eurocode found in capture")]
    NoCodeFound,
    /// The operator chose "none" at the selection prompt and codeless
    /// records are not accepted.
    #[error("operator declined every candidate")]
    Declined,
    /// The operator aborted the capture.
    #[error("capture cancelled by operator")]
    Cancelled,
    /// The operator answered with a code that was not offered.
    #[error("selected code '{0}' is not one of the offered candidates")]
    InvalidSelection(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("role '{role}' may not read records of user '{target}'")]
    Forbidden { role: String, target: String },
    #[error("unknown role: '{0}' (expected operator, manager or admin)")]
    UnknownRole(String),
}
