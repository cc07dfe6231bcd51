//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, unreadable input file)        |
//! | 3    | Config file unreadable or invalid                    |
//! | 4    | Record store / prefix table failure                  |
//! | 5    | Caller's role may not read the requested scope       |
//! | 6    | Capture cancelled by the operator                    |
//! | 7    | Capture discarded (no code, or every code declined)  |

use eurostock_io::StoreError;
use eurostock_recon::{CaptureError, ScopeError};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file could not be read or parsed.
pub const EXIT_CONFIG: u8 = 3;

/// SQLite store or CSV exchange failure.
pub const EXIT_STORE: u8 = 4;

/// Scope not permitted for the caller's role.
pub const EXIT_FORBIDDEN: u8 = 5;

/// Operator cancelled the capture. Nothing was saved.
pub const EXIT_CAPTURE_CANCELLED: u8 = 6;

/// Capture produced no record (no code found, or all declined). Nothing was saved.
pub const EXIT_CAPTURE_DISCARDED: u8 = 7;

pub fn capture_exit_code(err: &CaptureError) -> u8 {
    match err {
        CaptureError::Cancelled => EXIT_CAPTURE_CANCELLED,
        CaptureError::NoCodeFound | CaptureError::Declined => EXIT_CAPTURE_DISCARDED,
        CaptureError::InvalidSelection(_) => EXIT_USAGE,
    }
}

pub fn scope_exit_code(err: &ScopeError) -> u8 {
    match err {
        ScopeError::Forbidden { .. } => EXIT_FORBIDDEN,
        ScopeError::UnknownRole(_) => EXIT_USAGE,
    }
}

pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::Import(_) => EXIT_USAGE,
        _ => EXIT_STORE,
    }
}
