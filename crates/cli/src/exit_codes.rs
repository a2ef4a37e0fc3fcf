//! CLI Exit Code Registry
//!
//! Single source of truth for `crisis-panel` exit codes. Scripts rely on
//! them, so a code never changes meaning once released.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 1    | General error (unspecified)                              |
//! | 2    | Usage error (bad arguments)                              |
//! | 3    | Invalid config (parse, validation, alias table)          |
//! | 4    | Runtime / IO failure (unreadable input, unwritable out)  |
//! | 5    | Degraded run under `--strict` (a source failed)          |
//! | 6    | Fetch failure (network, HTTP status, page layout)        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Config could not be parsed or failed validation, or the alias table is
/// malformed.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Reading inputs or writing artifacts failed, or the merge hit a
/// duplicate key.
pub const EXIT_RUNTIME: u8 = 4;

/// `run --strict`: at least one configured source failed. Artifacts are
/// still written.
pub const EXIT_DEGRADED: u8 = 5;

/// `fetch-codes`: request failed, non-2xx status, or no code table on the
/// page.
pub const EXIT_FETCH: u8 = 6;
