//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: cron jobs and scripts
//! branch on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                                  |
//! |---------|-------------|----------------------------------------------|
//! | 0       | Universal   | Success                                      |
//! | 1       | Universal   | General error (unspecified)                  |
//! | 2       | Universal   | CLI usage error (bad args, bad dates)        |
//! | 3-9     | local       | Config file and export failures              |
//! | 50-59   | portal      | Credentials and upstream failures            |
//! | 60-69   | monitor     | Balance threshold checks                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unparseable dates, reversed range.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Local (3-9)
// =============================================================================

/// Config file exists but cannot be read or parsed.
pub const EXIT_CONFIG: u8 = 3;

/// Export file could not be written. Results were already displayed.
pub const EXIT_EXPORT: u8 = 4;

// =============================================================================
// Portal (50-59)
// =============================================================================

/// No session/identity token from flags, gist or environment.
pub const EXIT_CREDENTIALS_MISSING: u8 = 50;

/// Portal says the identity token is invalid or expired.
pub const EXIT_IDENTITY_INVALID: u8 = 51;

/// Portal unreachable or answered with an error.
pub const EXIT_UPSTREAM: u8 = 54;

// =============================================================================
// Monitor (60-69)
// =============================================================================

/// `cardtrail balance`: current balance is below the threshold.
pub const EXIT_BALANCE_LOW: u8 = 60;
