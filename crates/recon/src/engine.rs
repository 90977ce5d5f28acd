use std::fmt;

use chrono::NaiveDate;

use crate::aggregate::{AggregateStats, Aggregator};
use crate::balance;
use crate::error::{ReconError, SourceError, SourceErrorKind};
use crate::model::{RawRecord, Transaction};
use crate::money::format_amount;
use crate::window::{partition, QueryWindow, DEFAULT_RECORD_CAP, DEFAULT_WINDOW_DAYS};

/// Anything that can answer one window query.
///
/// Implementations report failures as values; the pipeline logs them and
/// treats the window as empty. An `Auth` failure ends the run.
pub trait TransactionSource {
    fn fetch(&mut self, window: &QueryWindow) -> Result<Vec<RawRecord>, SourceError>;
}

impl<F> TransactionSource for F
where
    F: FnMut(&QueryWindow) -> Result<Vec<RawRecord>, SourceError>,
{
    fn fetch(&mut self, window: &QueryWindow) -> Result<Vec<RawRecord>, SourceError> {
        self(window)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub window_days: u32,
    /// Replies at or above this size may have been truncated upstream.
    pub record_cap: usize,
    /// Extra attempts per failed window. Auth failures are not retried.
    pub retries: u32,
    /// Skip balance reconstruction unless every window came back whole.
    pub require_complete: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            record_cap: DEFAULT_RECORD_CAP,
            retries: 0,
            require_complete: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Window returned at least `record_cap` records.
    Truncated { window: QueryWindow, count: usize },
    /// Window failed after all attempts and was treated as empty.
    SourceFailed { window: QueryWindow, error: SourceError },
    /// Records without any journal id were dropped.
    MissingIdentifier { count: usize },
    /// Records whose timestamp or amount could not be parsed were dropped.
    Malformed { count: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { window, count } => write!(
                f,
                "{}: {} records returned, possible truncation — some records in this window may be missing",
                window, count
            ),
            Self::SourceFailed { window, error } => {
                write!(f, "{}: fetch failed ({}), window treated as empty", window, error)
            }
            Self::MissingIdentifier { count } => {
                write!(f, "{} record(s) without a journal id were dropped", count)
            }
            Self::Malformed { count } => {
                write!(f, "{} record(s) with unreadable time or amount were dropped", count)
            }
        }
    }
}

/// Whether the fetched history can be trusted to be gap-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completeness {
    Complete,
    Incomplete {
        truncated_windows: Vec<QueryWindow>,
        failed_windows: Vec<QueryWindow>,
        /// Records dropped for a missing id or unreadable fields.
        dropped_records: usize,
    },
}

impl Completeness {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceStatus {
    /// Balances filled in; `opening` is the balance before the oldest record.
    Reconstructed { current: i64, opening: i64 },
    /// No current balance was known.
    Unavailable,
    /// History incomplete and reconstruction was required to be exact.
    Skipped,
}

/// Deduplicated, newest-first history with balances and diagnostics.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub windows_fetched: usize,
    pub transactions: Vec<Transaction>,
    pub stats: AggregateStats,
    pub warnings: Vec<Warning>,
    pub completeness: Completeness,
    pub balance: BalanceStatus,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Fetch `[start, end]` window by window, deduplicate, sort newest first and
/// reconstruct balances from `current_balance` when one is known.
///
/// A rejected session aborts with [`ReconError::SessionRejected`] before
/// any later window is requested.
pub fn run<S>(
    source: &mut S,
    start: NaiveDate,
    end: NaiveDate,
    current_balance: Option<i64>,
    options: &PipelineOptions,
) -> Result<Ledger, ReconError>
where
    S: TransactionSource + ?Sized,
{
    let windows = partition(start, end, options.window_days)?;

    let mut aggregator = Aggregator::new();
    let mut warnings = Vec::new();
    let mut truncated_windows = Vec::new();
    let mut failed_windows = Vec::new();
    let mut windows_fetched = 0;

    for window in windows {
        windows_fetched += 1;

        match fetch_with_retry(source, &window, options.retries) {
            Ok(records) => {
                log::debug!("{}: {} records", window, records.len());
                if records.len() >= options.record_cap {
                    let w = Warning::Truncated {
                        window,
                        count: records.len(),
                    };
                    log::warn!("{}", w);
                    warnings.push(w);
                    truncated_windows.push(window);
                }
                aggregator.ingest(&records);
            }
            Err(error) if error.kind == SourceErrorKind::Auth => {
                log::debug!("{}: {}, stopping", window, error);
                return Err(ReconError::SessionRejected {
                    window,
                    message: error.message,
                });
            }
            Err(error) => {
                let w = Warning::SourceFailed { window, error };
                log::warn!("{}", w);
                warnings.push(w);
                failed_windows.push(window);
            }
        }
    }

    let (mut transactions, stats) = aggregator.finish();

    if stats.missing_id > 0 {
        let w = Warning::MissingIdentifier {
            count: stats.missing_id,
        };
        log::warn!("{}", w);
        warnings.push(w);
    }
    if stats.malformed > 0 {
        let w = Warning::Malformed {
            count: stats.malformed,
        };
        log::warn!("{}", w);
        warnings.push(w);
    }

    // A dropped record is a gap: every older balance would miss its amount.
    let dropped_records = stats.missing_id + stats.malformed;
    let completeness =
        if truncated_windows.is_empty() && failed_windows.is_empty() && dropped_records == 0 {
            Completeness::Complete
        } else {
            Completeness::Incomplete {
                truncated_windows,
                failed_windows,
                dropped_records,
            }
        };

    let balance = match current_balance {
        None => BalanceStatus::Unavailable,
        Some(_) if options.require_complete && !completeness.is_complete() => {
            log::warn!("history is incomplete; balance reconstruction skipped");
            balance::clear(&mut transactions);
            BalanceStatus::Skipped
        }
        Some(current) => {
            if !completeness.is_complete() {
                log::warn!("history is incomplete; reconstructed balances may be wrong");
            }
            let opening = balance::reconstruct(current, &mut transactions)?;
            log::debug!(
                "balance {} now, {} before oldest record",
                format_amount(current),
                format_amount(opening)
            );
            BalanceStatus::Reconstructed { current, opening }
        }
    };

    Ok(Ledger {
        start,
        end,
        windows_fetched,
        transactions,
        stats,
        warnings,
        completeness,
        balance,
    })
}

fn fetch_with_retry<S>(
    source: &mut S,
    window: &QueryWindow,
    retries: u32,
) -> Result<Vec<RawRecord>, SourceError>
where
    S: TransactionSource + ?Sized,
{
    let mut attempt = 0;
    loop {
        match source.fetch(window) {
            Ok(records) => return Ok(records),
            Err(e) if e.kind == SourceErrorKind::Auth || attempt >= retries => return Err(e),
            Err(e) => {
                attempt += 1;
                log::warn!("{}: {} (retry {}/{})", window, e, attempt, retries);
            }
        }
    }
}
