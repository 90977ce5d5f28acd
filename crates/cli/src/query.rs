//! `cardtrail query`: fetch, reconcile, display, export.

use std::path::PathBuf;

use chrono::{Days, Local, NaiveDate};
use clap::Args;

use cardtrail_config::Settings;
use cardtrail_io::csv::CsvOptions;
use cardtrail_recon::engine::BalanceStatus;
use cardtrail_recon::money::{format_amount, parse_amount};
use cardtrail_recon::{
    run, CategoryFilter, Completeness, Ledger, PipelineOptions, ReconError, Report,
};

use crate::exit_codes;
use crate::fetch::{credentials, CredentialFlags, PortalClient};
use crate::util::{pad_left, pad_right};
use crate::CliError;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Start date inclusive (YYYY-MM-DD). Wins over --days
    #[arg(long)]
    pub start: Option<String>,

    /// End date inclusive (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub end: Option<String>,

    /// Look back this many days from --end (default: 60)
    #[arg(long)]
    pub days: Option<u32>,

    /// all, spend, topup or subsidy (also 消费, 充值, 补助)
    #[arg(long, short = 'c', default_value = "all")]
    pub category: String,

    /// Current balance in yuan; skips the balance page lookup
    #[arg(long)]
    pub balance: Option<String>,

    /// Export file: .xlsx writes a workbook, anything else CSV
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Days per portal query window (default: 7)
    #[arg(long)]
    pub window_days: Option<u32>,

    /// Extra attempts for a failed window (default: 0)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Leave balances empty unless every window came back whole
    #[arg(long)]
    pub require_complete: bool,

    /// Write the CSV without the UTF-8 BOM Excel needs for CJK text
    #[arg(long)]
    pub no_bom: bool,
}

/// Resolve the inclusive date range. `end` defaults to `today`; an explicit
/// `start` wins over `days`.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    days: u32,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), CliError> {
    let end_date = match end {
        Some(s) => parse_date("--end", s)?,
        None => today,
    };
    let start_date = match start {
        Some(s) => parse_date("--start", s)?,
        None => end_date
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| CliError::args(format!("--days {} reaches before year 1", days)))?,
    };

    if start_date > end_date {
        return Err(CliError::args(format!(
            "--start ({}) must not be after --end ({})",
            start_date, end_date,
        )));
    }
    Ok((start_date, end_date))
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::args(format!("invalid {} date {:?}: {}", flag, value, e)))
}

pub fn cmd_query(
    args: QueryArgs,
    flags: &CredentialFlags,
    settings: &Settings,
) -> Result<(), CliError> {
    let today = Local::now().date_naive();
    let (start, end) = resolve_range(
        args.start.as_deref(),
        args.end.as_deref(),
        args.days.unwrap_or(settings.query.default_days),
        today,
    )?;

    let filter: CategoryFilter = args
        .category
        .parse()
        .map_err(|e: String| CliError::args(e).with_hint("use all, spend, topup or subsidy"))?;

    let balance_override = args
        .balance
        .as_deref()
        .map(|s| {
            parse_amount(s).map_err(|e| CliError::args(format!("invalid --balance {:?}: {}", s, e)))
        })
        .transpose()?;

    let options = PipelineOptions {
        window_days: args.window_days.unwrap_or(settings.query.window_days),
        record_cap: settings.query.record_cap,
        retries: args.retries.unwrap_or(settings.query.retries),
        require_complete: args.require_complete,
    };
    if options.window_days == 0 {
        return Err(CliError::args("--window-days must be at least 1"));
    }

    let creds = credentials::resolve(flags, settings, |key| std::env::var(key).ok())?;
    log::debug!("credentials from {}", creds.source);

    let mut portal = PortalClient::new(settings.portal_url(), creds.session, settings.portal.timeout_secs)?;

    let current_balance = match balance_override {
        Some(b) => Some(b),
        None => portal.current_balance()?,
    };

    log::info!(
        "querying {} ~ {} in {}-day windows...",
        start,
        end,
        options.window_days
    );
    let ledger = run(&mut portal, start, end, current_balance, &options).map_err(recon_error)?;

    check_fatal_failures(&ledger)?;

    let report = Report::build(&ledger.transactions, filter);
    print!("{}", render(&ledger, &report));

    if let Some(path) = &args.output {
        let written = cardtrail_io::export(
            path,
            &report,
            &ledger.transactions,
            &CsvOptions { bom: !args.no_bom },
        )
        .map_err(|e| CliError {
            code: exit_codes::EXIT_EXPORT,
            message: format!("export failed: {}", e),
            hint: None,
        })?;
        log::info!("wrote {} rows to {}", written, path.display());
    }

    Ok(())
}

fn recon_error(e: ReconError) -> CliError {
    match e {
        ReconError::InvalidRange { .. } => CliError::args(e.to_string()),
        ReconError::SessionRejected { .. } => CliError {
            code: exit_codes::EXIT_IDENTITY_INVALID,
            message: e.to_string(),
            hint: Some("capture fresh credentials and update the gist or CARD_* variables".into()),
        },
        _ => CliError {
            code: exit_codes::EXIT_ERROR,
            message: e.to_string(),
            hint: None,
        },
    }
}

/// A range where no window could be fetched at all is an upstream failure.
fn check_fatal_failures(ledger: &Ledger) -> Result<(), CliError> {
    if let Completeness::Incomplete { failed_windows, .. } = &ledger.completeness {
        if ledger.windows_fetched > 0 && failed_windows.len() == ledger.windows_fetched {
            return Err(CliError {
                code: exit_codes::EXIT_UPSTREAM,
                message: format!("all {} query windows failed", ledger.windows_fetched),
                hint: Some("check network access to the portal, or retry with --retries".into()),
            });
        }
    }
    Ok(())
}

// ── Output ──────────────────────────────────────────────────────────

const TIME_W: usize = 19;
const MERCHANT_W: usize = 20;
const AMOUNT_W: usize = 10;
const CATEGORY_W: usize = 8;
const TYPE_W: usize = 10;
const BALANCE_W: usize = 10;

/// Table, totals, balance and completeness notes for stdout.
pub fn render(ledger: &Ledger, report: &Report) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{} ~ {}: {} of {} records (filter: {})\n",
        ledger.start,
        ledger.end,
        report.rows.len(),
        report.total_records,
        report.filter,
    ));

    if report.rows.is_empty() {
        out.push_str("no transactions\n");
    } else {
        let header = [
            pad_right("time", TIME_W),
            pad_right("merchant", MERCHANT_W),
            pad_left("amount", AMOUNT_W),
            pad_right("category", CATEGORY_W),
            pad_right("type", TYPE_W),
            pad_left("balance", BALANCE_W),
        ]
        .join("  ");
        out.push_str(header.trim_end());
        out.push('\n');
        out.push_str(&"-".repeat(TIME_W + MERCHANT_W + AMOUNT_W + CATEGORY_W + TYPE_W + BALANCE_W + 10));
        out.push('\n');

        for row in &report.rows {
            let t = &row.transaction;
            let line = [
                pad_right(&t.time_text, TIME_W),
                pad_right(&t.merchant, MERCHANT_W),
                pad_left(&format_amount(t.amount_minor), AMOUNT_W),
                pad_right(row.category.as_str(), CATEGORY_W),
                pad_right(&t.kind, TYPE_W),
                pad_left(
                    &t.balance_after.map(format_amount).unwrap_or_default(),
                    BALANCE_W,
                ),
            ]
            .join("  ");
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    out.push('\n');
    let totals: Vec<String> = report
        .visible_categories()
        .iter()
        .map(|c| format!("{} {}", c, format_amount(report.total(*c))))
        .collect();
    out.push_str(&format!("totals:  {}\n", totals.join("  ")));
    if let Some(net) = report.net() {
        out.push_str(&format!("net:     {}\n", format_amount(net)));
    }

    match &ledger.balance {
        BalanceStatus::Reconstructed { current, opening } => out.push_str(&format!(
            "balance: {} now, {} before oldest record\n",
            format_amount(*current),
            format_amount(*opening)
        )),
        BalanceStatus::Unavailable => out.push_str("balance: unavailable\n"),
        BalanceStatus::Skipped => {
            out.push_str("balance: not reconstructed (history incomplete)\n")
        }
    }

    if let Completeness::Incomplete {
        truncated_windows,
        failed_windows,
        dropped_records,
    } = &ledger.completeness
    {
        out.push_str(&format!(
            "history: INCOMPLETE ({} truncated, {} failed window(s), {} dropped record(s)); balances may be wrong\n",
            truncated_windows.len(),
            failed_windows.len(),
            dropped_records
        ));
    }

    out
}
