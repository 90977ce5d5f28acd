// cardtrail - campus card transaction retrieval and reconciliation

mod exit_codes;
mod fetch;
mod logging;
mod query;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use cardtrail_config::Settings;
use cardtrail_recon::money::{format_amount, parse_amount};

use exit_codes::{EXIT_CONFIG, EXIT_SUCCESS, EXIT_USAGE};
use fetch::{credentials, CredentialFlags, PortalClient};

#[derive(Parser)]
#[command(name = "cardtrail")]
#[command(about = "Campus card transaction history with reconstructed balances")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file (default: ~/.config/cardtrail/config.toml)
    #[arg(long, global = true, env = "CARDTRAIL_CONFIG")]
    config: Option<PathBuf>,

    /// Portal session cookie (JSESSIONID)
    #[arg(long, global = true)]
    jsessionid: Option<String>,

    /// Portal identity token (openid)
    #[arg(long, global = true)]
    openid: Option<String>,

    /// Errors only on stderr
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Per-window debug output on stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch transactions, reconstruct balances and summarize by category
    #[command(after_help = "\
Examples:
  cardtrail query
  cardtrail query --days 30 --category spend
  cardtrail query --start 2026-03-01 --end 2026-03-15 --output march.xlsx
  cardtrail query --days 14 --balance 204.50 --output spend.csv --no-bom
  cardtrail query --days 90 --window-days 5 --retries 2 --require-complete")]
    Query(query::QueryArgs),

    /// Print the current balance; exit 60 when below the threshold
    #[command(after_help = "\
Examples:
  cardtrail balance
  cardtrail balance --min-balance 50
  cardtrail balance --quiet || notify-send 'card balance low'")]
    Balance {
        /// Threshold in yuan (default: [balance] min_balance, 20.00)
        #[arg(long)]
        min_balance: Option<String>,
    },

    /// Show which credential source is used, with masked tokens
    Credentials,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    // A .env beside the invocation may carry CARD_* or gist settings.
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.global.quiet, cli.global.verbose);

    let result = load_settings(cli.global.config.as_deref()).and_then(|settings| {
        let flags = CredentialFlags {
            jsessionid: cli.global.jsessionid.clone(),
            openid: cli.global.openid.clone(),
        };
        match cli.command {
            Commands::Query(args) => query::cmd_query(args, &flags, &settings),
            Commands::Balance { min_balance } => cmd_balance(min_balance, &flags, &settings),
            Commands::Credentials => cmd_credentials(&flags, &settings),
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings, CliError> {
    let path = path.map(PathBuf::from).unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&path).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: e.to_string(),
        hint: Some("fix or remove the file; defaults apply when it is absent".into()),
    })?;
    Ok(settings.with_env(|key| std::env::var(key).ok()))
}

// ============================================================================
// balance
// ============================================================================

fn cmd_balance(
    min_balance: Option<String>,
    flags: &CredentialFlags,
    settings: &Settings,
) -> Result<(), CliError> {
    let threshold_text = min_balance.unwrap_or_else(|| settings.balance.min_balance.clone());
    let threshold = parse_amount(&threshold_text).map_err(|e| {
        CliError::args(format!("invalid minimum balance {:?}: {}", threshold_text, e))
    })?;

    let creds = credentials::resolve(flags, settings, |key| std::env::var(key).ok())?;
    let portal = PortalClient::new(settings.portal_url(), creds.session, settings.portal.timeout_secs)?;

    let balance = portal.current_balance()?.ok_or_else(|| CliError {
        code: exit_codes::EXIT_UPSTREAM,
        message: "could not read the balance from the portal".into(),
        hint: Some("run with --verbose for details".into()),
    })?;

    println!("balance: {}", format_amount(balance));

    if balance < threshold {
        return Err(CliError {
            code: exit_codes::EXIT_BALANCE_LOW,
            message: format!(
                "balance {} is below {}",
                format_amount(balance),
                format_amount(threshold)
            ),
            hint: Some("top up the card".into()),
        });
    }
    Ok(())
}

// ============================================================================
// credentials
// ============================================================================

fn cmd_credentials(flags: &CredentialFlags, settings: &Settings) -> Result<(), CliError> {
    let creds = credentials::resolve(flags, settings, |key| std::env::var(key).ok())?;
    for line in credentials::describe(&creds) {
        println!("{}", line);
    }
    Ok(())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
