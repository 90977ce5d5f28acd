// Diagnostics on stderr via tracing-subscriber.
//
// The library crates log through the `log` facade; the subscriber's
// log bridge picks those records up. Stdout stays clean for the table.

use tracing_subscriber::EnvFilter;

/// Overrides `--quiet`/`--verbose` with a full filter directive.
pub const LOG_ENV: &str = "CARDTRAIL_LOG";

/// `--quiet` wins over `--verbose`.
pub fn level_for(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Only this workspace's targets are shown unless `directive` says otherwise;
/// transport crates stay muted.
pub fn filter_for(directive: Option<&str>, quiet: bool, verbose: bool) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(format!("off,cardtrail={}", level_for(quiet, verbose))))
}

pub fn init(quiet: bool, verbose: bool) {
    let directive = std::env::var(LOG_ENV).ok();
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter_for(directive.as_deref(), quiet, verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
    if let Err(e) = result {
        eprintln!("warning: logging unavailable: {}", e);
    }
}
