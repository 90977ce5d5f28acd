// Export writers for query results

pub mod csv;
pub mod xlsx;

use std::path::Path;

use cardtrail_recon::report::Report;
use cardtrail_recon::Transaction;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot create {path}: {source}")]
    Create {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV write error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// Output format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One sheet per category plus `all`, from the unfiltered ledger.
    Xlsx,
    /// Filtered rows only.
    Csv,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => Self::Xlsx,
            _ => Self::Csv,
        }
    }
}

/// Write `report` (CSV) or `transactions` (xlsx) to `path`.
/// Returns the number of data rows written.
pub fn export(
    path: &Path,
    report: &Report,
    transactions: &[Transaction],
    csv_options: &csv::CsvOptions,
) -> Result<usize, ExportError> {
    match ExportFormat::from_path(path) {
        ExportFormat::Xlsx => xlsx::export(path, transactions),
        ExportFormat::Csv => csv::export(path, &report.rows, csv_options),
    }
}
