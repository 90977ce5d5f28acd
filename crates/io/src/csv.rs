// CSV export of report rows

use std::io::Write;
use std::path::Path;

use cardtrail_recon::report::{ReportRow, COLUMNS};

use crate::ExportError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Prefix a UTF-8 BOM so Excel detects the encoding of CJK text.
    pub bom: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { bom: true }
    }
}

/// Write header + rows. The header is written even with zero rows.
pub fn write<W: Write>(mut writer: W, rows: &[ReportRow], options: &CsvOptions) -> Result<(), ExportError> {
    if options.bom {
        writer.write_all(UTF8_BOM)?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    csv_writer.write_record(COLUMNS)?;
    for row in rows {
        csv_writer.write_record(row.cells())?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export(path: &Path, rows: &[ReportRow], options: &CsvOptions) -> Result<usize, ExportError> {
    let file = std::fs::File::create(path).map_err(|source| ExportError::Create {
        path: path.display().to_string(),
        source,
    })?;
    write(std::io::BufWriter::new(file), rows, options)?;
    log::debug!("wrote {} CSV rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardtrail_recon::model::parse_timestamp;
    use cardtrail_recon::Transaction;

    fn row(id: &str, merchant: &str, amount: i64, balance: Option<i64>) -> ReportRow {
        ReportRow::new(Transaction {
            occurred_at: parse_timestamp("2026-03-01 12:00:00").unwrap(),
            time_text: "2026-03-01 12:00:00".into(),
            merchant: merchant.into(),
            amount_minor: amount,
            kind: "消费".into(),
            journal_id: id.into(),
            balance_after: balance,
        })
    }

    #[test]
    fn header_and_rows() {
        let mut buf = Vec::new();
        write(
            &mut buf,
            &[row("J1", "第一食堂", -650, Some(20450)), row("J2", "Shop, Inc", 10000, None)],
            &CsvOptions { bom: false },
        )
        .unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "time,merchant,amount,category,type,journal_id,balance_after\n\
             2026-03-01 12:00:00,第一食堂,-6.50,spend,消费,J1,204.50\n\
             2026-03-01 12:00:00,\"Shop, Inc\",100.00,topup,消费,J2,\n"
        );
    }

    #[test]
    fn empty_still_has_header() {
        let mut buf = Vec::new();
        write(&mut buf, &[], &CsvOptions { bom: false }).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "time,merchant,amount,category,type,journal_id,balance_after\n"
        );
    }

    #[test]
    fn bom_by_default() {
        let mut buf = Vec::new();
        write(&mut buf, &[], &CsvOptions::default()).unwrap();
        assert!(buf.starts_with(UTF8_BOM));
        assert_eq!(&buf[3..8], b"time,");
    }

    #[test]
    fn export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.csv");
        let err = export(&path, &[], &CsvOptions::default()).unwrap_err();
        assert!(err.to_string().starts_with("cannot create"));
    }
}
