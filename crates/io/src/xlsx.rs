// Excel export: one sheet for everything, one per category

use std::path::Path;

use cardtrail_recon::money::to_float;
use cardtrail_recon::report::{ReportRow, COLUMNS};
use cardtrail_recon::{Category, Transaction};
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook, Worksheet};

use crate::ExportError;

const ALL_SHEET: &str = "all";

/// Workbook creation date. Pinned so identical ledgers give identical files.
const CREATED: (u16, u8, u8) = (2000, 1, 1);

/// Export the full ledger. Returns the row count of the `all` sheet.
pub fn export(path: &Path, transactions: &[Transaction]) -> Result<usize, ExportError> {
    let rows: Vec<ReportRow> = transactions.iter().cloned().map(ReportRow::new).collect();

    let mut workbook = Workbook::new();

    let created = ExcelDateTime::from_ymd(CREATED.0, CREATED.1, CREATED.2)?;
    let properties = DocProperties::new()
        .set_title("cardtrail transactions")
        .set_creation_datetime(&created);
    workbook.set_properties(&properties);

    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");

    let all: Vec<&ReportRow> = rows.iter().collect();
    write_sheet(workbook.add_worksheet(), ALL_SHEET, &all, &header, &money)?;

    for category in Category::ALL {
        let subset: Vec<&ReportRow> = rows.iter().filter(|r| r.category == category).collect();
        write_sheet(workbook.add_worksheet(), category.as_str(), &subset, &header, &money)?;
    }

    workbook.save(path)?;
    log::debug!("wrote {} rows to {}", rows.len(), path.display());
    Ok(rows.len())
}

fn write_sheet(
    sheet: &mut Worksheet,
    name: &str,
    rows: &[&ReportRow],
    header: &Format,
    money: &Format,
) -> Result<(), ExportError> {
    sheet.set_name(name)?;

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        let t = &row.transaction;
        sheet.write_string(r, 0, &t.time_text)?;
        sheet.write_string(r, 1, &t.merchant)?;
        sheet.write_number_with_format(r, 2, to_float(t.amount_minor), money)?;
        sheet.write_string(r, 3, row.category.as_str())?;
        sheet.write_string(r, 4, &t.kind)?;
        sheet.write_string(r, 5, &t.journal_id)?;
        if let Some(balance) = t.balance_after {
            sheet.write_number_with_format(r, 6, to_float(balance), money)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use cardtrail_recon::model::parse_timestamp;

    fn txn(id: &str, merchant: &str, amount: i64, balance: Option<i64>) -> Transaction {
        Transaction {
            occurred_at: parse_timestamp("2026-03-01 12:00:00").unwrap(),
            time_text: "2026-03-01 12:00:00".into(),
            merchant: merchant.into(),
            amount_minor: amount,
            kind: "交易".into(),
            journal_id: id.into(),
            balance_after: balance,
        }
    }

    #[test]
    fn one_sheet_per_category_plus_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.xlsx");
        let txns = vec![
            txn("J3", "餐费补助", 3000, Some(20450)),
            txn("J2", "圈存机", 10000, Some(17450)),
            txn("J1", "第一食堂", -650, None),
        ];

        let written = export(&path, &txns).unwrap();
        assert_eq!(written, 3);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec!["all", "spend", "topup", "subsidy"]
        );

        let all = workbook.worksheet_range("all").unwrap();
        assert_eq!(all.height(), 4);
        assert_eq!(all.get_value((0, 6)), Some(&Data::String("balance_after".into())));
        assert_eq!(all.get_value((1, 2)), Some(&Data::Float(30.0)));
        assert_eq!(all.get_value((1, 6)), Some(&Data::Float(204.5)));

        let spend = workbook.worksheet_range("spend").unwrap();
        assert_eq!(spend.height(), 2);
        assert_eq!(spend.get_value((1, 5)), Some(&Data::String("J1".into())));

        let subsidy = workbook.worksheet_range("subsidy").unwrap();
        assert_eq!(subsidy.get_value((1, 3)), Some(&Data::String("subsidy".into())));
    }

    #[test]
    fn empty_ledger_writes_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        assert_eq!(export(&path, &[]).unwrap(), 0);

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let topup = workbook.worksheet_range("topup").unwrap();
        assert_eq!(topup.height(), 1);
    }
}
