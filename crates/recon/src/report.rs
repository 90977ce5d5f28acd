use std::collections::BTreeMap;

use crate::model::{Category, CategoryFilter, Transaction};
use crate::money::format_amount;

/// Export/display column order.
pub const COLUMNS: [&str; 7] = [
    "time",
    "merchant",
    "amount",
    "category",
    "type",
    "journal_id",
    "balance_after",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub category: Category,
    pub transaction: Transaction,
}

impl ReportRow {
    pub fn new(transaction: Transaction) -> Self {
        Self {
            category: transaction.category(),
            transaction,
        }
    }

    /// Text cells in [`COLUMNS`] order. Missing balance is empty.
    pub fn cells(&self) -> [String; 7] {
        let t = &self.transaction;
        [
            t.time_text.clone(),
            t.merchant.clone(),
            format_amount(t.amount_minor),
            self.category.to_string(),
            t.kind.clone(),
            t.journal_id.clone(),
            t.balance_after.map(format_amount).unwrap_or_default(),
        ]
    }
}

/// Filtered rows plus per-category sums over the filtered rows.
#[derive(Debug, Clone)]
pub struct Report {
    pub filter: CategoryFilter,
    pub rows: Vec<ReportRow>,
    /// Always holds all three categories; filtered-out ones sum to zero.
    pub totals: BTreeMap<Category, i64>,
    /// Number of records before filtering.
    pub total_records: usize,
}

impl Report {
    pub fn build(transactions: &[Transaction], filter: CategoryFilter) -> Self {
        let mut totals: BTreeMap<Category, i64> =
            Category::ALL.iter().map(|c| (*c, 0)).collect();

        let rows: Vec<ReportRow> = transactions
            .iter()
            .cloned()
            .map(ReportRow::new)
            .filter(|row| filter.matches(row.category))
            .collect();

        for row in &rows {
            *totals.entry(row.category).or_insert(0) += row.transaction.amount_minor;
        }

        Self {
            filter,
            rows,
            totals,
            total_records: transactions.len(),
        }
    }

    pub fn total(&self, category: Category) -> i64 {
        self.totals.get(&category).copied().unwrap_or(0)
    }

    /// Net flow across all categories. Only meaningful for the `all`
    /// filter; `None` otherwise.
    pub fn net(&self) -> Option<i64> {
        if self.filter == CategoryFilter::All {
            Some(self.totals.values().sum())
        } else {
            None
        }
    }

    /// Categories whose totals should be shown for the active filter.
    pub fn visible_categories(&self) -> Vec<Category> {
        Category::ALL
            .iter()
            .copied()
            .filter(|c| self.filter.matches(*c))
            .collect()
    }
}
