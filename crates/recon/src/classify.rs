use crate::model::{Category, Transaction};

/// Substring the portal uses for subsidy payments in merchant or type.
pub const SUBSIDY_MARKER: &str = "补助";

/// Classify a transaction. The subsidy check runs before the sign check:
/// subsidies are credits and would otherwise read as top-ups.
pub fn classify(txn: &Transaction) -> Category {
    if txn.merchant.contains(SUBSIDY_MARKER) || txn.kind.contains(SUBSIDY_MARKER) {
        Category::Subsidy
    } else if txn.amount_minor > 0 {
        Category::Topup
    } else {
        Category::Spend
    }
}
