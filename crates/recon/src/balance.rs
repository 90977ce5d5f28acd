//! Backward balance reconstruction.
//!
//! The portal only reports the balance as of now. Walking the history
//! newest first, each transaction's balance-after is the running value,
//! and subtracting its amount yields the balance after the next older one.
//! A missing transaction corrupts every balance older than the gap; the
//! caller decides whether to run on incomplete history (see
//! [`crate::engine::Completeness`]).

use crate::error::ReconError;
use crate::model::Transaction;

/// Annotate `transactions` (newest first) with balance-after values.
/// Returns the reconstructed balance before the oldest transaction.
pub fn reconstruct(current_minor: i64, transactions: &mut [Transaction]) -> Result<i64, ReconError> {
    if let Some(index) = transactions
        .windows(2)
        .position(|pair| pair[0].occurred_at < pair[1].occurred_at)
    {
        return Err(ReconError::Unordered { index: index + 1 });
    }

    let mut running = current_minor;
    for txn in transactions.iter_mut() {
        txn.balance_after = Some(running);
        running -= txn.amount_minor;
    }
    Ok(running)
}

/// Clear any balance-after values, used when reconstruction is skipped.
pub fn clear(transactions: &mut [Transaction]) {
    for txn in transactions.iter_mut() {
        txn.balance_after = None;
    }
}
