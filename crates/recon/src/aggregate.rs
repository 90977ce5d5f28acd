use std::collections::HashSet;

use serde::Serialize;

use crate::model::{RawRecord, Transaction};

/// Counters describing what happened to every received record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub received: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub missing_id: usize,
    pub malformed: usize,
}

/// Accumulates records window by window, keeping the first occurrence of
/// each journal id.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashSet<String>,
    records: Vec<Transaction>,
    stats: AggregateStats,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one window's records in fetch order.
    pub fn ingest(&mut self, raws: &[RawRecord]) {
        for raw in raws {
            self.stats.received += 1;

            let Some(id) = raw.unique_id() else {
                self.stats.missing_id += 1;
                continue;
            };
            if self.seen.contains(id) {
                self.stats.duplicates += 1;
                continue;
            }

            match Transaction::from_raw(raw) {
                Ok(txn) => {
                    self.seen.insert(txn.journal_id.clone());
                    self.records.push(txn);
                    self.stats.accepted += 1;
                }
                Err(e) => {
                    log::debug!("skipping record: {}", e);
                    self.stats.malformed += 1;
                }
            }
        }
    }

    /// Sort newest first. `sort_by` is stable, so equal timestamps keep
    /// fetch order.
    pub fn finish(self) -> (Vec<Transaction>, AggregateStats) {
        let mut records = self.records;
        records.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        (records, self.stats)
    }
}
