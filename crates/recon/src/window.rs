//! Date-range partitioning into per-request query windows.
//!
//! The portal caps every reply at a fixed number of records and has no
//! pagination cursor, so a long range is split into short windows.
//! Windows are inclusive on both ends and consecutive windows share their
//! boundary day; records seen twice are removed downstream by identifier.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::error::ReconError;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_RECORD_CAP: usize = 100;

/// Inclusive `[start, end]` date pair for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl QueryWindow {
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// Lazy window sequence. Cloning restarts from the current position;
/// calling [`partition`] again restarts from the beginning.
#[derive(Debug, Clone)]
pub struct Windows {
    cursor: Option<NaiveDate>,
    end: NaiveDate,
    width: Duration,
}

/// Split `[start, end]` into windows at most `width_days` days wide.
pub fn partition(start: NaiveDate, end: NaiveDate, width_days: u32) -> Result<Windows, ReconError> {
    if start > end || width_days == 0 {
        return Err(ReconError::InvalidRange {
            start,
            end,
            width: width_days,
        });
    }

    Ok(Windows {
        cursor: Some(start),
        end,
        width: Duration::days(i64::from(width_days)),
    })
}

impl Iterator for Windows {
    type Item = QueryWindow;

    fn next(&mut self) -> Option<QueryWindow> {
        let start = self.cursor?;

        let window_end = match start.checked_add_signed(self.width) {
            Some(d) if d < self.end => d,
            _ => self.end,
        };

        // Degenerate range yields exactly one window; otherwise stop once
        // the cursor reaches the end.
        self.cursor = if window_end < self.end { Some(window_end) } else { None };

        Some(QueryWindow {
            start,
            end: window_end,
        })
    }
}

impl std::iter::FusedIterator for Windows {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn fourteen_days_two_windows() {
        let windows: Vec<_> = partition(d("2026-03-01"), d("2026-03-15"), 7).unwrap().collect();
        assert_eq!(
            windows,
            vec![
                QueryWindow { start: d("2026-03-01"), end: d("2026-03-08") },
                QueryWindow { start: d("2026-03-08"), end: d("2026-03-15") },
            ]
        );
    }

    #[test]
    fn short_tail_window() {
        let windows: Vec<_> = partition(d("2026-03-01"), d("2026-03-10"), 7).unwrap().collect();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1], QueryWindow { start: d("2026-03-08"), end: d("2026-03-10") });
    }

    #[test]
    fn degenerate_range_single_window() {
        let windows: Vec<_> = partition(d("2026-03-01"), d("2026-03-01"), 7).unwrap().collect();
        assert_eq!(windows, vec![QueryWindow { start: d("2026-03-01"), end: d("2026-03-01") }]);
    }

    #[test]
    fn rejects_reversed_range_and_zero_width() {
        assert!(partition(d("2026-03-02"), d("2026-03-01"), 7).is_err());
        assert!(partition(d("2026-03-01"), d("2026-03-02"), 0).is_err());
    }

    #[test]
    fn restartable() {
        let windows = partition(d("2026-01-01"), d("2026-02-01"), 7).unwrap();
        let first: Vec<_> = windows.clone().collect();
        let second: Vec<_> = windows.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    proptest! {
        #[test]
        fn windows_cover_range_without_gaps(offset in 0i64..3000, len in 0i64..400, width in 1u32..40) {
            let start = d("2020-01-01") + Duration::days(offset);
            let end = start + Duration::days(len);
            let windows: Vec<_> = partition(start, end, width).unwrap().collect();

            prop_assert!(!windows.is_empty());
            prop_assert_eq!(windows[0].start, start);
            prop_assert_eq!(windows[windows.len() - 1].end, end);
            for w in &windows {
                prop_assert!(w.start <= w.end);
                prop_assert!(w.span_days() <= i64::from(width));
            }
            for pair in windows.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
                prop_assert!(pair[0].start < pair[1].start);
            }
        }
    }
}
