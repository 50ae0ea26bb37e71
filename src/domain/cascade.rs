//! Outcome of cascade deletes.

use std::fmt;

/// Counts of dependent records removed by a cascade delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub bars: usize,
    pub trades: usize,
    pub watchlist_entries: usize,
}

impl CascadeReport {
    pub fn total(&self) -> usize {
        self.bars + self.trades + self.watchlist_entries
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bar(s), {} trade(s), {} watchlist entr{}",
            self.bars,
            self.trades,
            self.watchlist_entries,
            if self.watchlist_entries == 1 { "y" } else { "ies" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_and_display() {
        let report = CascadeReport {
            bars: 3,
            trades: 2,
            watchlist_entries: 1,
        };
        assert_eq!(report.total(), 6);
        assert!(!report.is_empty());
        assert_eq!(report.to_string(), "3 bar(s), 2 trade(s), 1 watchlist entry");
        assert!(CascadeReport::default().is_empty());
    }
}
