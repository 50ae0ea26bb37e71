//! Time-series store port trait.

use crate::domain::bar::{Ohlc, PriceBar};
use crate::domain::error::LedgerError;
use crate::domain::ids::{BarId, PairId};
use crate::domain::price::Price;
use chrono::{DateTime, Utc};

pub trait PriceHistory {
    /// Appends one bar. Timestamps are truncated to microseconds before the
    /// uniqueness check. Fails with `NotFound` for an unknown pair and
    /// `DuplicateTimestamp` if the pair already has a bar at that instant.
    fn append_bar(
        &self,
        pair: PairId,
        timestamp: DateTime<Utc>,
        ohlc: Ohlc,
    ) -> Result<BarId, LedgerError>;

    /// Bars with `from <= timestamp <= to`, newest first.
    fn query_range(
        &self,
        pair: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, LedgerError>;

    fn latest_bar(&self, pair: PairId) -> Result<Option<PriceBar>, LedgerError>;

    /// First and last timestamp plus bar count, or `None` when the pair has no bars.
    fn data_range(
        &self,
        pair: PairId,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, LedgerError>;

    /// Validates the raw levels (`InvalidRange`) before touching the store.
    fn append_ohlc(
        &self,
        pair: PairId,
        timestamp: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
    ) -> Result<BarId, LedgerError> {
        let ohlc = Ohlc::new(open, high, low, close)?;
        self.append_bar(pair, timestamp, ohlc)
    }
}
