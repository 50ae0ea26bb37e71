//! OHLC price bars.

use crate::domain::error::LedgerError;
use crate::domain::ids::{BarId, PairId};
use crate::domain::price::Price;
use chrono::{DateTime, SubsecRound, Utc};
use std::fmt;

/// Open/high/low/close levels that already satisfy `low <= open,close <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ohlc {
    open: Price,
    high: Price,
    low: Price,
    close: Price,
}

impl Ohlc {
    pub fn new(open: Price, high: Price, low: Price, close: Price) -> Result<Self, LedgerError> {
        let body_low = open.min(close);
        let body_high = open.max(close);
        if low > body_low {
            return Err(LedgerError::InvalidRange {
                reason: format!("low {low} is above min(open, close) {body_low}"),
            });
        }
        if high < body_high {
            return Err(LedgerError::InvalidRange {
                reason: format!("high {high} is below max(open, close) {body_high}"),
            });
        }
        Ok(Self {
            open,
            high,
            low,
            close,
        })
    }

    pub fn open(&self) -> Price {
        self.open
    }

    pub fn high(&self) -> Price {
        self.high
    }

    pub fn low(&self) -> Price {
        self.low
    }

    pub fn close(&self) -> Price {
        self.close
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBar {
    pub id: BarId,
    pub pair: PairId,
    /// Symbol of the owning pair, fixed for the pair's lifetime.
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub ohlc: Ohlc,
}

impl fmt::Display for PriceBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.symbol, self.timestamp.to_rfc3339())
    }
}

impl PriceBar {
    /// high - low
    pub fn spread(&self) -> rust_decimal::Decimal {
        self.ohlc.high().value() - self.ohlc.low().value()
    }
}

/// Truncates an instant to microsecond precision, the resolution every store keys bars on.
pub fn normalize_instant(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}
