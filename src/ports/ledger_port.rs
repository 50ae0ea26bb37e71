//! Trade ledger port trait.

use crate::domain::error::LedgerError;
use crate::domain::ids::{PairId, TradeId, UserId};
use crate::domain::price::Price;
use crate::domain::trade::{OpenTrade, StatusFilter, Trade};
use chrono::{DateTime, Utc};

pub trait TradeLedger {
    /// Fails with `InvalidLevels` on inconsistent stop/take-profit levels and
    /// `NotFound` for an unknown pair.
    fn open_trade(&self, request: OpenTrade) -> Result<TradeId, LedgerError>;

    /// Open -> Closed. A closed trade is terminal: every later call fails with
    /// `AlreadyClosed`. `closed_at` defaults to the store clock.
    fn close_trade(
        &self,
        id: TradeId,
        exit_price: Price,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError>;

    fn trade(&self, id: TradeId) -> Result<Option<Trade>, LedgerError>;

    /// Newest first by `opened_at`.
    fn trades_for_user(
        &self,
        user: &UserId,
        filter: StatusFilter,
    ) -> Result<Vec<Trade>, LedgerError>;

    /// Newest first by `opened_at`. Like every pair-keyed read, fails with
    /// `NotFound` for an unknown pair rather than returning an empty list.
    fn trades_for_pair(&self, pair: PairId) -> Result<Vec<Trade>, LedgerError>;

    /// Trades on the pair that are still open. `NotFound` for an unknown pair.
    fn open_trade_count(&self, pair: PairId) -> Result<usize, LedgerError>;
}
