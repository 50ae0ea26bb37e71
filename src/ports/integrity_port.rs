//! Integrity port trait: deletes and their cascades.

use crate::domain::cascade::CascadeReport;
use crate::domain::error::LedgerError;
use crate::domain::ids::{CurrencyId, PairId, UserId};
use crate::ports::ledger_port::TradeLedger;
use crate::ports::price_port::PriceHistory;
use crate::ports::registry_port::CurrencyRegistry;
use crate::ports::watchlist_port::WatchlistIndex;

pub trait Integrity {
    /// Removes the pair with all its bars, trades and watchlist entries as one
    /// atomic step.
    fn delete_pair(&self, pair: PairId) -> Result<CascadeReport, LedgerError>;

    /// Never cascades: fails with `ReferencedByPair` while any pair uses the currency.
    fn delete_currency(&self, currency: CurrencyId) -> Result<(), LedgerError>;

    /// Removes every trade and watchlist entry owned by the user.
    fn delete_user(&self, user: &UserId) -> Result<CascadeReport, LedgerError>;
}

/// The full storage engine surface.
pub trait LedgerStore:
    CurrencyRegistry + PriceHistory + TradeLedger + WatchlistIndex + Integrity + Send + Sync
{
}

impl<T> LedgerStore for T where
    T: CurrencyRegistry + PriceHistory + TradeLedger + WatchlistIndex + Integrity + Send + Sync
{
}
