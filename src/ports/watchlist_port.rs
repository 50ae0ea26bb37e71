//! Watchlist index port trait.

use crate::domain::error::LedgerError;
use crate::domain::ids::{PairId, UserId};
use crate::domain::watchlist::WatchlistEntry;
use std::collections::BTreeSet;

pub trait WatchlistIndex {
    /// Fails with `AlreadyExists` rather than silently ignoring a repeat add.
    fn watch(&self, user: &UserId, pair: PairId) -> Result<(), LedgerError>;

    fn unwatch(&self, user: &UserId, pair: PairId) -> Result<(), LedgerError>;

    fn watched_pairs(&self, user: &UserId) -> Result<BTreeSet<PairId>, LedgerError>;

    /// Oldest first by `created_at`.
    fn watchlist_entries(&self, user: &UserId) -> Result<Vec<WatchlistEntry>, LedgerError>;

    fn is_watching(&self, user: &UserId, pair: PairId) -> Result<bool, LedgerError> {
        Ok(self.watched_pairs(user)?.contains(&pair))
    }
}
