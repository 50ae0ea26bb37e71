//! Per-user watchlist entries.

use crate::domain::ids::{PairId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub user: UserId,
    pub pair: PairId,
    pub created_at: DateTime<Utc>,
}
