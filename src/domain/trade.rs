//! Trade lifecycle: Open -> Closed.

use crate::domain::error::LedgerError;
use crate::domain::ids::{PairId, TradeId, UserId};
use crate::domain::price::Price;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(LedgerError::invalid_field(
                "trade_type",
                format!("expected buy or sell, got {other:?}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Filter for trade listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Closed,
}

impl StatusFilter {
    pub fn matches(&self, trade: &Trade) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Open => trade.status() == TradeStatus::Open,
            StatusFilter::Closed => trade.status() == TradeStatus::Closed,
        }
    }
}

/// Parameters for opening a trade. `opened_at` falls back to the store clock.
#[derive(Debug, Clone)]
pub struct OpenTrade {
    pub user: UserId,
    pub pair: PairId,
    pub trade_type: TradeType,
    pub entry_price: Price,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub opened_at: Option<DateTime<Utc>>,
}

impl OpenTrade {
    pub fn new(user: UserId, pair: PairId, trade_type: TradeType, entry_price: Price) -> Self {
        Self {
            user,
            pair,
            trade_type,
            entry_price,
            stop_loss: None,
            take_profit: None,
            opened_at: None,
        }
    }

    pub fn with_stop_loss(mut self, stop_loss: Price) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: Price) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn opened_at(mut self, at: DateTime<Utc>) -> Self {
        self.opened_at = Some(at);
        self
    }
}

/// Checks that stop-loss and take-profit sit on the correct side of the entry.
///
/// Buy: `stop_loss < entry < take_profit`. Sell: `take_profit < entry < stop_loss`.
pub fn validate_levels(
    trade_type: TradeType,
    entry: Price,
    stop_loss: Option<Price>,
    take_profit: Option<Price>,
) -> Result<(), LedgerError> {
    let (sl_ok, tp_ok) = match trade_type {
        TradeType::Buy => (
            stop_loss.is_none_or(|sl| sl < entry),
            take_profit.is_none_or(|tp| tp > entry),
        ),
        TradeType::Sell => (
            stop_loss.is_none_or(|sl| sl > entry),
            take_profit.is_none_or(|tp| tp < entry),
        ),
    };
    let side = match trade_type {
        TradeType::Buy => ("below", "above"),
        TradeType::Sell => ("above", "below"),
    };
    if !sl_ok {
        return Err(LedgerError::InvalidLevels {
            reason: format!(
                "{trade_type} stop loss must be {} entry {entry}",
                side.0
            ),
        });
    }
    if !tp_ok {
        return Err(LedgerError::InvalidLevels {
            reason: format!(
                "{trade_type} take profit must be {} entry {entry}",
                side.1
            ),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub id: TradeId,
    pub user: UserId,
    pub pair: PairId,
    pub trade_type: TradeType,
    pub entry_price: Price,
    pub exit_price: Option<Price>,
    pub stop_loss: Option<Price>,
    pub take_profit: Option<Price>,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Builds a new open trade. Levels are validated; `opened_at` must already be resolved.
    pub fn open(request: OpenTrade, opened_at: DateTime<Utc>) -> Result<Self, LedgerError> {
        validate_levels(
            request.trade_type,
            request.entry_price,
            request.stop_loss,
            request.take_profit,
        )?;
        Ok(Self {
            id: TradeId::new(),
            user: request.user,
            pair: request.pair,
            trade_type: request.trade_type,
            entry_price: request.entry_price,
            exit_price: None,
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            opened_at,
            closed_at: None,
        })
    }

    pub fn status(&self) -> TradeStatus {
        match self.closed_at {
            Some(_) => TradeStatus::Closed,
            None => TradeStatus::Open,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status() == TradeStatus::Closed
    }

    /// Checks whether this trade may be closed at `closed_at`, without mutating it.
    pub fn check_close(&self, closed_at: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.is_closed() {
            return Err(LedgerError::AlreadyClosed {
                trade: self.id.to_string(),
            });
        }
        if closed_at < self.opened_at {
            return Err(LedgerError::InvalidTimestamp {
                reason: format!(
                    "close time {} precedes open time {}",
                    closed_at.to_rfc3339(),
                    self.opened_at.to_rfc3339()
                ),
            });
        }
        Ok(())
    }

    /// Open -> Closed. Sets exit price and close time together or not at all.
    pub fn close(&mut self, exit_price: Price, closed_at: DateTime<Utc>) -> Result<(), LedgerError> {
        self.check_close(closed_at)?;
        self.exit_price = Some(exit_price);
        self.closed_at = Some(closed_at);
        Ok(())
    }

    /// Realised price movement in the trade's favour; `None` while open.
    pub fn realized_move(&self) -> Option<Decimal> {
        let exit = self.exit_price?.value();
        let entry = self.entry_price.value();
        Some(match self.trade_type {
            TradeType::Buy => exit - entry,
            TradeType::Sell => entry - exit,
        })
    }

    /// Realised movement expressed in pips of `pip_size`.
    pub fn realized_pips(&self, pip_size: Decimal) -> Option<Decimal> {
        if pip_size.is_zero() {
            return None;
        }
        self.realized_move().map(|m| m / pip_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn p(s: &str) -> Price {
        s.parse().unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn buy(entry: &str) -> Trade {
        let req = OpenTrade::new(
            UserId::new("user1").unwrap(),
            PairId::new(),
            TradeType::Buy,
            p(entry),
        );
        Trade::open(req, t0()).unwrap()
    }

    #[test]
    fn trade_type_round_trips_text() {
        assert_eq!("BUY".parse::<TradeType>().unwrap(), TradeType::Buy);
        assert_eq!(TradeType::Sell.to_string(), "sell");
        assert!("hold".parse::<TradeType>().is_err());
    }

    #[test]
    fn new_trade_is_open() {
        let trade = buy("1.1000");
        assert_eq!(trade.status(), TradeStatus::Open);
        assert!(trade.exit_price.is_none());
        assert!(trade.realized_move().is_none());
    }

    #[test]
    fn close_sets_exit_and_time() {
        let mut trade = buy("1.1000");
        let at = t0() + Duration::hours(2);
        trade.close(p("1.1050"), at).unwrap();
        assert!(trade.is_closed());
        assert_eq!(trade.exit_price, Some(p("1.1050")));
        assert_eq!(trade.closed_at, Some(at));
    }

    #[test]
    fn second_close_rejected_without_change() {
        let mut trade = buy("1.1000");
        trade.close(p("1.1050"), t0() + Duration::hours(1)).unwrap();
        let before = trade.clone();
        let err = trade.close(p("1.2000"), t0() + Duration::hours(3)).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyClosed { .. }));
        assert_eq!(trade, before);
    }

    #[test]
    fn close_before_open_rejected() {
        let mut trade = buy("1.1000");
        let err = trade.close(p("1.1050"), t0() - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTimestamp { .. }));
        assert!(!trade.is_closed());
    }

    #[test]
    fn close_at_open_instant_allowed() {
        let mut trade = buy("1.1000");
        assert!(trade.close(p("1.1000"), t0()).is_ok());
    }

    #[test]
    fn realized_move_and_pips() {
        let mut long = buy("1.1000");
        long.close(p("1.1050"), t0()).unwrap();
        assert_eq!(long.realized_move(), Some(dec!(0.0050)));
        assert_eq!(long.realized_pips(dec!(0.0001)), Some(dec!(50)));

        let req = OpenTrade::new(
            UserId::new("user1").unwrap(),
            PairId::new(),
            TradeType::Sell,
            p("150.00"),
        );
        let mut short = Trade::open(req, t0()).unwrap();
        short.close(p("149.50"), t0()).unwrap();
        assert_eq!(short.realized_move(), Some(dec!(0.50)));
        assert_eq!(short.realized_pips(dec!(0.01)), Some(dec!(50)));
    }

    #[test]
    fn buy_levels_validated() {
        assert!(validate_levels(TradeType::Buy, p("1.1"), Some(p("1.09")), Some(p("1.12"))).is_ok());
        assert!(validate_levels(TradeType::Buy, p("1.1"), Some(p("1.11")), None).is_err());
        assert!(validate_levels(TradeType::Buy, p("1.1"), None, Some(p("1.1"))).is_err());
    }

    #[test]
    fn sell_levels_validated() {
        assert!(validate_levels(TradeType::Sell, p("1.1"), Some(p("1.12")), Some(p("1.09"))).is_ok());
        let err = validate_levels(TradeType::Sell, p("1.1"), Some(p("1.09")), None).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidLevels { .. }));
    }

    #[test]
    fn status_filter_matches() {
        let open = buy("1.1");
        let mut closed = buy("1.1");
        closed.close(p("1.2"), t0()).unwrap();
        assert!(StatusFilter::All.matches(&open));
        assert!(StatusFilter::Open.matches(&open));
        assert!(!StatusFilter::Open.matches(&closed));
        assert!(StatusFilter::Closed.matches(&closed));
    }
}
