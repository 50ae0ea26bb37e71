//! In-process store.
//!
//! All state lives behind one `RwLock`: every mutation runs under the write
//! lock, so per-key serialization and atomic cascades come for free, and
//! readers always see a state between two complete operations.

use crate::domain::bar::{normalize_instant, Ohlc, PriceBar};
use crate::domain::cascade::CascadeReport;
use crate::domain::currency::{
    normalize_code, normalize_symbol, validate_name, validate_pair_legs, Currency, ForexPair,
};
use crate::domain::error::{Entity, LedgerError};
use crate::domain::ids::{BarId, CurrencyId, PairId, TradeId, UserId};
use crate::domain::price::Price;
use crate::domain::trade::{validate_levels, OpenTrade, StatusFilter, Trade};
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::clock_port::Clock;
use crate::ports::integrity_port::Integrity;
use crate::ports::ledger_port::TradeLedger;
use crate::ports::price_port::PriceHistory;
use crate::ports::registry_port::CurrencyRegistry;
use crate::ports::watchlist_port::WatchlistIndex;
use crate::adapters::system_clock::SystemClock;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Default)]
struct State {
    currencies: HashMap<CurrencyId, Currency>,
    currency_codes: HashMap<String, CurrencyId>,
    pairs: HashMap<PairId, ForexPair>,
    pair_symbols: HashMap<String, PairId>,
    bars: HashMap<PairId, BTreeMap<DateTime<Utc>, PriceBar>>,
    trades: HashMap<TradeId, Trade>,
    watchlists: HashMap<UserId, BTreeMap<PairId, WatchlistEntry>>,
}

impl State {
    fn pair_or_not_found(&self, pair: PairId) -> Result<&ForexPair, LedgerError> {
        self.pairs
            .get(&pair)
            .ok_or_else(|| LedgerError::not_found(Entity::Pair, pair))
    }
}

pub struct MemoryStore {
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(trades: &mut [Trade]) {
    trades.sort_by(|a, b| b.opened_at.cmp(&a.opened_at).then(a.id.cmp(&b.id)));
}

impl CurrencyRegistry for MemoryStore {
    fn register_currency(&self, code: &str, name: &str) -> Result<CurrencyId, LedgerError> {
        let code = normalize_code(code)?;
        let name = validate_name(name)?;

        let mut state = self.state.write();
        if state.currency_codes.contains_key(&code) {
            return Err(LedgerError::DuplicateKey {
                entity: Entity::Currency,
                key: code,
            });
        }

        let id = CurrencyId::new();
        state.currency_codes.insert(code.clone(), id);
        state.currencies.insert(id, Currency { id, code, name });
        tracing::debug!(%id, "registered currency");
        Ok(id)
    }

    fn register_pair(
        &self,
        base: CurrencyId,
        quote: CurrencyId,
        symbol: &str,
    ) -> Result<PairId, LedgerError> {
        let symbol = normalize_symbol(symbol)?;
        validate_pair_legs(base, quote)?;

        let mut state = self.state.write();
        let base_code = state
            .currencies
            .get(&base)
            .map(|c| c.code.clone())
            .ok_or_else(|| LedgerError::not_found(Entity::Currency, base))?;
        let quote_code = state
            .currencies
            .get(&quote)
            .map(|c| c.code.clone())
            .ok_or_else(|| LedgerError::not_found(Entity::Currency, quote))?;
        if state.pair_symbols.contains_key(&symbol) {
            return Err(LedgerError::DuplicateKey {
                entity: Entity::Pair,
                key: symbol,
            });
        }

        let id = PairId::new();
        state.pair_symbols.insert(symbol.clone(), id);
        state.pairs.insert(
            id,
            ForexPair {
                id,
                base_currency: base,
                quote_currency: quote,
                base_code,
                quote_code,
                symbol,
            },
        );
        tracing::debug!(%id, "registered pair");
        Ok(id)
    }

    fn currency(&self, id: CurrencyId) -> Result<Option<Currency>, LedgerError> {
        Ok(self.state.read().currencies.get(&id).cloned())
    }

    fn currency_by_code(&self, code: &str) -> Result<Option<Currency>, LedgerError> {
        let code = code.trim().to_uppercase();
        let state = self.state.read();
        Ok(state
            .currency_codes
            .get(&code)
            .and_then(|id| state.currencies.get(id))
            .cloned())
    }

    fn pair(&self, id: PairId) -> Result<Option<ForexPair>, LedgerError> {
        Ok(self.state.read().pairs.get(&id).cloned())
    }

    fn pair_by_symbol(&self, symbol: &str) -> Result<Option<ForexPair>, LedgerError> {
        let symbol = symbol.trim().to_uppercase();
        let state = self.state.read();
        Ok(state
            .pair_symbols
            .get(&symbol)
            .and_then(|id| state.pairs.get(id))
            .cloned())
    }

    fn list_currencies(&self) -> Result<Vec<Currency>, LedgerError> {
        let mut currencies: Vec<Currency> =
            self.state.read().currencies.values().cloned().collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(currencies)
    }

    fn list_pairs(&self) -> Result<Vec<ForexPair>, LedgerError> {
        let mut pairs: Vec<ForexPair> = self.state.read().pairs.values().cloned().collect();
        pairs.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(pairs)
    }
}

impl PriceHistory for MemoryStore {
    fn append_bar(
        &self,
        pair: PairId,
        timestamp: DateTime<Utc>,
        ohlc: Ohlc,
    ) -> Result<BarId, LedgerError> {
        let timestamp = normalize_instant(timestamp);

        let mut state = self.state.write();
        let symbol = state.pair_or_not_found(pair)?.symbol.clone();
        let series = state.bars.entry(pair).or_default();
        if series.contains_key(&timestamp) {
            return Err(LedgerError::DuplicateTimestamp {
                pair: symbol.clone(),
                timestamp: timestamp.to_rfc3339(),
            });
        }

        let id = BarId::new();
        series.insert(
            timestamp,
            PriceBar {
                id,
                pair,
                symbol,
                timestamp,
                ohlc,
            },
        );
        tracing::debug!(%pair, %timestamp, "appended bar");
        Ok(id)
    }

    fn query_range(
        &self,
        pair: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, LedgerError> {
        let (from, to) = (normalize_instant(from), normalize_instant(to));
        let state = self.state.read();
        state.pair_or_not_found(pair)?;
        if from > to {
            return Ok(Vec::new());
        }
        Ok(state
            .bars
            .get(&pair)
            .map(|series| series.range(from..=to).rev().map(|(_, b)| b.clone()).collect())
            .unwrap_or_default())
    }

    fn latest_bar(&self, pair: PairId) -> Result<Option<PriceBar>, LedgerError> {
        let state = self.state.read();
        state.pair_or_not_found(pair)?;
        Ok(state
            .bars
            .get(&pair)
            .and_then(|series| series.values().next_back())
            .cloned())
    }

    fn data_range(
        &self,
        pair: PairId,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, LedgerError> {
        let state = self.state.read();
        state.pair_or_not_found(pair)?;
        let Some(series) = state.bars.get(&pair) else {
            return Ok(None);
        };
        match (series.keys().next(), series.keys().next_back()) {
            (Some(first), Some(last)) => Ok(Some((*first, *last, series.len()))),
            _ => Ok(None),
        }
    }
}

impl TradeLedger for MemoryStore {
    fn open_trade(&self, request: OpenTrade) -> Result<TradeId, LedgerError> {
        validate_levels(
            request.trade_type,
            request.entry_price,
            request.stop_loss,
            request.take_profit,
        )?;
        let opened_at = normalize_instant(request.opened_at.unwrap_or_else(|| self.clock.now()));

        let mut state = self.state.write();
        state.pair_or_not_found(request.pair)?;
        let trade = Trade::open(request, opened_at)?;
        let id = trade.id;
        tracing::debug!(%id, pair = %trade.pair, side = %trade.trade_type, "opened trade");
        state.trades.insert(id, trade);
        Ok(id)
    }

    fn close_trade(
        &self,
        id: TradeId,
        exit_price: Price,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError> {
        let closed_at = normalize_instant(closed_at.unwrap_or_else(|| self.clock.now()));

        let mut state = self.state.write();
        let trade = state
            .trades
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(Entity::Trade, id))?;
        trade.close(exit_price, closed_at)?;
        tracing::debug!(%id, %exit_price, "closed trade");
        Ok(())
    }

    fn trade(&self, id: TradeId) -> Result<Option<Trade>, LedgerError> {
        Ok(self.state.read().trades.get(&id).cloned())
    }

    fn trades_for_user(
        &self,
        user: &UserId,
        filter: StatusFilter,
    ) -> Result<Vec<Trade>, LedgerError> {
        let mut trades: Vec<Trade> = self
            .state
            .read()
            .trades
            .values()
            .filter(|t| &t.user == user && filter.matches(t))
            .cloned()
            .collect();
        newest_first(&mut trades);
        Ok(trades)
    }

    fn trades_for_pair(&self, pair: PairId) -> Result<Vec<Trade>, LedgerError> {
        let state = self.state.read();
        state.pair_or_not_found(pair)?;
        let mut trades: Vec<Trade> = state
            .trades
            .values()
            .filter(|t| t.pair == pair)
            .cloned()
            .collect();
        newest_first(&mut trades);
        Ok(trades)
    }

    fn open_trade_count(&self, pair: PairId) -> Result<usize, LedgerError> {
        let state = self.state.read();
        state.pair_or_not_found(pair)?;
        Ok(state
            .trades
            .values()
            .filter(|t| t.pair == pair && !t.is_closed())
            .count())
    }
}

impl WatchlistIndex for MemoryStore {
    fn watch(&self, user: &UserId, pair: PairId) -> Result<(), LedgerError> {
        let created_at = normalize_instant(self.clock.now());

        let mut state = self.state.write();
        let symbol = state.pair_or_not_found(pair)?.symbol.clone();
        let entries = state.watchlists.entry(user.clone()).or_default();
        if entries.contains_key(&pair) {
            return Err(LedgerError::AlreadyExists {
                entity: Entity::WatchlistEntry,
                key: format!("{user} - {symbol}"),
            });
        }
        entries.insert(
            pair,
            WatchlistEntry {
                user: user.clone(),
                pair,
                created_at,
            },
        );
        tracing::debug!(%user, %pair, "watch");
        Ok(())
    }

    fn unwatch(&self, user: &UserId, pair: PairId) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let removed = state
            .watchlists
            .get_mut(user)
            .and_then(|entries| entries.remove(&pair));
        if removed.is_none() {
            return Err(LedgerError::not_found(
                Entity::WatchlistEntry,
                format!("{user} - {pair}"),
            ));
        }
        if state.watchlists.get(user).is_some_and(|e| e.is_empty()) {
            state.watchlists.remove(user);
        }
        tracing::debug!(%user, %pair, "unwatch");
        Ok(())
    }

    fn watched_pairs(&self, user: &UserId) -> Result<BTreeSet<PairId>, LedgerError> {
        Ok(self
            .state
            .read()
            .watchlists
            .get(user)
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default())
    }

    fn watchlist_entries(&self, user: &UserId) -> Result<Vec<WatchlistEntry>, LedgerError> {
        let mut entries: Vec<WatchlistEntry> = self
            .state
            .read()
            .watchlists
            .get(user)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.pair.cmp(&b.pair)));
        Ok(entries)
    }
}

impl Integrity for MemoryStore {
    fn delete_pair(&self, pair: PairId) -> Result<CascadeReport, LedgerError> {
        let mut state = self.state.write();
        let symbol = state.pair_or_not_found(pair)?.symbol.clone();

        // Collect dependents first; nothing is removed until every lookup succeeded.
        let trade_ids: Vec<TradeId> = state
            .trades
            .values()
            .filter(|t| t.pair == pair)
            .map(|t| t.id)
            .collect();
        let watchers: Vec<UserId> = state
            .watchlists
            .iter()
            .filter(|(_, entries)| entries.contains_key(&pair))
            .map(|(user, _)| user.clone())
            .collect();
        let bar_count = state.bars.get(&pair).map_or(0, |s| s.len());

        for id in &trade_ids {
            state.trades.remove(id);
        }
        for user in &watchers {
            if let Some(entries) = state.watchlists.get_mut(user) {
                entries.remove(&pair);
                if entries.is_empty() {
                    state.watchlists.remove(user);
                }
            }
        }
        state.bars.remove(&pair);
        state.pair_symbols.remove(&symbol);
        state.pairs.remove(&pair);

        let report = CascadeReport {
            bars: bar_count,
            trades: trade_ids.len(),
            watchlist_entries: watchers.len(),
        };
        tracing::info!(%pair, %symbol, %report, "deleted pair");
        Ok(report)
    }

    fn delete_currency(&self, currency: CurrencyId) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let code = state
            .currencies
            .get(&currency)
            .map(|c| c.code.clone())
            .ok_or_else(|| LedgerError::not_found(Entity::Currency, currency))?;
        let referencing = state
            .pairs
            .values()
            .filter(|p| p.references(currency))
            .count();
        if referencing > 0 {
            return Err(LedgerError::ReferencedByPair {
                currency: code,
                pairs: referencing,
            });
        }
        state.currency_codes.remove(&code);
        state.currencies.remove(&currency);
        tracing::info!(%currency, %code, "deleted currency");
        Ok(())
    }

    fn delete_user(&self, user: &UserId) -> Result<CascadeReport, LedgerError> {
        let mut state = self.state.write();
        let trade_ids: Vec<TradeId> = state
            .trades
            .values()
            .filter(|t| &t.user == user)
            .map(|t| t.id)
            .collect();
        for id in &trade_ids {
            state.trades.remove(id);
        }
        let watchlist_entries = state.watchlists.remove(user).map_or(0, |e| e.len());

        let report = CascadeReport {
            bars: 0,
            trades: trade_ids.len(),
            watchlist_entries,
        };
        tracing::info!(%user, %report, "deleted user data");
        Ok(report)
    }
}
