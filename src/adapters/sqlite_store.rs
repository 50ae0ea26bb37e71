//! SQLite store.
//!
//! Every mutation runs in an `IMMEDIATE` transaction, which takes SQLite's
//! write lock up front: checks and writes of one operation cannot interleave
//! with another writer. Reads run in deferred transactions and see a single
//! committed snapshot. Decimals are stored as canonical text, instants as
//! integer microseconds since the Unix epoch.

use crate::adapters::system_clock::SystemClock;
use crate::domain::bar::{normalize_instant, Ohlc, PriceBar};
use crate::domain::cascade::CascadeReport;
use crate::domain::currency::{
    normalize_code, normalize_symbol, validate_name, validate_pair_legs, Currency, ForexPair,
};
use crate::domain::error::{Entity, LedgerError};
use crate::domain::ids::{BarId, CurrencyId, PairId, TradeId, UserId};
use crate::domain::price::Price;
use crate::domain::store_config::StoreConfig;
use crate::domain::trade::{validate_levels, OpenTrade, StatusFilter, Trade};
use crate::domain::watchlist::WatchlistEntry;
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::integrity_port::Integrity;
use crate::ports::ledger_port::TradeLedger;
use crate::ports::price_port::PriceHistory;
use crate::ports::registry_port::CurrencyRegistry;
use crate::ports::watchlist_port::WatchlistIndex;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS currencies (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS pairs (
    id TEXT PRIMARY KEY,
    base_currency TEXT NOT NULL REFERENCES currencies(id),
    quote_currency TEXT NOT NULL REFERENCES currencies(id),
    symbol TEXT NOT NULL UNIQUE,
    CHECK (base_currency <> quote_currency)
);
CREATE TABLE IF NOT EXISTS price_bars (
    id TEXT PRIMARY KEY,
    pair_id TEXT NOT NULL REFERENCES pairs(id),
    ts INTEGER NOT NULL,
    open TEXT NOT NULL,
    high TEXT NOT NULL,
    low TEXT NOT NULL,
    close TEXT NOT NULL,
    UNIQUE (pair_id, ts)
);
CREATE TABLE IF NOT EXISTS trades (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    pair_id TEXT NOT NULL REFERENCES pairs(id),
    trade_type TEXT NOT NULL CHECK (trade_type IN ('buy', 'sell')),
    entry_price TEXT NOT NULL,
    exit_price TEXT,
    stop_loss TEXT,
    take_profit TEXT,
    opened_at INTEGER NOT NULL,
    closed_at INTEGER,
    CHECK ((closed_at IS NULL) = (exit_price IS NULL))
);
CREATE INDEX IF NOT EXISTS idx_trades_user ON trades(user_id, opened_at);
CREATE INDEX IF NOT EXISTS idx_trades_pair ON trades(pair_id);
CREATE TABLE IF NOT EXISTS watchlist (
    user_id TEXT NOT NULL,
    pair_id TEXT NOT NULL REFERENCES pairs(id),
    created_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, pair_id)
);
CREATE INDEX IF NOT EXISTS idx_watchlist_pair ON watchlist(pair_id);
";

const PAIR_SELECT: &str = "SELECT p.id, p.base_currency, p.quote_currency, b.code, q.code, p.symbol
     FROM pairs p
     JOIN currencies b ON b.id = p.base_currency
     JOIN currencies q ON q.id = p.quote_currency";

const BAR_SELECT: &str = "SELECT b.id, b.pair_id, b.ts, b.open, b.high, b.low, b.close, p.symbol
     FROM price_bars b
     JOIN pairs p ON p.id = b.pair_id";

const TRADE_COLUMNS: &str = "id, user_id, pair_id, trade_type, entry_price, exit_price, \
     stop_loss, take_profit, opened_at, closed_at";

fn pool_error(e: r2d2::Error) -> LedgerError {
    LedgerError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> LedgerError {
    LedgerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_error<E>(idx: usize, ty: Type, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

fn text_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conversion_error(idx, Type::Text, e))
}

fn opt_text_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<T>().map_err(|e| conversion_error(idx, Type::Text, e)))
        .transpose()
}

fn instant_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    from_micros(idx, micros)
}

fn opt_instant_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let micros: Option<i64> = row.get(idx)?;
    micros.map(|m| from_micros(idx, m)).transpose()
}

fn from_micros(idx: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        conversion_error(
            idx,
            Type::Integer,
            LedgerError::invalid_field("timestamp", format!("{micros} is out of range")),
        )
    })
}

fn pair_from_row(row: &Row<'_>) -> rusqlite::Result<ForexPair> {
    Ok(ForexPair {
        id: text_col(row, 0)?,
        base_currency: text_col(row, 1)?,
        quote_currency: text_col(row, 2)?,
        base_code: row.get(3)?,
        quote_code: row.get(4)?,
        symbol: row.get(5)?,
    })
}

fn currency_from_row(row: &Row<'_>) -> rusqlite::Result<Currency> {
    Ok(Currency {
        id: text_col(row, 0)?,
        code: row.get(1)?,
        name: row.get(2)?,
    })
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<PriceBar> {
    let ohlc = Ohlc::new(
        text_col(row, 3)?,
        text_col(row, 4)?,
        text_col(row, 5)?,
        text_col(row, 6)?,
    )
    .map_err(|e| conversion_error(3, Type::Text, e))?;
    Ok(PriceBar {
        id: text_col(row, 0)?,
        pair: text_col(row, 1)?,
        symbol: row.get(7)?,
        timestamp: instant_col(row, 2)?,
        ohlc,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: text_col(row, 0)?,
        user: text_col(row, 1)?,
        pair: text_col(row, 2)?,
        trade_type: text_col(row, 3)?,
        entry_price: text_col(row, 4)?,
        exit_price: opt_text_col(row, 5)?,
        stop_loss: opt_text_col(row, 6)?,
        take_profit: opt_text_col(row, 7)?,
        opened_at: instant_col(row, 8)?,
        closed_at: opt_instant_col(row, 9)?,
    })
}

fn watchlist_from_row(row: &Row<'_>) -> rusqlite::Result<WatchlistEntry> {
    Ok(WatchlistEntry {
        user: text_col(row, 0)?,
        pair: text_col(row, 1)?,
        created_at: instant_col(row, 2)?,
    })
}

fn collect_rows<T, P, F>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Vec<T>, LedgerError>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql).map_err(query_error)?;
    let rows = stmt.query_map(params, map).map_err(query_error)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(query_error)?);
    }
    Ok(out)
}

fn count(conn: &Connection, sql: &str, key: &str) -> Result<usize, LedgerError> {
    let n: i64 = conn
        .query_row(sql, params![key], |row| row.get(0))
        .map_err(query_error)?;
    Ok(n as usize)
}

fn load_currency(conn: &Connection, id: CurrencyId) -> Result<Option<Currency>, LedgerError> {
    conn.query_row(
        "SELECT id, code, name FROM currencies WHERE id = ?1",
        params![id.to_string()],
        currency_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn load_pair(conn: &Connection, id: PairId) -> Result<Option<ForexPair>, LedgerError> {
    conn.query_row(
        &format!("{PAIR_SELECT} WHERE p.id = ?1"),
        params![id.to_string()],
        pair_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn require_pair(conn: &Connection, id: PairId) -> Result<ForexPair, LedgerError> {
    load_pair(conn, id)?.ok_or_else(|| LedgerError::not_found(Entity::Pair, id))
}

fn load_trade(conn: &Connection, id: TradeId) -> Result<Option<Trade>, LedgerError> {
    conn.query_row(
        &format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = ?1"),
        params![id.to_string()],
        trade_from_row,
    )
    .optional()
    .map_err(query_error)
}

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let store_config = StoreConfig::from_config(config)?;
        Self::open(&store_config, Arc::new(SystemClock))
    }

    pub fn open(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", "ON")
        });
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .build(manager)
            .map_err(pool_error)?;

        tracing::debug!(path = %config.path, pool_size = config.pool_size, "opened sqlite store");
        Ok(Self { pool, clock })
    }

    pub fn in_memory() -> Result<Self, LedgerError> {
        Self::in_memory_with_clock(Arc::new(SystemClock))
    }

    /// A private in-memory database. The pool holds exactly one connection
    /// that is never recycled, since closing it would discard the data.
    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.pragma_update(None, "foreign_keys", "ON"));
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool, clock })
    }

    pub fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA).map_err(query_error)?;
        tracing::info!("sqlite schema ready");
        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, LedgerError> {
        self.pool.get().map_err(pool_error)
    }

    /// Runs `f` inside an `IMMEDIATE` transaction; any error rolls everything back.
    fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T, LedgerError>) -> Result<T, LedgerError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_error)?;
        let out = f(&*tx)?;
        tx.commit().map_err(query_error)?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T, LedgerError>) -> Result<T, LedgerError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;
        let out = f(&*tx)?;
        tx.commit().map_err(query_error)?;
        Ok(out)
    }
}

impl CurrencyRegistry for SqliteStore {
    fn register_currency(&self, code: &str, name: &str) -> Result<CurrencyId, LedgerError> {
        let code = normalize_code(code)?;
        let name = validate_name(name)?;

        self.write(|conn| {
            if count(conn, "SELECT COUNT(*) FROM currencies WHERE code = ?1", &code)? > 0 {
                return Err(LedgerError::DuplicateKey {
                    entity: Entity::Currency,
                    key: code.clone(),
                });
            }
            let id = CurrencyId::new();
            conn.execute(
                "INSERT INTO currencies (id, code, name) VALUES (?1, ?2, ?3)",
                params![id.to_string(), code, name],
            )
            .map_err(query_error)?;
            tracing::debug!(%id, "registered currency");
            Ok(id)
        })
    }

    fn register_pair(
        &self,
        base: CurrencyId,
        quote: CurrencyId,
        symbol: &str,
    ) -> Result<PairId, LedgerError> {
        let symbol = normalize_symbol(symbol)?;
        validate_pair_legs(base, quote)?;

        self.write(|conn| {
            for leg in [base, quote] {
                if load_currency(conn, leg)?.is_none() {
                    return Err(LedgerError::not_found(Entity::Currency, leg));
                }
            }
            if count(conn, "SELECT COUNT(*) FROM pairs WHERE symbol = ?1", &symbol)? > 0 {
                return Err(LedgerError::DuplicateKey {
                    entity: Entity::Pair,
                    key: symbol.clone(),
                });
            }
            let id = PairId::new();
            conn.execute(
                "INSERT INTO pairs (id, base_currency, quote_currency, symbol)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), base.to_string(), quote.to_string(), symbol],
            )
            .map_err(query_error)?;
            tracing::debug!(%id, "registered pair");
            Ok(id)
        })
    }

    fn currency(&self, id: CurrencyId) -> Result<Option<Currency>, LedgerError> {
        self.read(|conn| load_currency(conn, id))
    }

    fn currency_by_code(&self, code: &str) -> Result<Option<Currency>, LedgerError> {
        let code = code.trim().to_uppercase();
        self.read(|conn| {
            conn.query_row(
                "SELECT id, code, name FROM currencies WHERE code = ?1",
                params![code],
                currency_from_row,
            )
            .optional()
            .map_err(query_error)
        })
    }

    fn pair(&self, id: PairId) -> Result<Option<ForexPair>, LedgerError> {
        self.read(|conn| load_pair(conn, id))
    }

    fn pair_by_symbol(&self, symbol: &str) -> Result<Option<ForexPair>, LedgerError> {
        let symbol = symbol.trim().to_uppercase();
        self.read(|conn| {
            conn.query_row(
                &format!("{PAIR_SELECT} WHERE p.symbol = ?1"),
                params![symbol],
                pair_from_row,
            )
            .optional()
            .map_err(query_error)
        })
    }

    fn list_currencies(&self) -> Result<Vec<Currency>, LedgerError> {
        self.read(|conn| {
            collect_rows(
                conn,
                "SELECT id, code, name FROM currencies ORDER BY code",
                [],
                currency_from_row,
            )
        })
    }

    fn list_pairs(&self) -> Result<Vec<ForexPair>, LedgerError> {
        self.read(|conn| {
            collect_rows(
                conn,
                &format!("{PAIR_SELECT} ORDER BY p.symbol"),
                [],
                pair_from_row,
            )
        })
    }
}

impl PriceHistory for SqliteStore {
    fn append_bar(
        &self,
        pair: PairId,
        timestamp: DateTime<Utc>,
        ohlc: Ohlc,
    ) -> Result<BarId, LedgerError> {
        let timestamp = normalize_instant(timestamp);

        self.write(|conn| {
            let forex_pair = require_pair(conn, pair)?;
            let exists: Option<String> = conn
                .query_row(
                    "SELECT id FROM price_bars WHERE pair_id = ?1 AND ts = ?2",
                    params![pair.to_string(), timestamp.timestamp_micros()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(query_error)?;
            if exists.is_some() {
                return Err(LedgerError::DuplicateTimestamp {
                    pair: forex_pair.symbol,
                    timestamp: timestamp.to_rfc3339(),
                });
            }

            let id = BarId::new();
            conn.execute(
                "INSERT INTO price_bars (id, pair_id, ts, open, high, low, close)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    pair.to_string(),
                    timestamp.timestamp_micros(),
                    ohlc.open().to_string(),
                    ohlc.high().to_string(),
                    ohlc.low().to_string(),
                    ohlc.close().to_string()
                ],
            )
            .map_err(query_error)?;
            tracing::debug!(%pair, %timestamp, "appended bar");
            Ok(id)
        })
    }

    fn query_range(
        &self,
        pair: PairId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>, LedgerError> {
        let from = normalize_instant(from);
        let to = normalize_instant(to);
        self.read(|conn| {
            require_pair(conn, pair)?;
            collect_rows(
                conn,
                &format!(
                    "{BAR_SELECT}
                     WHERE b.pair_id = ?1 AND b.ts >= ?2 AND b.ts <= ?3
                     ORDER BY b.ts DESC"
                ),
                params![pair.to_string(), from.timestamp_micros(), to.timestamp_micros()],
                bar_from_row,
            )
        })
    }

    fn latest_bar(&self, pair: PairId) -> Result<Option<PriceBar>, LedgerError> {
        self.read(|conn| {
            require_pair(conn, pair)?;
            conn.query_row(
                &format!(
                    "{BAR_SELECT} WHERE b.pair_id = ?1
                     ORDER BY b.ts DESC LIMIT 1"
                ),
                params![pair.to_string()],
                bar_from_row,
            )
            .optional()
            .map_err(query_error)
        })
    }

    fn data_range(
        &self,
        pair: PairId,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, LedgerError> {
        self.read(|conn| {
            require_pair(conn, pair)?;
            let (first, last, n): (Option<i64>, Option<i64>, i64) = conn
                .query_row(
                    "SELECT MIN(ts), MAX(ts), COUNT(*) FROM price_bars WHERE pair_id = ?1",
                    params![pair.to_string()],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map_err(query_error)?;
            match (first, last) {
                (Some(first), Some(last)) if n > 0 => Ok(Some((
                    from_micros(0, first).map_err(query_error)?,
                    from_micros(1, last).map_err(query_error)?,
                    n as usize,
                ))),
                _ => Ok(None),
            }
        })
    }
}

impl TradeLedger for SqliteStore {
    fn open_trade(&self, request: OpenTrade) -> Result<TradeId, LedgerError> {
        validate_levels(
            request.trade_type,
            request.entry_price,
            request.stop_loss,
            request.take_profit,
        )?;
        let opened_at = normalize_instant(request.opened_at.unwrap_or_else(|| self.clock.now()));

        self.write(|conn| {
            require_pair(conn, request.pair)?;
            let trade = Trade::open(request, opened_at)?;
            conn.execute(
                &format!(
                    "INSERT INTO trades ({TRADE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8, NULL)"
                ),
                params![
                    trade.id.to_string(),
                    trade.user.as_str(),
                    trade.pair.to_string(),
                    trade.trade_type.as_str(),
                    trade.entry_price.to_string(),
                    trade.stop_loss.map(|p| p.to_string()),
                    trade.take_profit.map(|p| p.to_string()),
                    trade.opened_at.timestamp_micros()
                ],
            )
            .map_err(query_error)?;
            tracing::debug!(id = %trade.id, pair = %trade.pair, side = %trade.trade_type, "opened trade");
            Ok(trade.id)
        })
    }

    fn close_trade(
        &self,
        id: TradeId,
        exit_price: Price,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<(), LedgerError> {
        let closed_at = normalize_instant(closed_at.unwrap_or_else(|| self.clock.now()));

        self.write(|conn| {
            let mut trade =
                load_trade(conn, id)?.ok_or_else(|| LedgerError::not_found(Entity::Trade, id))?;
            trade.close(exit_price, closed_at)?;
            let updated = conn
                .execute(
                    "UPDATE trades SET exit_price = ?1, closed_at = ?2
                     WHERE id = ?3 AND closed_at IS NULL",
                    params![
                        exit_price.to_string(),
                        closed_at.timestamp_micros(),
                        id.to_string()
                    ],
                )
                .map_err(query_error)?;
            if updated != 1 {
                return Err(LedgerError::AlreadyClosed {
                    trade: id.to_string(),
                });
            }
            tracing::debug!(%id, %exit_price, "closed trade");
            Ok(())
        })
    }

    fn trade(&self, id: TradeId) -> Result<Option<Trade>, LedgerError> {
        self.read(|conn| load_trade(conn, id))
    }

    fn trades_for_user(
        &self,
        user: &UserId,
        filter: StatusFilter,
    ) -> Result<Vec<Trade>, LedgerError> {
        let status_clause = match filter {
            StatusFilter::All => "",
            StatusFilter::Open => " AND closed_at IS NULL",
            StatusFilter::Closed => " AND closed_at IS NOT NULL",
        };
        self.read(|conn| {
            collect_rows(
                conn,
                &format!(
                    "SELECT {TRADE_COLUMNS} FROM trades WHERE user_id = ?1{status_clause}
                     ORDER BY opened_at DESC, id"
                ),
                params![user.as_str()],
                trade_from_row,
            )
        })
    }

    fn trades_for_pair(&self, pair: PairId) -> Result<Vec<Trade>, LedgerError> {
        self.read(|conn| {
            require_pair(conn, pair)?;
            collect_rows(
                conn,
                &format!(
                    "SELECT {TRADE_COLUMNS} FROM trades WHERE pair_id = ?1
                     ORDER BY opened_at DESC, id"
                ),
                params![pair.to_string()],
                trade_from_row,
            )
        })
    }

    fn open_trade_count(&self, pair: PairId) -> Result<usize, LedgerError> {
        self.read(|conn| {
            require_pair(conn, pair)?;
            count(
                conn,
                "SELECT COUNT(*) FROM trades WHERE pair_id = ?1 AND closed_at IS NULL",
                &pair.to_string(),
            )
        })
    }
}

impl WatchlistIndex for SqliteStore {
    fn watch(&self, user: &UserId, pair: PairId) -> Result<(), LedgerError> {
        let created_at = normalize_instant(self.clock.now());

        self.write(|conn| {
            let forex_pair = require_pair(conn, pair)?;
            let existing: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM watchlist WHERE user_id = ?1 AND pair_id = ?2",
                    params![user.as_str(), pair.to_string()],
                    |row| row.get(0),
                )
                .map_err(query_error)?;
            if existing > 0 {
                return Err(LedgerError::AlreadyExists {
                    entity: Entity::WatchlistEntry,
                    key: format!("{user} - {}", forex_pair.symbol),
                });
            }
            conn.execute(
                "INSERT INTO watchlist (user_id, pair_id, created_at) VALUES (?1, ?2, ?3)",
                params![user.as_str(), pair.to_string(), created_at.timestamp_micros()],
            )
            .map_err(query_error)?;
            tracing::debug!(%user, %pair, "watch");
            Ok(())
        })
    }

    fn unwatch(&self, user: &UserId, pair: PairId) -> Result<(), LedgerError> {
        self.write(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM watchlist WHERE user_id = ?1 AND pair_id = ?2",
                    params![user.as_str(), pair.to_string()],
                )
                .map_err(query_error)?;
            if removed == 0 {
                return Err(LedgerError::not_found(
                    Entity::WatchlistEntry,
                    format!("{user} - {pair}"),
                ));
            }
            tracing::debug!(%user, %pair, "unwatch");
            Ok(())
        })
    }

    fn watched_pairs(&self, user: &UserId) -> Result<BTreeSet<PairId>, LedgerError> {
        let pairs: Vec<PairId> = self.read(|conn| {
            collect_rows(
                conn,
                "SELECT pair_id FROM watchlist WHERE user_id = ?1",
                params![user.as_str()],
                |row| text_col(row, 0),
            )
        })?;
        Ok(pairs.into_iter().collect())
    }

    fn watchlist_entries(&self, user: &UserId) -> Result<Vec<WatchlistEntry>, LedgerError> {
        self.read(|conn| {
            collect_rows(
                conn,
                "SELECT user_id, pair_id, created_at FROM watchlist WHERE user_id = ?1
                 ORDER BY created_at, pair_id",
                params![user.as_str()],
                watchlist_from_row,
            )
        })
    }
}

impl Integrity for SqliteStore {
    fn delete_pair(&self, pair: PairId) -> Result<CascadeReport, LedgerError> {
        self.write(|conn| {
            let forex_pair = require_pair(conn, pair)?;
            let key = pair.to_string();

            // Collect dependents first; the deletes below share the transaction.
            let report = CascadeReport {
                bars: count(conn, "SELECT COUNT(*) FROM price_bars WHERE pair_id = ?1", &key)?,
                trades: count(conn, "SELECT COUNT(*) FROM trades WHERE pair_id = ?1", &key)?,
                watchlist_entries: count(
                    conn,
                    "SELECT COUNT(*) FROM watchlist WHERE pair_id = ?1",
                    &key,
                )?,
            };

            for sql in [
                "DELETE FROM watchlist WHERE pair_id = ?1",
                "DELETE FROM trades WHERE pair_id = ?1",
                "DELETE FROM price_bars WHERE pair_id = ?1",
                "DELETE FROM pairs WHERE id = ?1",
            ] {
                conn.execute(sql, params![key]).map_err(query_error)?;
            }

            tracing::info!(%pair, symbol = %forex_pair.symbol, %report, "deleted pair");
            Ok(report)
        })
    }

    fn delete_currency(&self, currency: CurrencyId) -> Result<(), LedgerError> {
        self.write(|conn| {
            let found = load_currency(conn, currency)?
                .ok_or_else(|| LedgerError::not_found(Entity::Currency, currency))?;
            let key = currency.to_string();
            let referencing: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM pairs WHERE base_currency = ?1 OR quote_currency = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .map_err(query_error)?;
            if referencing > 0 {
                return Err(LedgerError::ReferencedByPair {
                    currency: found.code,
                    pairs: referencing as usize,
                });
            }
            conn.execute("DELETE FROM currencies WHERE id = ?1", params![key])
                .map_err(query_error)?;
            tracing::info!(%currency, code = %found.code, "deleted currency");
            Ok(())
        })
    }

    fn delete_user(&self, user: &UserId) -> Result<CascadeReport, LedgerError> {
        self.write(|conn| {
            let trades = conn
                .execute("DELETE FROM trades WHERE user_id = ?1", params![user.as_str()])
                .map_err(query_error)?;
            let watchlist_entries = conn
                .execute("DELETE FROM watchlist WHERE user_id = ?1", params![user.as_str()])
                .map_err(query_error)?;
            let report = CascadeReport {
                bars: 0,
                trades,
                watchlist_entries,
            };
            tracing::info!(%user, %report, "deleted user data");
            Ok(report)
        })
    }
}
