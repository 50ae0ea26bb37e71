//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_import::import_bars_from_path;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::currency::{Currency, ForexPair};
use crate::domain::error::{Entity, LedgerError};
use crate::domain::ids::{PairId, TradeId, UserId};
use crate::domain::price::Price;
use crate::domain::store_config::validate_store_config;
use crate::domain::trade::{OpenTrade, StatusFilter, Trade, TradeType};
use crate::logging;
use crate::ports::integrity_port::LedgerStore;

#[derive(Parser, Debug)]
#[command(name = "fxledger", about = "Forex trade ledger and price history store")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "fxledger.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    All,
    Open,
    Closed,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::All => StatusFilter::All,
            StatusArg::Open => StatusFilter::Open,
            StatusArg::Closed => StatusFilter::Closed,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database schema
    Init,
    /// Register a currency
    AddCurrency {
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: String,
    },
    /// List registered currencies
    ListCurrencies,
    /// Delete a currency no pair references
    DeleteCurrency {
        #[arg(long)]
        code: String,
    },
    /// Register a pair from two currency codes
    AddPair {
        #[arg(long)]
        base: String,
        #[arg(long)]
        quote: String,
        /// Defaults to BASE followed by QUOTE
        #[arg(long)]
        symbol: Option<String>,
    },
    /// List registered pairs
    ListPairs,
    /// Delete a pair with its bars, trades and watchlist entries
    DeletePair {
        #[arg(long)]
        symbol: String,
    },
    /// Append one OHLC bar
    AppendBar {
        #[arg(long)]
        pair: String,
        #[arg(long, value_parser = parse_instant)]
        timestamp: DateTime<Utc>,
        #[arg(long)]
        open: Price,
        #[arg(long)]
        high: Price,
        #[arg(long)]
        low: Price,
        #[arg(long)]
        close: Price,
    },
    /// Import bars from a CSV file (timestamp,open,high,low,close)
    ImportBars {
        #[arg(long)]
        pair: String,
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print bars newest first
    Bars {
        #[arg(long)]
        pair: String,
        #[arg(long, value_parser = parse_instant)]
        from: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_instant)]
        to: Option<DateTime<Utc>>,
    },
    /// Show stored data range for a pair
    Info {
        #[arg(long)]
        pair: String,
    },
    /// Open a trade
    OpenTrade {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        pair: String,
        #[arg(long)]
        side: TradeType,
        #[arg(long)]
        entry: Price,
        #[arg(long)]
        stop_loss: Option<Price>,
        #[arg(long)]
        take_profit: Option<Price>,
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },
    /// Close an open trade
    CloseTrade {
        #[arg(long)]
        id: TradeId,
        #[arg(long)]
        exit: Price,
        #[arg(long, value_parser = parse_instant)]
        at: Option<DateTime<Utc>>,
    },
    /// List a user's trades
    Trades {
        #[arg(long)]
        user: UserId,
        #[arg(long, value_enum, default_value = "all")]
        status: StatusArg,
    },
    /// Add a pair to a user's watchlist
    Watch {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        pair: String,
    },
    /// Remove a pair from a user's watchlist
    Unwatch {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        pair: String,
    },
    /// Show a user's watchlist
    Watchlist {
        #[arg(long)]
        user: UserId,
    },
    /// Delete every trade and watchlist entry of a user
    DeleteUser {
        #[arg(long)]
        user: UserId,
    },
}

pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    logging::init(Some(&config));

    let result = open_store(&config).and_then(|store| {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        execute(cli.command, store.as_ref(), &mut out)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = LedgerError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn open_store(config: &FileConfigAdapter) -> Result<Box<dyn LedgerStore>, LedgerError> {
    validate_store_config(config)?;

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_store::SqliteStore;

        let store = SqliteStore::from_config(config)?;
        store.initialize_schema()?;
        Ok(Box::new(store))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        Err(LedgerError::ConfigInvalid {
            section: "sqlite".into(),
            key: "path".into(),
            reason: "sqlite feature is required for the fxledger CLI".into(),
        })
    }
}

/// Runs one command against `store`, writing results to `out`.
pub fn execute(
    command: Command,
    store: &dyn LedgerStore,
    out: &mut dyn Write,
) -> Result<(), LedgerError> {
    match command {
        Command::Init => {
            writeln!(out, "store ready")?;
        }
        Command::AddCurrency { code, name } => {
            let id = store.register_currency(&code, &name)?;
            writeln!(out, "{id}")?;
        }
        Command::ListCurrencies => {
            for currency in store.list_currencies()? {
                writeln!(out, "{currency}")?;
            }
        }
        Command::DeleteCurrency { code } => {
            let currency = require_currency(store, &code)?;
            store.delete_currency(currency.id)?;
            writeln!(out, "deleted {}", currency.code)?;
        }
        Command::AddPair {
            base,
            quote,
            symbol,
        } => {
            let base = require_currency(store, &base)?;
            let quote = require_currency(store, &quote)?;
            let symbol = symbol.unwrap_or_else(|| format!("{}{}", base.code, quote.code));
            let id = store.register_pair(base.id, quote.id, &symbol)?;
            writeln!(out, "{id}")?;
        }
        Command::ListPairs => {
            for pair in store.list_pairs()? {
                writeln!(out, "{}  {pair}", pair.symbol)?;
            }
        }
        Command::DeletePair { symbol } => {
            let pair = require_pair(store, &symbol)?;
            let report = store.delete_pair(pair.id)?;
            writeln!(out, "deleted {} with {report}", pair.symbol)?;
        }
        Command::AppendBar {
            pair,
            timestamp,
            open,
            high,
            low,
            close,
        } => {
            let pair = require_pair(store, &pair)?;
            let id = store.append_ohlc(pair.id, timestamp, open, high, low, close)?;
            writeln!(out, "{id}")?;
        }
        Command::ImportBars { pair, file } => {
            let pair = require_pair(store, &pair)?;
            let report = import_bars_from_path(store, pair.id, &file)?;
            for rejected in &report.rejected {
                writeln!(out, "line {}: {}", rejected.line, rejected.reason)?;
            }
            writeln!(
                out,
                "{}: {} appended, {} rejected",
                pair.symbol,
                report.appended,
                report.rejected.len()
            )?;
        }
        Command::Bars { pair, from, to } => {
            let pair = require_pair(store, &pair)?;
            let Some((first, last, _)) = store.data_range(pair.id)? else {
                return Ok(());
            };
            let bars = store.query_range(pair.id, from.unwrap_or(first), to.unwrap_or(last))?;
            for bar in bars {
                writeln!(
                    out,
                    "{bar}  O={} H={} L={} C={}  spread {}",
                    bar.ohlc.open(),
                    bar.ohlc.high(),
                    bar.ohlc.low(),
                    bar.ohlc.close(),
                    bar.spread().normalize()
                )?;
            }
        }
        Command::Info { pair } => {
            let pair = require_pair(store, &pair)?;
            match store.data_range(pair.id)? {
                Some((first, last, count)) => writeln!(
                    out,
                    "{}: {count} bars, {} to {}",
                    pair.symbol,
                    first.to_rfc3339(),
                    last.to_rfc3339()
                )?,
                None => writeln!(out, "{}: no data", pair.symbol)?,
            }
            let open_trades = store.open_trade_count(pair.id)?;
            writeln!(out, "{}: {open_trades} open trade(s)", pair.symbol)?;
        }
        Command::OpenTrade {
            user,
            pair,
            side,
            entry,
            stop_loss,
            take_profit,
            at,
        } => {
            let pair = require_pair(store, &pair)?;
            let request = OpenTrade {
                user,
                pair: pair.id,
                trade_type: side,
                entry_price: entry,
                stop_loss,
                take_profit,
                opened_at: at,
            };
            let id = store.open_trade(request)?;
            writeln!(out, "{id}")?;
        }
        Command::CloseTrade { id, exit, at } => {
            store.close_trade(id, exit, at)?;
            let trade = store
                .trade(id)?
                .ok_or_else(|| LedgerError::not_found(Entity::Trade, id))?;
            let pairs = pair_index(store)?;
            writeln!(out, "{}", describe_trade(&trade, &pairs))?;
        }
        Command::Trades { user, status } => {
            let pairs = pair_index(store)?;
            for trade in store.trades_for_user(&user, status.into())? {
                writeln!(out, "{}", describe_trade(&trade, &pairs))?;
            }
        }
        Command::Watch { user, pair } => {
            let pair = require_pair(store, &pair)?;
            store.watch(&user, pair.id)?;
            writeln!(out, "{user} - {}", pair.symbol)?;
        }
        Command::Unwatch { user, pair } => {
            let pair = require_pair(store, &pair)?;
            store.unwatch(&user, pair.id)?;
            writeln!(out, "removed {}", pair.symbol)?;
        }
        Command::Watchlist { user } => {
            let pairs = pair_index(store)?;
            for entry in store.watchlist_entries(&user)? {
                let symbol = pairs
                    .get(&entry.pair)
                    .map_or_else(|| entry.pair.to_string(), |p| p.symbol.clone());
                writeln!(out, "{symbol}  since {}", entry.created_at.to_rfc3339())?;
            }
        }
        Command::DeleteUser { user } => {
            let report = store.delete_user(&user)?;
            writeln!(out, "deleted {user}: {report}")?;
        }
    }
    Ok(())
}

fn require_currency(store: &dyn LedgerStore, code: &str) -> Result<Currency, LedgerError> {
    store
        .currency_by_code(code)?
        .ok_or_else(|| LedgerError::not_found(Entity::Currency, code.trim().to_uppercase()))
}

fn require_pair(store: &dyn LedgerStore, symbol: &str) -> Result<ForexPair, LedgerError> {
    store
        .pair_by_symbol(symbol)?
        .ok_or_else(|| LedgerError::not_found(Entity::Pair, symbol.trim().to_uppercase()))
}

fn pair_index(store: &dyn LedgerStore) -> Result<HashMap<PairId, ForexPair>, LedgerError> {
    Ok(store
        .list_pairs()?
        .into_iter()
        .map(|p| (p.id, p))
        .collect())
}

/// One-line summary, e.g. `<id>  alice - EURUSD (buy)  entry 1.1 ...`.
pub fn describe_trade(trade: &Trade, pairs: &HashMap<PairId, ForexPair>) -> String {
    let pair = pairs.get(&trade.pair);
    let symbol = pair.map_or_else(|| trade.pair.to_string(), |p| p.symbol.clone());
    let mut line = format!(
        "{}  {} - {symbol} ({})  entry {}",
        trade.id, trade.user, trade.trade_type, trade.entry_price
    );
    if let Some(sl) = trade.stop_loss {
        line.push_str(&format!("  sl {sl}"));
    }
    if let Some(tp) = trade.take_profit {
        line.push_str(&format!("  tp {tp}"));
    }
    line.push_str(&format!("  opened {}", trade.opened_at.to_rfc3339()));
    if let (Some(exit), Some(closed_at)) = (trade.exit_price, trade.closed_at) {
        line.push_str(&format!("  closed {} @ {exit}", closed_at.to_rfc3339()));
        if let Some(pips) = pair.and_then(|p| trade.realized_pips(p.pip_size())) {
            line.push_str(&format!("  {} pips", pips.normalize()));
        }
    }
    line
}
