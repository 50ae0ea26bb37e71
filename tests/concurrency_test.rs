//! Concurrent callers against one shared store.
//!
//! Covers:
//! - Racing closes of one trade: exactly one wins, the rest see `AlreadyClosed`
//! - Racing watchlist adds of one (user, pair): exactly one succeeds
//! - Racing bar appends at one timestamp: exactly one succeeds
//! - Readers never observe a half-applied pair cascade
//! - A file-backed SQLite pool shared across threads

mod common;

use common::*;
use fxledger::domain::error::ErrorKind;
use fxledger::domain::trade::{OpenTrade, TradeType};
use fxledger::ports::integrity_port::LedgerStore;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;

/// Runs `op` on `THREADS` threads released together and returns the outcomes.
fn race<F>(store: Arc<dyn LedgerStore>, op: F) -> Vec<Result<(), ErrorKind>>
where
    F: Fn(&dyn LedgerStore, usize) -> Result<(), ErrorKind> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let op = Arc::new(op);
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let store = store.clone();
            let barrier = barrier.clone();
            let op = op.clone();
            thread::spawn(move || {
                barrier.wait();
                op(store.as_ref(), i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn shared_stores() -> Vec<(&'static str, Arc<dyn LedgerStore>)> {
    all_stores()
        .into_iter()
        .map(|(name, store, _)| (name, Arc::from(store)))
        .collect()
}

fn count(results: &[Result<(), ErrorKind>], want: Result<(), ErrorKind>) -> usize {
    results.iter().filter(|r| **r == want).count()
}

#[test]
fn concurrent_close_has_one_winner() {
    for (name, store) in shared_stores() {
        let s = seed(store.as_ref());
        let id = store
            .open_trade(OpenTrade::new(user("u"), s.eurusd, TradeType::Buy, p("1.1000")))
            .unwrap();

        let results = race(store.clone(), move |store, i| {
            let exit = p(&format!("1.10{i:02}"));
            store.close_trade(id, exit, None).map_err(|e| e.kind())
        });

        assert_eq!(count(&results, Ok(())), 1, "{name}");
        assert_eq!(
            count(&results, Err(ErrorKind::AlreadyClosed)),
            THREADS - 1,
            "{name}"
        );
        assert!(store.trade(id).unwrap().unwrap().is_closed(), "{name}");
    }
}

#[test]
fn concurrent_watch_has_one_winner() {
    for (name, store) in shared_stores() {
        let s = seed(store.as_ref());
        let results = race(store.clone(), move |store, _| {
            store.watch(&user("u"), s.eurusd).map_err(|e| e.kind())
        });
        assert_eq!(count(&results, Ok(())), 1, "{name}");
        assert_eq!(
            count(&results, Err(ErrorKind::AlreadyExists)),
            THREADS - 1,
            "{name}"
        );
    }
}

#[test]
fn concurrent_append_same_timestamp_has_one_winner() {
    for (name, store) in shared_stores() {
        let s = seed(store.as_ref());
        let results = race(store.clone(), move |store, _| {
            store
                .append_ohlc(s.eurusd, ts(2, 0), p("1.1"), p("1.2"), p("1.0"), p("1.1"))
                .map(|_| ())
                .map_err(|e| e.kind())
        });
        assert_eq!(count(&results, Ok(())), 1, "{name}");
        assert_eq!(store.data_range(s.eurusd).unwrap().unwrap().2, 1, "{name}");
    }
}

#[test]
fn cascade_is_atomic_to_readers() {
    for (name, store) in shared_stores() {
        let s = seed(store.as_ref());
        for h in 0..20 {
            flat_bar(store.as_ref(), s.eurusd, ts(2, h), "1.1");
        }
        let pair = s.eurusd;
        let results = race(store.clone(), move |store, i| {
            if i == 0 {
                store.delete_pair(pair).map(|_| ()).map_err(|e| e.kind())
            } else {
                for _ in 0..20 {
                    match store.query_range(pair, ts(1, 0), ts(3, 0)) {
                        Ok(bars) if bars.len() != 20 => return Err(ErrorKind::InvalidRange),
                        Ok(_) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                        Err(e) => return Err(e.kind()),
                    }
                }
                Ok(())
            }
        });
        assert!(results.iter().all(|r| r.is_ok()), "{name}: {results:?}");
        assert!(store.pair(pair).unwrap().is_none(), "{name}");
    }
}

#[cfg(feature = "sqlite")]
mod file_backed {
    use super::*;
    use fxledger::adapters::file_config_adapter::FileConfigAdapter;
    use fxledger::adapters::sqlite_store::SqliteStore;
    use fxledger::ports::price_port::PriceHistory;
    use fxledger::ports::registry_port::CurrencyRegistry;

    fn file_config(dir: &tempfile::TempDir) -> FileConfigAdapter {
        FileConfigAdapter::from_string(&format!(
            "[sqlite]\npath = {}\npool_size = 4\nbusy_timeout_ms = 10000\n",
            dir.path().join("ledger.db").display()
        ))
        .unwrap()
    }

    fn file_store(config: &FileConfigAdapter) -> Arc<dyn LedgerStore> {
        let sqlite = SqliteStore::from_config(config).unwrap();
        sqlite.initialize_schema().unwrap();
        Arc::new(sqlite)
    }

    #[test]
    fn cascade_is_atomic_across_pooled_connections() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&file_config(&dir));
        let s = seed(store.as_ref());
        for h in 0..20 {
            flat_bar(store.as_ref(), s.eurusd, ts(2, h), "1.1");
        }
        let pair = s.eurusd;

        let results = race(store.clone(), move |store, i| {
            if i == 0 {
                return store.delete_pair(pair).map(|_| ()).map_err(|e| e.kind());
            }
            for _ in 0..50 {
                match store.query_range(pair, ts(1, 0), ts(3, 0)) {
                    Ok(bars) if bars.len() != 20 => return Err(ErrorKind::InvalidRange),
                    Ok(_) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return match store.data_range(pair) {
                            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                            _ => Err(ErrorKind::InvalidRange),
                        };
                    }
                    Err(e) => return Err(e.kind()),
                }
            }
            Ok(())
        });
        assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
        assert!(store.pair(pair).unwrap().is_none());
        assert_eq!(store.data_range(s.usdjpy).unwrap(), None);
    }

    #[test]
    fn pool_shares_one_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);
        let store = file_store(&config);

        let s = seed(store.as_ref());
        let results = race(store.clone(), move |store, i| {
            for h in 0..3 {
                let at = ts(2 + i as u32, h);
                store
                    .append_ohlc(s.eurusd, at, p("1.1"), p("1.2"), p("1.0"), p("1.1"))
                    .map_err(|e| e.kind())?;
            }
            Ok(())
        });
        assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
        assert_eq!(store.data_range(s.eurusd).unwrap().unwrap().2, THREADS * 3);

        drop(store);
        let reopened = SqliteStore::from_config(&config).unwrap();
        reopened.initialize_schema().unwrap();
        let pair = reopened.pair_by_symbol("EURUSD").unwrap().unwrap();
        assert_eq!(reopened.data_range(pair.id).unwrap().unwrap().2, THREADS * 3);
    }
}
