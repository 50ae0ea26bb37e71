#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use fxledger::adapters::memory_store::MemoryStore;
use fxledger::domain::ids::{CurrencyId, PairId, UserId};
use fxledger::domain::price::Price;
use fxledger::ports::clock_port::Clock;
use fxledger::ports::integrity_port::LedgerStore;
use parking_lot::Mutex;
use std::sync::Arc;

/// Clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub fn p(s: &str) -> Price {
    s.parse().unwrap()
}

pub fn user(name: &str) -> UserId {
    UserId::new(name).unwrap()
}

pub fn memory_store(clock: Arc<FixedClock>) -> Box<dyn LedgerStore> {
    Box::new(MemoryStore::with_clock(clock))
}

#[cfg(feature = "sqlite")]
pub fn sqlite_store(clock: Arc<FixedClock>) -> Box<dyn LedgerStore> {
    let store = fxledger::adapters::sqlite_store::SqliteStore::in_memory_with_clock(clock).unwrap();
    store.initialize_schema().unwrap();
    Box::new(store)
}

/// Every store implementation, each with its own clock starting at `ts(1, 0)`.
pub fn all_stores() -> Vec<(&'static str, Box<dyn LedgerStore>, Arc<FixedClock>)> {
    let mut stores = Vec::new();
    let clock = FixedClock::at(ts(1, 0));
    stores.push(("memory", memory_store(clock.clone()), clock));
    #[cfg(feature = "sqlite")]
    {
        let clock = FixedClock::at(ts(1, 0));
        stores.push(("sqlite", sqlite_store(clock.clone()), clock));
    }
    stores
}

pub struct Seeded {
    pub usd: CurrencyId,
    pub eur: CurrencyId,
    pub jpy: CurrencyId,
    pub eurusd: PairId,
    pub usdjpy: PairId,
}

pub fn seed(store: &dyn LedgerStore) -> Seeded {
    let usd = store.register_currency("USD", "US Dollar").unwrap();
    let eur = store.register_currency("EUR", "Euro").unwrap();
    let jpy = store.register_currency("JPY", "Japanese Yen").unwrap();
    let eurusd = store.register_pair(eur, usd, "EURUSD").unwrap();
    let usdjpy = store.register_pair(usd, jpy, "USDJPY").unwrap();
    Seeded {
        usd,
        eur,
        jpy,
        eurusd,
        usdjpy,
    }
}

/// Appends a flat bar at `at` with all four prices equal to `price`.
pub fn flat_bar(store: &dyn LedgerStore, pair: PairId, at: DateTime<Utc>, price: &str) {
    let price = p(price);
    store
        .append_ohlc(pair, at, price, price, price, price)
        .unwrap();
}
