//! Port traits: what the engine exposes to callers and what it consumes.

pub mod clock_port;
pub mod config_port;
pub mod integrity_port;
pub mod ledger_port;
pub mod price_port;
pub mod registry_port;
pub mod watchlist_port;
