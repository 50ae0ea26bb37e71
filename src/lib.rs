//! fxledger: forex trade-ledger and price-history storage engine.
//!
//! Hexagonal architecture: domain types and rules in [`domain`], port traits in
//! [`ports`], concrete stores and infrastructure in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
