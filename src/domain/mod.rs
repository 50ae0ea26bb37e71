//! Core domain types and validation rules shared by every store.

pub mod bar;
pub mod cascade;
pub mod currency;
pub mod error;
pub mod ids;
pub mod price;
pub mod store_config;
pub mod trade;
pub mod watchlist;
