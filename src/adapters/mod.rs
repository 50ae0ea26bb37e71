//! Concrete implementations of the ports.

pub mod csv_import;
pub mod file_config_adapter;
pub mod memory_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod system_clock;
