//! # Valuation Configuration
//!
//! Layered configuration and defaults for the StableSwap valuation tools.
//!
//! ## Sources
//!
//! - **Defaults**: the reference sweep (`D = 1.0`, `A = 10`, prices 0.1 to 10.0)
//! - **TOML file**: `[global]`, `[pool]` and `[output]` sections
//! - **Environment overlay**: `<config dir>/environments/<name>.toml`
//! - **Environment variables**: `VALUATION_POOL__A=100`,
//!   `VALUATION_POOL__PRICES=0.5,2.0`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use valuation_config::load_config;
//!
//! let config = load_config(Some(Path::new("config/table.toml")), None).unwrap();
//! let prices = config.pool.price_decimals().unwrap();
//! ```

pub mod defaults;
pub mod table_config;

// Re-export commonly used types
pub use defaults::*;
pub use table_config::{load_config, GlobalConfig, OutputSettings, PoolSettings, TableConfig};
