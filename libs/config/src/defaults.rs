//! Default values for valuation tools
//!
//! The default table reproduces the reference sweep: a unit invariant with
//! `A = 10`, priced from 0.1 to 10.0.

/// Invariant `D` as a decimal quantity
pub const DEFAULT_INVARIANT: &str = "1.0";

/// Whitepaper amplification coefficient
pub const DEFAULT_A: u64 = 10;

/// Target prices for the value table
pub const DEFAULT_PRICES: [&str; 24] = [
    "0.1", "0.2", "0.3", "0.4", "0.5", "0.6", "0.7", "0.8", "0.9", "1.0", "1.2", "1.4", "1.6",
    "1.8", "2.0", "2.5", "3.0", "4.0", "5.0", "6.0", "7.0", "8.0", "9.0", "10.0",
];

/// Default log level when neither the file nor the command line sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Prefix of environment variable overrides (`VALUATION_POOL__A=100`)
pub const ENV_PREFIX: &str = "VALUATION";

/// Directory searched for `environments/<name>.toml` when no file is given
pub const DEFAULT_CONFIG_DIR: &str = "config";
