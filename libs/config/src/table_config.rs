//! Value Table Configuration Module
//!
//! Loads valuation settings from built-in defaults, an optional TOML file,
//! an optional environment-specific overlay and `VALUATION_*` environment
//! variables, in that order of precedence (last wins).

use crate::defaults::{
    DEFAULT_A, DEFAULT_CONFIG_DIR, DEFAULT_INVARIANT, DEFAULT_LOG_LEVEL, DEFAULT_PRICES,
    ENV_PREFIX,
};
use anyhow::{bail, ensure, Context, Result};
use config_crate::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Main value table configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    /// Global settings
    pub global: GlobalConfig,

    /// Pool parameters and price sweep
    pub pool: PoolSettings,

    /// Output destinations
    pub output: OutputSettings,
}

/// Global configuration settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Pool parameters for the sweep
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PoolSettings {
    /// Invariant `D` as a decimal quantity (1.0 = one wad)
    pub invariant: String,
    /// Whitepaper amplification coefficient `A`
    pub a: u64,
    /// Target prices as decimal quantities
    pub prices: Vec<String>,
    /// Fail when a valuation exhausts its Newton iterations
    pub strict: bool,
}

/// Output destinations; stdout is always written
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub markdown: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            invariant: DEFAULT_INVARIANT.to_string(),
            a: DEFAULT_A,
            prices: DEFAULT_PRICES.iter().map(|p| p.to_string()).collect(),
            strict: false,
        }
    }
}

impl PoolSettings {
    /// Invariant parsed as an exact decimal
    pub fn invariant_decimal(&self) -> Result<Decimal> {
        parse_positive(&self.invariant).context("Invalid pool.invariant")
    }

    /// Prices parsed as exact decimals, in configured order
    pub fn price_decimals(&self) -> Result<Vec<Decimal>> {
        self.prices
            .iter()
            .map(|p| parse_positive(p).with_context(|| format!("Invalid price '{}'", p)))
            .collect()
    }
}

fn parse_positive(raw: &str) -> Result<Decimal> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .with_context(|| format!("'{}' is not a decimal number", raw))?;
    if value <= Decimal::ZERO {
        bail!("'{}' must be positive", raw);
    }
    Ok(value)
}

impl TableConfig {
    /// Load configuration from files with environment overrides
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(base) = base_path {
            builder = builder.add_source(File::from(base).required(true));
        }

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let config_dir = base_path
                .and_then(Path::parent)
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_DIR));
            let env_file = config_dir
                .join("environments")
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (VALUATION_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("pool.prices")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Expand environment variables in output paths
    pub fn expand_env_vars(&mut self) -> Result<()> {
        for path in [&mut self.output.markdown, &mut self.output.json]
            .into_iter()
            .flatten()
        {
            let raw = path.to_string_lossy().into_owned();
            let expanded = shellexpand::env(&raw)
                .with_context(|| format!("Failed to expand output path '{}'", raw))?;
            *path = PathBuf::from(expanded.as_ref());
        }

        Ok(())
    }

    /// Check that the sweep can be computed
    pub fn validate(&self) -> Result<()> {
        ensure!(self.pool.a > 0, "pool.a must be positive");
        ensure!(!self.pool.prices.is_empty(), "pool.prices must not be empty");
        self.pool.invariant_decimal()?;
        self.pool.price_decimals()?;
        Ok(())
    }
}

/// Convenience function to load, expand and validate configuration
pub fn load_config(base_path: Option<&Path>, environment: Option<&str>) -> Result<TableConfig> {
    let mut config = TableConfig::load(base_path, environment)?;
    config.expand_env_vars()?;
    config.validate()?;
    debug!(
        a = config.pool.a,
        prices = config.pool.prices.len(),
        "Loaded value table configuration"
    );
    Ok(config)
}
