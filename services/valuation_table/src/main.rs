//! Portfolio value table binary - values a StableSwap pool across a price sweep
//!
//! Usage:
//!   valuation_table
//!   valuation_table --config config/table.toml --environment steep
//!   valuation_table -d 1.0 -a 10 -p 0.5,1.0,2.0 --markdown portfolio_value_table.md

mod table;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use table::{compute_rows, render_text, write_json, write_markdown, TableParams};
use tracing::{dispatcher, error, info, Dispatch};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use valuation_config::{load_config, TableConfig, DEFAULT_LOG_LEVEL};

#[derive(Parser, Debug)]
#[command(name = "valuation_table")]
#[command(about = "StableSwap portfolio value table")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "VALUATION_CONFIG")]
    config: Option<PathBuf>,

    /// Environment overlay under <config dir>/environments/
    #[arg(short, long)]
    environment: Option<String>,

    /// Invariant D as a decimal (1.0 = one wad)
    #[arg(short = 'd', long)]
    invariant: Option<String>,

    /// Amplification coefficient A
    #[arg(short = 'a', long)]
    amplification: Option<u64>,

    /// Comma-separated target prices
    #[arg(short, long, value_delimiter = ',')]
    prices: Option<Vec<String>>,

    /// Write the table as markdown to this path
    #[arg(long)]
    markdown: Option<PathBuf>,

    /// Write the rows as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Fail if any valuation exhausts its Newton iterations
    #[arg(long)]
    strict: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Config loading logs through the command line level until the
    // configured one is known
    let level = args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
    let bootstrap = log_dispatch(level, args.json_logs, std::io::stderr)?;
    let config = dispatcher::with_default(&bootstrap, || load_with_overrides(&args))?;

    init_logging(&config)?;

    run(&config).map_err(|e| {
        error!("Value table failed: {:#}", e);
        e
    })
}

fn load_with_overrides(args: &Args) -> Result<TableConfig> {
    let mut config = load_config(args.config.as_deref(), args.environment.as_deref())?;
    apply_overrides(&mut config, args);
    config.validate().context("Invalid command line overrides")?;
    Ok(config)
}

/// Command line flags take precedence over every configuration source
fn apply_overrides(config: &mut TableConfig, args: &Args) {
    if let Some(invariant) = &args.invariant {
        config.pool.invariant = invariant.clone();
    }
    if let Some(a) = args.amplification {
        config.pool.a = a;
    }
    if let Some(prices) = &args.prices {
        config.pool.prices = prices.clone();
    }
    if args.strict {
        config.pool.strict = true;
    }
    if let Some(path) = &args.markdown {
        config.output.markdown = Some(path.clone());
    }
    if let Some(path) = &args.json {
        config.output.json = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        config.global.log_level = level.clone();
    }
    if args.json_logs {
        config.global.json_logs = true;
    }
}

fn run(config: &TableConfig) -> Result<()> {
    let params = TableParams {
        invariant: config.pool.invariant_decimal()?,
        a: config.pool.a,
        prices: config.pool.price_decimals()?,
        strict: config.pool.strict,
    };

    info!(
        invariant = %params.invariant,
        a = params.a,
        prices = params.prices.len(),
        strict = params.strict,
        "Computing portfolio value table"
    );

    let rows = compute_rows(&params)?;
    print!("{}", render_text(&params, &rows));

    if let Some(path) = &config.output.markdown {
        write_markdown(path, &params, &rows)?;
    }
    if let Some(path) = &config.output.json {
        write_json(path, &rows)?;
    }

    Ok(())
}

/// Logs go to stderr so the table on stdout stays clean
fn init_logging(config: &TableConfig) -> Result<()> {
    let dispatch = log_dispatch(
        &config.global.log_level,
        config.global.json_logs,
        std::io::stderr,
    )?;
    dispatcher::set_global_default(dispatch).context("Failed to install log subscriber")?;
    Ok(())
}

/// `RUST_LOG` wins over `level` when it parses
fn log_dispatch<W>(level: &str, json_logs: bool, writer: W) -> Result<Dispatch>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{}'", level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    Ok(if json_logs {
        Dispatch::new(builder.json().finish())
    } else {
        Dispatch::new(builder.finish())
    })
}
