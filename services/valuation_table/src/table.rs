//! Portfolio value table: `V(p)` across a price sweep for fixed `D` and `A`

use anyhow::{Context, Result};
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use stableswap_amm::{
    amp_from_a, decimal_to_wad, value_portfolio, wad_to_decimal, ValuationExit, U256,
};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Inputs of one sweep
#[derive(Debug, Clone)]
pub struct TableParams {
    pub invariant: Decimal,
    pub a: u64,
    pub prices: Vec<Decimal>,
    pub strict: bool,
}

impl TableParams {
    pub fn amp(&self) -> U256 {
        amp_from_a(self.a)
    }
}

/// One valuation in the table
#[derive(Debug, Clone, Serialize)]
pub struct TableRow {
    pub price: Decimal,
    pub value: Decimal,
    /// Exact value in wad units
    pub value_wad: String,
    pub value_over_d: Decimal,
    /// Constant-product reference value for a unit invariant
    pub sqrt_price: Decimal,
    pub iterations: u32,
    pub exit: ValuationExit,
}

/// Value the portfolio at every price of the sweep
pub fn compute_rows(params: &TableParams) -> Result<Vec<TableRow>> {
    let d = decimal_to_wad(params.invariant).context("Invalid invariant")?;
    let amp = params.amp();

    params
        .prices
        .iter()
        .map(|&price| {
            let target = decimal_to_wad(price)
                .with_context(|| format!("Invalid price {}", price))?;
            let mut valuation = value_portfolio(d, target, amp)
                .with_context(|| format!("Valuation failed at p = {}", price))?;
            if params.strict {
                valuation = valuation
                    .ensure_converged()
                    .with_context(|| format!("Valuation did not converge at p = {}", price))?;
            }

            let value = wad_to_decimal(valuation.value)
                .with_context(|| format!("Value at p = {} exceeds decimal range", price))?;
            let value_over_d = value
                .checked_div(params.invariant)
                .context("Invariant must be positive")?;
            let sqrt_price = price
                .sqrt()
                .with_context(|| format!("No square root for {}", price))?;

            debug!(%price, %value, iterations = valuation.iterations, exit = ?valuation.exit, "valued");
            Ok(TableRow {
                price,
                value,
                value_wad: valuation.value.to_string(),
                value_over_d,
                sqrt_price,
                iterations: valuation.iterations,
                exit: valuation.exit,
            })
        })
        .collect()
}

/// Fixed-width table for the terminal
pub struct TextTable<'a> {
    pub params: &'a TableParams,
    pub rows: &'a [TableRow],
}

impl fmt::Display for TextTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "D = {}, A = {}, _amp = {}\n",
            self.params.invariant,
            self.params.a,
            self.params.amp()
        )?;
        writeln!(
            f,
            "{:>8}  {:>14}  {:>10}  {:>10}  {:>5}  {}",
            "p", "V", "V/D", "sqrt(p)", "iters", "exit"
        )?;
        writeln!(f, "{}", "-".repeat(72))?;
        for row in self.rows {
            writeln!(
                f,
                "{:>8}  {:>14.10}  {:>10.6}  {:>10.6}  {:>5}  {}",
                row.price,
                row.value,
                row.value_over_d,
                row.sqrt_price,
                row.iterations,
                exit_label(row.exit)
            )?;
        }
        Ok(())
    }
}

/// Markdown table document
pub struct MarkdownTable<'a> {
    pub params: &'a TableParams,
    pub rows: &'a [TableRow],
}

impl fmt::Display for MarkdownTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Portfolio Value Table\n")?;
        writeln!(
            f,
            "**Parameters:** $D = {}$, $A = {}$, `_amp = {}`\n",
            self.params.invariant,
            self.params.a,
            self.params.amp()
        )?;
        writeln!(f, "| $p$ | $V$ | $V/D$ | $\\sqrt{{p}}$ | iters |")?;
        writeln!(f, "|----:|----:|------:|------:|------:|")?;
        for row in self.rows {
            writeln!(
                f,
                "| {} | {:.10} | {:.6} | {:.6} | {} |",
                row.price, row.value, row.value_over_d, row.sqrt_price, row.iterations
            )?;
        }
        Ok(())
    }
}

pub fn render_text(params: &TableParams, rows: &[TableRow]) -> String {
    TextTable { params, rows }.to_string()
}

pub fn render_markdown(params: &TableParams, rows: &[TableRow]) -> String {
    MarkdownTable { params, rows }.to_string()
}

pub fn write_markdown(path: &Path, params: &TableParams, rows: &[TableRow]) -> Result<()> {
    std::fs::write(path, render_markdown(params, rows))
        .with_context(|| format!("Failed to write markdown table to {:?}", path))?;
    info!("Markdown table written to {:?}", path);
    Ok(())
}

pub fn write_json(path: &Path, rows: &[TableRow]) -> Result<()> {
    let json = serde_json::to_string_pretty(rows).context("Failed to serialize table rows")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON rows to {:?}", path))?;
    info!("JSON rows written to {:?}", path);
    Ok(())
}

fn exit_label(exit: ValuationExit) -> &'static str {
    match exit {
        ValuationExit::Balanced => "balanced",
        ValuationExit::Converged => "converged",
        ValuationExit::FlatSlope => "flat slope",
        ValuationExit::ResolutionLimit => "resolution limit",
        ValuationExit::Exhausted => "exhausted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reference_params(prices: Vec<Decimal>) -> TableParams {
        TableParams {
            invariant: dec!(1.0),
            a: 10,
            prices,
            strict: false,
        }
    }

    #[test]
    fn test_rows_match_reference_sweep() {
        let params = reference_params(vec![dec!(0.1), dec!(1.0), dec!(2.0), dec!(10.0)]);
        let rows = compute_rows(&params).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].value, dec!(0.167539052967910608));
        assert_eq!(rows[0].iterations, 12);

        assert_eq!(rows[1].value, dec!(1));
        assert_eq!(rows[1].iterations, 0);
        assert_eq!(rows[1].exit, ValuationExit::Balanced);

        assert_eq!(rows[2].value_wad, "1134601399886800299");
        assert_eq!(rows[3].value, dec!(1.411429670036753502));
        assert_eq!(rows[3].iterations, 15);

        // V/D equals V for a unit invariant
        assert_eq!(rows[3].value_over_d, rows[3].value);
        assert!((rows[0].sqrt_price - dec!(0.316227766)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_strict_mode_rejects_exhausted_rows() {
        let mut params = reference_params(vec![dec!(0.5)]);
        let rows = compute_rows(&params).unwrap();
        assert_eq!(rows[0].exit, ValuationExit::Exhausted);
        assert_eq!(rows[0].iterations, 265);

        params.strict = true;
        let err = compute_rows(&params).unwrap_err();
        assert!(format!("{:#}", err).contains("did not converge"));
    }

    #[test]
    fn test_render_text_and_markdown() {
        let params = reference_params(vec![dec!(1.0), dec!(2.0)]);
        let rows = compute_rows(&params).unwrap();

        let text = render_text(&params, &rows);
        assert!(text.starts_with("D = 1.0, A = 10, _amp = 200000\n"));
        assert!(text.contains("balanced"));
        assert!(text.contains("1.134601399"));

        let markdown = render_markdown(&params, &rows);
        assert!(markdown.starts_with("# Portfolio Value Table\n"));
        assert!(markdown.contains("| $p$ | $V$ | $V/D$ | $\\sqrt{p}$ | iters |"));
        assert!(markdown.contains("| 1.0 | 1.0000000000 | 1.000000 | 1.000000 | 0 |"));
        assert_eq!(markdown.lines().filter(|l| l.starts_with("| ")).count(), 3);
    }

    #[test]
    fn test_tables_render_one_line_per_row() {
        let params = reference_params(vec![dec!(0.1), dec!(0.5), dec!(1.0)]);
        let rows = compute_rows(&params).unwrap();

        let text = TextTable {
            params: &params,
            rows: &rows,
        }
        .to_string();
        assert_eq!(text, render_text(&params, &rows));
        // Header, blank line, column names and rule precede the rows
        assert_eq!(text.lines().count(), 4 + rows.len());
        assert!(text.lines().nth(5).unwrap().ends_with("exhausted"));
        assert!(text.lines().nth(6).unwrap().ends_with("balanced"));

        let markdown = MarkdownTable {
            params: &params,
            rows: &rows,
        }
        .to_string();
        assert_eq!(markdown, render_markdown(&params, &rows));
        assert!(markdown.ends_with("| 1.0 | 1.0000000000 | 1.000000 | 1.000000 | 0 |\n"));
    }

    #[test]
    fn test_json_rows_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        let params = reference_params(vec![dec!(0.5)]);
        let rows = compute_rows(&params).unwrap();

        write_json(&path, &rows).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed[0]["exit"], "exhausted");
        assert_eq!(parsed[0]["value_wad"], "567300699943400149");
        assert_eq!(parsed[0]["iterations"], 265);
    }
}
