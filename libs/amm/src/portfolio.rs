//! Portfolio value of a StableSwap position from `(D, p)` alone
//!
//! Finds the reserve split on invariant `D` whose marginal price equals the
//! target price and reports `V = x0 + p * x1 / WAD`. The caller does not need
//! the individual balances.
//!
//! ## Algorithm
//!
//! 1. **Bracket**: ten bisection steps on `x1` over `(1, D - 1)`. Price falls
//!    as `x1` grows, so the side of the midpoint is decided by comparing the
//!    midpoint price against the target.
//! 2. **Refine**: up to 255 Newton updates from the bracket midpoint, with the
//!    slope `dp/dx1` estimated by a forward difference and every update clamped
//!    back into the bracket.
//!
//! The refinement stops when the price error is within one unit, when the
//! slope sample is flat at both step sizes, or when the update no longer moves
//! `x1`. Each of these is a valid result; [`ValuationExit`] records which one
//! ended the search.

use crate::errors::{AmmError, Solver};
use crate::fixed_point::{checked_add, mul_div, Reserves, SignedWad, MAX_ITERATIONS, WAD};
use crate::price::marginal_price;
use crate::reserve::solve_reserve;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Fixed number of bisection steps before Newton refinement
pub const BISECTION_STEPS: u32 = 10;

/// Upper bound on the iteration count reported by [`value_portfolio`]
pub const MAX_TOTAL_ITERATIONS: u32 = BISECTION_STEPS + MAX_ITERATIONS;

const FINE_STEP_DIVISOR: u64 = 10_000_000;
const COARSE_STEP_DIVISOR: u64 = 10_000;
const COARSE_STEP_FLOOR: u64 = 100;

/// How the search for the reserve split ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationExit {
    /// Target price is exactly 1.0; `V = D` without iterating
    Balanced,
    /// Price error within one unit
    Converged,
    /// Finite difference was zero at both step sizes
    FlatSlope,
    /// Newton update left `x1` unchanged
    ResolutionLimit,
    /// All Newton updates used without meeting any stop condition
    Exhausted,
}

/// Detailed result of a valuation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioValuation {
    /// `x0 + p * x1 / WAD`
    pub value: U256,
    /// Bisection steps plus Newton updates attempted
    pub iterations: u32,
    /// Reserve split the search settled on
    pub reserves: Reserves,
    pub exit: ValuationExit,
}

impl PortfolioValuation {
    /// Reject valuations whose refinement ran out of iterations
    ///
    /// Stagnation exits are accepted: they are the resolution limit of
    /// fixed-point arithmetic, not a failure.
    pub fn ensure_converged(self) -> Result<Self, AmmError> {
        match self.exit {
            ValuationExit::Exhausted => Err(AmmError::Convergence {
                solver: Solver::Portfolio,
                iterations: self.iterations,
            }),
            _ => Ok(self),
        }
    }
}

/// Portfolio value and iteration count for invariant `d` at `target_price`
///
/// Shorthand for [`value_portfolio`] keeping only `(value, iterations)`.
pub fn portfolio_value(d: U256, target_price: U256, amp: U256) -> Result<(U256, u32), AmmError> {
    value_portfolio(d, target_price, amp).map(|valuation| (valuation.value, valuation.iterations))
}

/// Portfolio value on invariant `d` where the marginal price is `target_price`
///
/// # Arguments
/// * `d` - Invariant, as returned by [`crate::solve_invariant`]
/// * `target_price` - Price `dx0/dx1` in wad units
/// * `amp` - Amplification, `A * N^(N-1) * A_MULTIPLIER`
pub fn value_portfolio(
    d: U256,
    target_price: U256,
    amp: U256,
) -> Result<PortfolioValuation, AmmError> {
    if amp.is_zero() {
        return Err(AmmError::invalid("amplification must be positive"));
    }

    if target_price == WAD {
        let half = d / U256::from(2u8);
        return Ok(PortfolioValuation {
            value: d,
            iterations: 0,
            reserves: [half, d - half],
            exit: ValuationExit::Balanced,
        });
    }

    if target_price.is_zero() {
        return Err(AmmError::invalid("target price must be positive"));
    }
    if d < U256::from(2u8) {
        return Err(AmmError::invalid("invariant too small to bracket a reserve split"));
    }

    let curve = Curve { amp, d };

    let mut x1_lo = U256::one();
    let mut x1_hi = d - U256::one();
    let mut iterations = 0u32;
    for _ in 0..BISECTION_STEPS {
        iterations += 1;
        let x1_mid = midpoint(x1_lo, x1_hi);
        let p_mid = curve.price_at(x1_mid)?;
        if p_mid > target_price {
            x1_lo = x1_mid;
        } else {
            x1_hi = x1_mid;
        }
    }
    trace!(%x1_lo, %x1_hi, "bisection bracket");

    let mut x1 = midpoint(x1_lo, x1_hi);
    let mut exit = ValuationExit::Exhausted;
    for _ in 0..MAX_ITERATIONS {
        let p_cur = curve.price_at(x1)?;
        let dp = SignedWad::difference(p_cur, target_price);
        if dp.magnitude() <= U256::one() {
            exit = ValuationExit::Converged;
            break;
        }
        iterations += 1;

        let mut h = (x1 / U256::from(FINE_STEP_DIVISOR)).max(U256::one());
        let mut slope_h = curve.price_delta(x1, h, p_cur)?;
        if slope_h.is_zero() {
            h = (x1 / U256::from(COARSE_STEP_DIVISOR)).max(U256::from(COARSE_STEP_FLOOR));
            slope_h = curve.price_delta(x1, h, p_cur)?;
            if slope_h.is_zero() {
                exit = ValuationExit::FlatSlope;
                break;
            }
        }

        let step = dp.floor_mul_div(h, slope_h)?;
        let x1_new = step.subtract_from(x1).clamp(x1_lo, x1_hi);
        trace!(%x1, %dp, %h, %slope_h, %x1_new, "newton update");
        if x1_new == x1 {
            exit = ValuationExit::ResolutionLimit;
            break;
        }
        x1 = x1_new;
    }

    let x0 = solve_reserve(amp, &[U256::zero(), x1], d, 0)?;
    let value = checked_add(
        x0,
        mul_div(target_price, x1, WAD, "portfolio value")?,
        "portfolio value",
    )?;

    match exit {
        ValuationExit::FlatSlope | ValuationExit::Exhausted => {
            warn!(
                %d, %target_price, %x1, iterations, ?exit,
                "portfolio valuation stopped before the price error reached one unit"
            );
        }
        _ => debug!(%d, %target_price, %value, iterations, ?exit, "portfolio valuation"),
    }

    Ok(PortfolioValuation {
        value,
        iterations,
        reserves: [x0, x1],
        exit,
    })
}

/// `floor((lo + hi) / 2)` without forming `lo + hi`
fn midpoint(lo: U256, hi: U256) -> U256 {
    lo + (hi - lo) / U256::from(2u8)
}

/// Points on a fixed invariant, parameterised by `x1`
struct Curve {
    amp: U256,
    d: U256,
}

impl Curve {
    /// Marginal price at reserve `x1`, with `x0` resolved from the invariant
    fn price_at(&self, x1: U256) -> Result<U256, AmmError> {
        let x0 = solve_reserve(self.amp, &[U256::zero(), x1], self.d, 0)?;
        marginal_price(&[x0, x1], self.d, self.amp)
    }

    /// `p(x1 + h) - p(x1)`
    fn price_delta(&self, x1: U256, h: U256, p_at_x1: U256) -> Result<SignedWad, AmmError> {
        let shifted = checked_add(x1, h, "slope sample")?;
        let p_h = self.price_at(shifted)?;
        Ok(SignedWad::difference(p_h, p_at_x1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::amp_from_a;
    use crate::invariant::solve_invariant;

    fn expected_value(reserves: &Reserves, price: U256) -> U256 {
        reserves[0] + price * reserves[1] / WAD
    }

    fn abs_diff(a: U256, b: U256) -> U256 {
        if a > b {
            a - b
        } else {
            b - a
        }
    }

    #[test]
    fn test_balanced_price_short_circuits() {
        let d = U256::from(2_000_000_000_000_000_000u64);
        let (value, iterations) = portfolio_value(d, WAD, amp_from_a(100)).unwrap();
        assert_eq!(value, d);
        assert_eq!(iterations, 0);

        let valuation = value_portfolio(d, WAD, amp_from_a(100)).unwrap();
        assert_eq!(valuation.exit, ValuationExit::Balanced);
        assert_eq!(valuation.reserves, [WAD, WAD]);
    }

    #[test]
    fn test_moderate_imbalance_matches_reference() {
        let amp = amp_from_a(100);
        let reserves = [WAD * 3 / 2, WAD / 2];
        let d = solve_invariant(amp, &reserves).unwrap();
        let p = marginal_price(&reserves, d, amp).unwrap();

        let valuation = value_portfolio(d, p, amp).unwrap();
        assert_eq!(valuation.value, U256::from(2_004_413_856_572_945_174u64));
        assert_eq!(valuation.iterations, 13);
        assert_eq!(valuation.exit, ValuationExit::Converged);
        assert!(abs_diff(valuation.value, expected_value(&reserves, p)) <= U256::from(100u8));
    }

    #[test]
    fn test_heavy_imbalance_matches_reference() {
        let amp = amp_from_a(5);
        let reserves = [WAD * 3, WAD / 3];
        let d = solve_invariant(amp, &reserves).unwrap();
        let p = marginal_price(&reserves, d, amp).unwrap();

        let (value, iterations) = portfolio_value(d, p, amp).unwrap();
        assert_eq!(value, U256::from(3_630_882_868_028_417_504u64));
        assert_eq!(iterations, 14);
        assert!(abs_diff(value, expected_value(&reserves, p)) <= U256::from(100u8));
    }

    #[test]
    fn test_mild_imbalance_both_directions() {
        let amp = amp_from_a(100);
        for reserves in [[WAD * 6 / 5, WAD * 4 / 5], [WAD * 4 / 5, WAD * 6 / 5]] {
            let d = solve_invariant(amp, &reserves).unwrap();
            let p = marginal_price(&reserves, d, amp).unwrap();
            let valuation = value_portfolio(d, p, amp).unwrap();
            assert!(abs_diff(valuation.value, expected_value(&reserves, p)) <= U256::from(100u8));
            assert!(valuation.iterations < MAX_TOTAL_ITERATIONS);
        }
    }

    #[test]
    fn test_value_table_points() {
        // D = 1.0, A = 10
        let amp = amp_from_a(10);
        let cases = [
            (WAD / 10, 167_539_052_967_910_608u64, 12u32),
            (WAD * 2, 1_134_601_399_886_800_299, 15),
            (WAD * 10, 1_411_429_670_036_753_502, 15),
        ];
        for (price, value, iterations) in cases {
            let (v, it) = portfolio_value(WAD, price, amp).unwrap();
            assert_eq!(v, U256::from(value));
            assert_eq!(it, iterations);
        }
    }

    #[test]
    fn test_oscillation_at_resolution_limit_is_exhausted() {
        // At p = 0.5 one unit of x1 moves the price by more than one unit, so
        // the iterate alternates between neighbours until the bound is hit
        let valuation = value_portfolio(WAD, WAD / 2, amp_from_a(10)).unwrap();
        assert_eq!(valuation.exit, ValuationExit::Exhausted);
        assert_eq!(valuation.iterations, MAX_TOTAL_ITERATIONS);
        assert_eq!(valuation.value, U256::from(567_300_699_943_400_149u64));

        let err = valuation.ensure_converged().unwrap_err();
        assert_eq!(
            err,
            AmmError::Convergence {
                solver: Solver::Portfolio,
                iterations: MAX_TOTAL_ITERATIONS,
            }
        );
    }

    #[test]
    fn test_unchanged_update_stops_at_resolution_limit() {
        let valuation = value_portfolio(
            U256::from(140_893u64),
            U256::from(518_227_913_935_318_853u64),
            U256::from(100_000_000u64),
        )
        .unwrap();
        assert_eq!(valuation.exit, ValuationExit::ResolutionLimit);
        assert_eq!(valuation.value, U256::from(73_510u64));
        assert_eq!(valuation.iterations, 12);
        assert_eq!(valuation.reserves, [U256::from(568u64), U256::from(140_754u64)]);
        assert!(valuation.ensure_converged().is_ok());
    }

    #[test]
    fn test_zero_fine_slope_retries_with_coarse_step() {
        // Near the peg with A = 1.5e11 the fine step moves the price by less
        // than one unit; only the coarse step sees a slope
        let valuation = value_portfolio(
            WAD * 2,
            WAD - U256::from(2u8),
            U256::from(3_000_000_000_000_000u64),
        )
        .unwrap();
        assert_eq!(valuation.exit, ValuationExit::Converged);
        assert_eq!(valuation.value, U256::from(1_999_999_999_999_999_997u64));
        assert_eq!(valuation.iterations, 13);
        assert_eq!(
            valuation.reserves,
            [
                U256::from(999_999_963_678_841_329u64),
                U256::from(1_000_000_036_321_158_671u64)
            ]
        );
    }

    #[test]
    fn test_flat_slope_at_both_steps_returns_last_iterate() {
        let valuation = value_portfolio(
            WAD,
            WAD - U256::from(2u8),
            U256::from(3_000_000_000_000_000_000u64),
        )
        .unwrap();
        assert_eq!(valuation.exit, ValuationExit::FlatSlope);
        assert_eq!(valuation.value, U256::from(999_999_999_999_999_998u64));
        assert_eq!(valuation.iterations, 12);
        assert_eq!(
            valuation.reserves,
            [
                U256::from(499_761_962_890_624_996u64),
                U256::from(500_238_037_109_375_004u64)
            ]
        );

        // Stagnation is not a convergence failure
        assert!(valuation.ensure_converged().is_ok());
    }

    #[test]
    fn test_ensure_converged_accepts_normal_exits() {
        let valuation = value_portfolio(WAD, WAD * 2, amp_from_a(10)).unwrap();
        assert!(valuation.ensure_converged().is_ok());
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        let amp = amp_from_a(100);
        assert!(portfolio_value(WAD, U256::zero(), amp)
            .unwrap_err()
            .is_invalid_input());
        assert!(portfolio_value(U256::one(), WAD / 2, amp)
            .unwrap_err()
            .is_invalid_input());
        assert!(portfolio_value(WAD, WAD / 2, U256::zero())
            .unwrap_err()
            .is_invalid_input());
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let amp = amp_from_a(100);
        let d = U256::from(1_998_345_726_703_727_282u64);
        let price = U256::from(1_008_827_713_145_890_351u64);
        let first = value_portfolio(d, price, amp).unwrap();
        let second = value_portfolio(d, price, amp).unwrap();
        assert_eq!(first, second);
    }
}
