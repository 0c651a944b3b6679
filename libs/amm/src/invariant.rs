//! StableSwap invariant `D` for a two-asset pool
//!
//! Solves `Ann * S + D = Ann * D + D^(N+1) / (N^N * prod(x))` by Newton
//! iteration seeded at `D = S`, with the amplification pre-multiplied by
//! `A_MULTIPLIER`.

use crate::errors::{AmmError, Solver};
use crate::fixed_point::{
    checked_add, checked_mul, mul_div, within_one, Reserves, A_MULTIPLIER, MAX_ITERATIONS, N,
    N_POW_N,
};
use primitive_types::U256;
use tracing::trace;

/// Compute the invariant `D` from reserves and amplification
///
/// # Arguments
/// * `amp` - Amplification, `A * N^(N-1) * A_MULTIPLIER`
/// * `reserves` - Pool balances in wad units
///
/// # Returns
/// `0` for an empty pool, otherwise the first iterate within one unit of its
/// predecessor. Fails with [`AmmError::Convergence`] after 255 iterations.
pub fn solve_invariant(amp: U256, reserves: &Reserves) -> Result<U256, AmmError> {
    if amp.is_zero() {
        return Err(AmmError::invalid("amplification must be positive"));
    }

    let sum = checked_add(reserves[0], reserves[1], "reserve sum")?;
    if sum.is_zero() {
        return Ok(U256::zero());
    }
    if reserves.iter().any(|x| x.is_zero()) {
        return Err(AmmError::invalid("reserves must both be positive"));
    }

    let ann = checked_mul(amp, N, "amplification")?;
    if ann < A_MULTIPLIER {
        return Err(AmmError::invalid("amplification below 1/N"));
    }
    let ann_excess = ann - A_MULTIPLIER;
    let ann_sum = checked_mul(ann, sum, "invariant numerator")? / A_MULTIPLIER;

    let mut d = sum;
    for iteration in 0..MAX_ITERATIONS {
        let mut d_p = d;
        for x in reserves {
            d_p = mul_div(d_p, d, *x, "invariant product term")?;
        }
        d_p /= N_POW_N;

        let d_prev = d;
        let numerator = checked_add(
            ann_sum,
            checked_mul(d_p, N, "invariant numerator")?,
            "invariant numerator",
        )?;
        let denominator = checked_add(
            mul_div(ann_excess, d, A_MULTIPLIER, "invariant denominator")?,
            checked_mul(d_p, N + U256::one(), "invariant denominator")?,
            "invariant denominator",
        )?;
        d = mul_div(numerator, d, denominator, "invariant step")?;

        trace!(iteration, %d, %d_p, "invariant iterate");
        if within_one(d, d_prev) {
            return Ok(d);
        }
    }

    Err(AmmError::Convergence {
        solver: Solver::Invariant,
        iterations: MAX_ITERATIONS,
    })
}
