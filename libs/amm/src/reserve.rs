//! Missing-reserve solve on a fixed invariant
//!
//! Given `D` and the balance of one asset, the other balance is the positive
//! root of `y^2 + (b - D) * y = c`, found by Newton steps
//! `y <- (y^2 + c) / (2y + b - D)` starting at `y = D`. The coefficients are
//! closed-form in the known reserve, so each call is one short loop over
//! stack values.

use crate::errors::{AmmError, Solver};
use crate::fixed_point::{
    checked_add, checked_div, checked_mul, mul3_div, mul_div, within_one, Reserves, A_MULTIPLIER,
    MAX_ITERATIONS, N, N_COINS,
};
use primitive_types::U256;

/// Compute the reserve at `missing_index` that keeps the pool on invariant `d`
///
/// The value stored at `missing_index` is ignored; every other reserve must
/// be strictly positive.
pub fn solve_reserve(
    amp: U256,
    reserves: &Reserves,
    d: U256,
    missing_index: usize,
) -> Result<U256, AmmError> {
    if missing_index >= N_COINS {
        return Err(AmmError::invalid("missing_index must be 0 or 1"));
    }
    if amp.is_zero() {
        return Err(AmmError::invalid("amplification must be positive"));
    }

    let ann = checked_mul(amp, N, "amplification")?;
    let mut known_sum = U256::zero();
    let mut c = d;
    for (j, x) in reserves.iter().enumerate() {
        if j == missing_index {
            continue;
        }
        if x.is_zero() {
            return Err(AmmError::invalid("known reserve must be positive"));
        }
        known_sum = checked_add(known_sum, *x, "reserve sum")?;
        c = mul_div(c, d, checked_mul(*x, N, "reserve c term")?, "reserve c term")?;
    }
    c = mul3_div(c, d, A_MULTIPLIER, checked_mul(ann, N, "reserve c term")?, "reserve c term")?;
    let b = checked_add(
        known_sum,
        mul_div(d, A_MULTIPLIER, ann, "reserve b term")?,
        "reserve b term",
    )?;

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let y_prev = y;
        let numerator = checked_add(
            checked_mul(y, y, "reserve numerator")?,
            c,
            "reserve numerator",
        )?;
        // 2y + b - D stays positive on the curve; anything else is off-domain
        let two_y = checked_mul(y, U256::from(2u8), "reserve denominator")?;
        let denominator = checked_add(two_y, b, "reserve denominator")?
            .checked_sub(d)
            .filter(|den| !den.is_zero())
            .ok_or_else(|| AmmError::division_by_zero("reserve denominator"))?;
        y = checked_div(numerator, denominator, "reserve step")?;

        if within_one(y, y_prev) {
            return Ok(y);
        }
    }

    Err(AmmError::Convergence {
        solver: Solver::Reserve,
        iterations: MAX_ITERATIONS,
    })
}
