//! Marginal price of asset 1 in units of asset 0
//!
//! Closed form of `-dx0/dx1` along the invariant curve. With
//! `Dr = D^(N+1) / (N^N * x0 * x1)`:
//!
//! ```text
//! p = (Ann * x0 + Dr * x0 / x1) / (Ann * x0 + Dr)
//! ```
//!
//! For a fixed `D` the price strictly decreases as `x1` grows, which is what
//! lets the portfolio valuer bisect on `x1`.

use crate::errors::AmmError;
use crate::fixed_point::{
    checked_add, checked_mul, mul_div, Reserves, A_MULTIPLIER, N, N_POW_N, WAD,
};
use primitive_types::U256;

/// Instantaneous price `dx0/dx1` in wad units (`WAD` at balance)
pub fn marginal_price(reserves: &Reserves, d: U256, amp: U256) -> Result<U256, AmmError> {
    if amp.is_zero() {
        return Err(AmmError::invalid("amplification must be positive"));
    }
    if reserves.iter().any(|x| x.is_zero()) {
        return Err(AmmError::invalid("reserves must both be positive"));
    }
    let [x0, x1] = *reserves;

    let ann = checked_mul(amp, N, "amplification")?;
    let mut dr = d / N_POW_N;
    for x in reserves {
        dr = mul_div(dr, d, *x, "price product term")?;
    }
    let x0_ann = mul_div(ann, x0, A_MULTIPLIER, "price amplified reserve")?;

    let numerator = checked_add(
        x0_ann,
        mul_div(dr, x0, x1, "price numerator")?,
        "price numerator",
    )?;
    let denominator = checked_add(x0_ann, dr, "price denominator")?;
    mul_div(WAD, numerator, denominator, "price")
}
