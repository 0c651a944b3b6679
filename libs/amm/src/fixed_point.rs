//! Wad fixed-point base shared by every solver
//!
//! All quantities are unsigned integers scaled by 10^18, so `v` stands for the
//! real number `v / 10^18`. Division truncates (floors) everywhere, and the
//! order of operations is part of the contract: products are always formed
//! before the division that follows them.
//!
//! ## Width
//!
//! Values are held in 256 bits. A product that is immediately divided is
//! evaluated in 512 bits and narrowed afterwards, which keeps the floor
//! semantics of unbounded integers while widening the usable domain. A result
//! that still does not fit is reported as [`AmmError::Overflow`].

use crate::errors::AmmError;
use primitive_types::{U256, U512};
use rust_decimal::Decimal;
use std::fmt;

/// Number of assets in the pool
pub const N_COINS: usize = 2;

/// Decimal places carried by a wad
pub const WAD_DECIMALS: u32 = 18;

/// 1.0 in wad units
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Precision multiplier folded into the amplification parameter
pub const A_MULTIPLIER: U256 = U256([10_000, 0, 0, 0]);

/// Iteration bound of every Newton loop
pub const MAX_ITERATIONS: u32 = 255;

/// Token balances, index 0 and 1
pub type Reserves = [U256; N_COINS];

/// `N_COINS` as a wad-width integer
pub(crate) const N: U256 = U256([N_COINS as u64, 0, 0, 0]);

/// `N_COINS ^ N_COINS`
pub(crate) const N_POW_N: U256 = U256([4, 0, 0, 0]);

/// Amplification as the solvers expect it: `A * N^(N-1) * A_MULTIPLIER`
///
/// `amp_from_a(100) == 2_000_000`
pub fn amp_from_a(a: u64) -> U256 {
    U256::from(a) * N.pow(U256::from(N_COINS - 1)) * A_MULTIPLIER
}

pub(crate) fn checked_add(a: U256, b: U256, operation: &'static str) -> Result<U256, AmmError> {
    a.checked_add(b).ok_or_else(|| AmmError::overflow(operation))
}

pub(crate) fn checked_mul(a: U256, b: U256, operation: &'static str) -> Result<U256, AmmError> {
    a.checked_mul(b).ok_or_else(|| AmmError::overflow(operation))
}

pub(crate) fn checked_div(a: U256, b: U256, operation: &'static str) -> Result<U256, AmmError> {
    a.checked_div(b)
        .ok_or_else(|| AmmError::division_by_zero(operation))
}

fn narrow(value: U512, operation: &'static str) -> Result<U256, AmmError> {
    U256::try_from(value).map_err(|_| AmmError::overflow(operation))
}

/// `floor(a * b / denominator)` with a 512-bit intermediate
pub(crate) fn mul_div(
    a: U256,
    b: U256,
    denominator: U256,
    operation: &'static str,
) -> Result<U256, AmmError> {
    if denominator.is_zero() {
        return Err(AmmError::division_by_zero(operation));
    }
    narrow(a.full_mul(b) / U512::from(denominator), operation)
}

/// `floor(a * b * c / denominator)` with a 512-bit intermediate
pub(crate) fn mul3_div(
    a: U256,
    b: U256,
    c: U256,
    denominator: U256,
    operation: &'static str,
) -> Result<U256, AmmError> {
    if denominator.is_zero() {
        return Err(AmmError::division_by_zero(operation));
    }
    let product = a
        .full_mul(b)
        .checked_mul(U512::from(c))
        .ok_or_else(|| AmmError::overflow(operation))?;
    narrow(product / U512::from(denominator), operation)
}

/// True when two successive iterates are within one unit of each other
pub(crate) fn within_one(current: U256, previous: U256) -> bool {
    if current > previous {
        current - previous <= U256::one()
    } else {
        previous - current <= U256::one()
    }
}

/// Sign-magnitude wad used for price errors and slopes
///
/// Zero is always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedWad {
    negative: bool,
    magnitude: U256,
}

impl SignedWad {
    pub const ZERO: Self = Self {
        negative: false,
        magnitude: U256([0, 0, 0, 0]),
    };

    /// `lhs - rhs`
    pub fn difference(lhs: U256, rhs: U256) -> Self {
        if lhs >= rhs {
            Self {
                negative: false,
                magnitude: lhs - rhs,
            }
        } else {
            Self {
                negative: true,
                magnitude: rhs - lhs,
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn magnitude(&self) -> U256 {
        self.magnitude
    }

    /// `floor(self * factor / divisor)`, rounding toward negative infinity
    ///
    /// For mixed signs this differs from truncation by one whenever the
    /// division leaves a remainder.
    pub fn floor_mul_div(
        self,
        factor: U256,
        divisor: SignedWad,
    ) -> Result<SignedWad, AmmError> {
        if divisor.is_zero() {
            return Err(AmmError::division_by_zero("newton step"));
        }

        let product = self.magnitude.full_mul(factor);
        let divisor_wide = U512::from(divisor.magnitude);
        let mut quotient = product / divisor_wide;

        let negative = self.negative != divisor.negative && !product.is_zero();
        if negative && !(product % divisor_wide).is_zero() {
            quotient += U512::one();
        }

        let magnitude = narrow(quotient, "newton step")?;
        Ok(Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        })
    }

    /// `base - self`, saturating at zero and at `U256::MAX`
    pub fn subtract_from(self, base: U256) -> U256 {
        if self.negative {
            base.saturating_add(self.magnitude)
        } else {
            base.saturating_sub(self.magnitude)
        }
    }
}

impl fmt::Display for SignedWad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "{}", self.magnitude)
        }
    }
}

/// Convert a decimal quantity to wad units
///
/// Digits beyond the 18th decimal place are truncated.
pub fn decimal_to_wad(value: Decimal) -> Result<U256, AmmError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmmError::invalid("negative quantity"));
    }

    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    if scale <= WAD_DECIMALS {
        let factor = U256::exp10((WAD_DECIMALS - scale) as usize);
        checked_mul(mantissa, factor, "decimal conversion")
    } else {
        Ok(mantissa / U256::exp10((scale - WAD_DECIMALS) as usize))
    }
}

/// Convert a wad to a decimal for display
///
/// Returns `None` when the value exceeds the 96-bit decimal mantissa.
pub fn wad_to_decimal(value: U256) -> Option<Decimal> {
    if value > U256::from(i128::MAX as u128) {
        return None;
    }
    Decimal::try_from_i128_with_scale(value.as_u128() as i128, WAD_DECIMALS)
        .ok()
        .map(|d| d.normalize())
}
