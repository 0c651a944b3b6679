//! # StableSwap AMM Library - Fixed-Point Portfolio Valuation
//!
//! ## Purpose
//!
//! Integer-exact mathematics for two-asset StableSwap pools. Given only the
//! invariant `D`, a marginal price `p` and the amplification, the library
//! recovers the value `V = x0 + p * x1` of the pool's holdings without knowing
//! the individual reserves.
//!
//! ## Components
//!
//! - [`fixed_point`]: wad scale, 512-bit intermediate products, floored signed
//!   division, decimal conversions
//! - [`invariant`]: Newton solve of `D` from reserves
//! - [`reserve`]: Newton solve of one reserve from `D` and the other reserve
//! - [`price`]: closed-form marginal price at a reserve state
//! - [`portfolio`]: bisection + finite-difference Newton inversion of price
//! - [`pool`]: observed pool state and reconciliation helpers
//!
//! ## Arithmetic Contract
//!
//! All values are unsigned wads (`10^18` = 1.0) and every division floors,
//! matching on-chain arithmetic bit for bit. Overflow and non-convergence are
//! returned as [`AmmError`] values, never as silently wrong numbers.
//!
//! ## Example
//!
//! ```
//! use stableswap_amm::{amp_from_a, marginal_price, portfolio_value, solve_invariant, WAD};
//!
//! let amp = amp_from_a(100);
//! let reserves = [WAD * 3 / 2, WAD / 2];
//! let d = solve_invariant(amp, &reserves).unwrap();
//! let p = marginal_price(&reserves, d, amp).unwrap();
//!
//! let (value, iterations) = portfolio_value(d, p, amp).unwrap();
//! assert!(iterations < 265);
//! assert!(value > d);
//! ```

pub mod errors;
pub mod fixed_point;
pub mod invariant;
pub mod pool;
pub mod portfolio;
pub mod price;
pub mod reserve;

pub use errors::{AmmError, Solver};
pub use fixed_point::{
    amp_from_a, decimal_to_wad, wad_to_decimal, Reserves, SignedWad, A_MULTIPLIER,
    MAX_ITERATIONS, N_COINS, WAD, WAD_DECIMALS,
};
pub use invariant::solve_invariant;
pub use pool::StableSwapPool;
pub use portfolio::{
    portfolio_value, value_portfolio, PortfolioValuation, ValuationExit, BISECTION_STEPS,
    MAX_TOTAL_ITERATIONS,
};
pub use price::marginal_price;
pub use reserve::solve_reserve;

/// Common types for wad calculations
pub use primitive_types::U256;
pub use rust_decimal::Decimal;
