//! Observed pool state and reconciliation against the valuer

use crate::errors::AmmError;
use crate::fixed_point::{amp_from_a, checked_add, mul_div, Reserves, WAD};
use crate::invariant::solve_invariant;
use crate::portfolio::{value_portfolio, PortfolioValuation};
use crate::price::marginal_price;
use primitive_types::U256;

/// Reserves and amplification of a two-asset StableSwap pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableSwapPool {
    pub reserves: Reserves,
    /// `A * N^(N-1) * A_MULTIPLIER`
    pub amp: U256,
}

impl StableSwapPool {
    pub fn new(reserves: Reserves, amp: U256) -> Self {
        Self { reserves, amp }
    }

    /// Build from the whitepaper amplification coefficient `A`
    pub fn from_a(reserves: Reserves, a: u64) -> Self {
        Self::new(reserves, amp_from_a(a))
    }

    pub fn invariant(&self) -> Result<U256, AmmError> {
        solve_invariant(self.amp, &self.reserves)
    }

    pub fn marginal_price(&self) -> Result<U256, AmmError> {
        let d = self.invariant()?;
        marginal_price(&self.reserves, d, self.amp)
    }

    /// `x0 + p * x1 / WAD` at the observed reserves
    pub fn observed_value(&self) -> Result<U256, AmmError> {
        let price = self.marginal_price()?;
        checked_add(
            self.reserves[0],
            mul_div(price, self.reserves[1], WAD, "observed value")?,
            "observed value",
        )
    }

    /// Value recovered from the pool's own `(D, p)` without its reserves
    pub fn implied_valuation(&self) -> Result<PortfolioValuation, AmmError> {
        let d = self.invariant()?;
        let price = marginal_price(&self.reserves, d, self.amp)?;
        value_portfolio(d, price, self.amp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::ValuationExit;

    #[test]
    fn test_balanced_pool_values_at_invariant() {
        let pool = StableSwapPool::from_a([WAD, WAD], 100);
        assert_eq!(pool.amp, U256::from(2_000_000u64));
        assert_eq!(pool.observed_value().unwrap(), WAD * 2);

        let valuation = pool.implied_valuation().unwrap();
        assert_eq!(valuation.value, WAD * 2);
        assert_eq!(valuation.exit, ValuationExit::Balanced);
    }

    #[test]
    fn test_implied_value_reconciles_with_observed() {
        let pool = StableSwapPool::from_a([WAD / 2, WAD * 2], 5);
        let observed = pool.observed_value().unwrap();
        let implied = pool.implied_valuation().unwrap();

        assert_eq!(observed, U256::from(2_100_249_096_992_496_962u64));
        assert_eq!(implied.value, U256::from(2_100_249_096_992_496_961u64));
        assert_eq!(implied.iterations, 13);
    }

    #[test]
    fn test_empty_pool_has_no_price() {
        let pool = StableSwapPool::from_a([U256::zero(), U256::zero()], 100);
        assert_eq!(pool.invariant().unwrap(), U256::zero());
        assert!(pool.marginal_price().unwrap_err().is_invalid_input());
    }
}
