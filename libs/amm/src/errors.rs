//! Error types for the StableSwap solvers
//!
//! Every failure is reported as a typed value. Precondition violations are
//! rejected before any iteration starts; arithmetic and convergence failures
//! surface from inside the Newton loops and are never replaced by a
//! best-effort number.

use std::fmt;
use thiserror::Error;

/// Identifies which bounded loop failed to converge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Solver {
    /// Newton iteration on the invariant polynomial (`D`)
    Invariant,
    /// Newton iteration on the reserve quadratic (`y`)
    Reserve,
    /// Newton refinement of the portfolio valuer
    Portfolio,
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solver::Invariant => write!(f, "invariant solver"),
            Solver::Reserve => write!(f, "reserve solver"),
            Solver::Portfolio => write!(f, "portfolio valuer"),
        }
    }
}

/// Errors that can occur while solving the StableSwap curve
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmmError {
    /// A Newton loop exhausted its iteration bound
    #[error("{solver} did not converge within {iterations} iterations")]
    Convergence { solver: Solver, iterations: u32 },

    /// Inputs outside the solver's domain
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: &'static str },

    /// Intermediate or final value does not fit in 256 bits
    #[error("Arithmetic overflow in {operation}")]
    Overflow { operation: &'static str },

    /// A divisor evaluated to zero (or went negative) mid-iteration
    #[error("Division by zero in {operation}")]
    DivisionByZero { operation: &'static str },
}

impl AmmError {
    pub(crate) fn invalid(reason: &'static str) -> Self {
        AmmError::InvalidInput { reason }
    }

    pub(crate) fn overflow(operation: &'static str) -> Self {
        AmmError::Overflow { operation }
    }

    pub(crate) fn division_by_zero(operation: &'static str) -> Self {
        AmmError::DivisionByZero { operation }
    }

    /// True for errors caused by the caller's inputs rather than by iteration
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, AmmError::InvalidInput { .. })
    }
}
