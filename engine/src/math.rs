//! # Checked Accounting Arithmetic
//!
//! All share pricing and pro-rata math funnels through this module. Amounts
//! are `u128` in smallest-unit denomination, but the products inside share
//! pricing (`supply * value`) routinely exceed 128 bits for realistic pool
//! sizes -- a million units of an 18-decimal asset is already 10^24. Those
//! products run through a 256-bit intermediate and come back out checked.
//!
//! Nothing here wraps silently. An overflow is an [`MathError`], and the
//! operation that triggered it aborts.

use alloy_primitives::U256;
use thiserror::Error;

use crate::config::BPS_DENOMINATOR;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from checked accounting arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    /// `a * b / denominator` does not fit back into 128 bits.
    #[error("multiply-divide overflow: {a} * {b} / {denominator} exceeds 128 bits")]
    MulDivOverflow {
        /// Left factor.
        a: u128,
        /// Right factor.
        b: u128,
        /// Divisor.
        denominator: u128,
    },

    /// Division by zero. In share pricing this means pricing against a
    /// pool whose supply or value is zero where the caller should have
    /// taken the bootstrap path instead.
    #[error("division by zero")]
    DivisionByZero,

    /// A plain 128-bit addition overflowed.
    #[error("addition overflow: {current} + {increment}")]
    AdditionOverflow {
        /// Accumulator value before the failed addition.
        current: u128,
        /// The increment that did not fit.
        increment: u128,
    },

    /// Scaling a native amount up to common precision overflowed.
    #[error("scale overflow: {amount} at 10^{exponent}")]
    ScaleOverflow {
        /// The native amount being scaled.
        amount: u128,
        /// The scaling exponent that overflowed.
        exponent: u8,
    },
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Computes `a * b / denominator` with a 256-bit intermediate, flooring.
///
/// This is the primitive behind share minting (`supply * value / total`)
/// and withdrawal entitlement (`total * shares / supply`).
///
/// # Errors
///
/// Returns [`MathError::DivisionByZero`] if `denominator` is zero, and
/// [`MathError::MulDivOverflow`] if the floored quotient exceeds
/// `u128::MAX`.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }

    // The product of two u128 values always fits in 256 bits.
    let wide = U256::from(a) * U256::from(b);
    let quotient = wide / U256::from(denominator);

    u128::try_from(quotient).map_err(|_| MathError::MulDivOverflow { a, b, denominator })
}

/// Computes `value * bps / 10_000`, flooring.
///
/// # Errors
///
/// Propagates [`MathError::MulDivOverflow`]; cannot divide by zero.
pub fn bps_of(value: u128, bps: u32) -> Result<u128, MathError> {
    mul_div(value, bps as u128, BPS_DENOMINATOR as u128)
}

/// Checked 128-bit addition with a structured error.
///
/// # Errors
///
/// Returns [`MathError::AdditionOverflow`] instead of wrapping.
pub fn checked_add(current: u128, increment: u128) -> Result<u128, MathError> {
    current
        .checked_add(increment)
        .ok_or(MathError::AdditionOverflow { current, increment })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_basic() {
        assert_eq!(mul_div(6, 7, 2).unwrap(), 21);
        assert_eq!(mul_div(0, 7, 2).unwrap(), 0);
    }

    #[test]
    fn mul_div_floors() {
        assert_eq!(mul_div(7, 1, 2).unwrap(), 3);
        assert_eq!(mul_div(999, 1, 1000).unwrap(), 0);
    }

    #[test]
    fn mul_div_survives_share_pricing_magnitudes() {
        // Three million 18-decimal units of supply times a one-million-unit
        // deposit: the product is ~3 * 10^48 and must not overflow.
        let supply = 3_000_000u128 * 10u128.pow(18);
        let deposit_value = 1_000_000u128 * 10u128.pow(18);
        let total_value = supply; // price-per-share of exactly 1

        let shares = mul_div(supply, deposit_value, total_value).unwrap();
        assert_eq!(shares, deposit_value);
    }

    #[test]
    fn mul_div_rejects_zero_denominator() {
        assert_eq!(mul_div(1, 1, 0).unwrap_err(), MathError::DivisionByZero);
    }

    #[test]
    fn mul_div_rejects_oversized_result() {
        let result = mul_div(u128::MAX, 2, 1);
        assert!(matches!(
            result.unwrap_err(),
            MathError::MulDivOverflow { .. }
        ));
    }

    #[test]
    fn mul_div_exact_at_u128_max() {
        // The largest representable result must still come back intact.
        assert_eq!(mul_div(u128::MAX, 1, 1).unwrap(), u128::MAX);
        assert_eq!(mul_div(u128::MAX, 3, 3).unwrap(), u128::MAX);
    }

    #[test]
    fn bps_of_whole_and_fraction() {
        assert_eq!(bps_of(10_000, 10_000).unwrap(), 10_000);
        assert_eq!(bps_of(10_000, 500).unwrap(), 500);
        assert_eq!(bps_of(10_000, 0).unwrap(), 0);
    }

    #[test]
    fn checked_add_overflow_is_structured() {
        assert_eq!(checked_add(1, 2).unwrap(), 3);
        assert_eq!(
            checked_add(u128::MAX, 1).unwrap_err(),
            MathError::AdditionOverflow {
                current: u128::MAX,
                increment: 1
            }
        );
    }
}
