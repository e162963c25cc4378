//! # Valuation & Normalization
//!
//! Converts amounts between an asset's native precision and the pool's
//! common accounting precision. A 6-decimal stablecoin unit and an
//! 18-decimal one represent the same dollar; this module is what makes the
//! share math see them that way.
//!
//! Normalization is multiply-only: [`AssetSet`](crate::asset::AssetSet)
//! registration rejects assets finer than [`COMMON_DECIMALS`], so scaling
//! up never loses value. Scaling back down floors, and every call site that
//! floors is one where the dust stays in the pool rather than leaving it.

use crate::config::COMMON_DECIMALS;
use crate::math::MathError;

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// Returns the multiplier from `decimals` native precision up to common
/// precision, i.e. `10^(COMMON_DECIMALS - decimals)`.
///
/// Callers must only pass registered asset precisions (<= 18); the asset
/// set enforces that bound at registration time.
pub fn scaling_factor(decimals: u8) -> u128 {
    10u128.pow(COMMON_DECIMALS.saturating_sub(decimals) as u32)
}

/// Scales a native asset amount up to common accounting precision.
///
/// # Errors
///
/// Returns [`MathError::ScaleOverflow`] if the scaled amount exceeds
/// `u128::MAX`. (At 10^12 scaling this needs a native amount above 3 * 10^26
/// whole tokens -- not a realistic balance, but not our call to wrap.)
pub fn normalize(amount: u128, decimals: u8) -> Result<u128, MathError> {
    let exponent = COMMON_DECIMALS.saturating_sub(decimals);
    amount
        .checked_mul(scaling_factor(decimals))
        .ok_or(MathError::ScaleOverflow { amount, exponent })
}

/// Scales a common-precision value back down to a native asset amount,
/// flooring.
pub fn denormalize(value: u128, decimals: u8) -> u128 {
    value / scaling_factor(decimals)
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Formats a common-precision value as a decimal string, e.g.
/// `3000000.000000000000000000`. Mainly for logs and reports.
pub fn display_common(value: u128) -> String {
    let divisor = scaling_factor(0);
    let whole = value / divisor;
    let frac = value % divisor;
    format!(
        "{}.{:0width$}",
        whole,
        frac,
        width = COMMON_DECIMALS as usize
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
