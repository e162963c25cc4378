//! # Engine Configuration & Constants
//!
//! Every magic number in the accounting engine lives here. If you're
//! hardcoding a constant somewhere else, you're doing it wrong and you owe
//! the team coffee.
//!
//! These values define how the vault counts money. Changing them after real
//! deposits exist is somewhere between "difficult" and "career-ending", so
//! choose wisely while everything is still simulated.

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

/// Engine version string, resolved at compile time from the workspace
/// manifest so release builds and `basin version` can never drift apart.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Accounting Precision
// ---------------------------------------------------------------------------

/// The common accounting precision, in decimal places.
///
/// Every supported asset's native amount is scaled up to this precision
/// before it touches share math, so a 6-decimal stablecoin and an
/// 18-decimal one are priced on equal footing. 18 matches the finest
/// precision we expect to custody; assets finer than this are rejected at
/// registration rather than rounded.
pub const COMMON_DECIMALS: u8 = 18;

/// One whole unit at common precision (10^18 smallest units).
pub const COMMON_UNIT: u128 = 1_000_000_000_000_000_000;

/// Shares use the same precision as common-value accounting. One bootstrap
/// share equals one common-precision unit of deposited value.
pub const SHARE_DECIMALS: u8 = COMMON_DECIMALS;

// ---------------------------------------------------------------------------
// Allocation Policy
// ---------------------------------------------------------------------------

/// Basis-point denominator. 10_000 bps == 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default idle reserve retained by the allocation policy, in basis points
/// of total pool value. 5% keeps small withdrawals from disturbing the
/// strategy position while still deploying the overwhelming bulk of funds.
pub const DEFAULT_RESERVE_BPS: u32 = 500;

// ---------------------------------------------------------------------------
// Structural Limits
// ---------------------------------------------------------------------------

/// Maximum number of supported assets per pool. Withdrawal planning and
/// valuation iterate the full asset set on every operation, so this bounds
/// the cost of a single transition. Sixteen is far beyond any stable-basket
/// deployment we have seen requested.
pub const MAX_SUPPORTED_ASSETS: usize = 16;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns `true` if `decimals` is registrable, i.e. not finer than the
/// common accounting precision.
pub fn decimals_supported(decimals: u8) -> bool {
    decimals <= COMMON_DECIMALS
}
