//! # Strategy Boundary
//!
//! A strategy owns the pool's position in exactly one external
//! yield-bearing venue. The pool never touches the venue directly -- it
//! sees only this trait: move funds in, ask for value back, ask what the
//! position is worth.
//!
//! The one semantic subtlety lives in [`StrategyWithdrawal`]: a strategy
//! asked for X may realize less than X (venue exit fees, slippage, a
//! drained position). That is not an error. It is a first-class result the
//! pool propagates to the withdrawing holder, who bears the difference.
//! [`StrategyError`] is reserved for real faults: a ledger transfer that
//! cannot happen, arithmetic that cannot be represented.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::asset::AssetId;
use crate::ledger::LedgerError;
use crate::math::MathError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Faults a strategy can raise. Shortfall is deliberately absent.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// A token movement between custody accounts failed.
    #[error("ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    /// Position valuation or fee arithmetic overflowed.
    #[error("strategy arithmetic failed: {0}")]
    Math(#[from] MathError),

    /// The venue refused an operation outright.
    #[error("venue {venue} rejected the operation: {reason}")]
    Venue {
        /// Venue display name.
        venue: String,
        /// Venue-provided reason.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// StrategyWithdrawal
// ---------------------------------------------------------------------------

/// Outcome of asking a strategy for value back.
///
/// `realized <= requested` always; the gap is the shortfall the
/// withdrawing holder absorbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyWithdrawal {
    /// Normalized value the pool asked for.
    pub requested: u128,

    /// Normalized value the venue actually paid into pool custody.
    pub realized: u128,
}

impl StrategyWithdrawal {
    /// The unrealized gap, zero when the venue paid in full.
    pub fn shortfall(&self) -> u128 {
        self.requested.saturating_sub(self.realized)
    }

    /// Returns `true` if the venue paid the full requested value.
    pub fn is_complete(&self) -> bool {
        self.realized >= self.requested
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// The capability set the pool and controller depend on.
///
/// Implementations are shared as `Arc<dyn Strategy>`: the controller maps
/// each pool to one, and the pool calls through during rebalance and
/// withdrawal shortfalls. All methods take `&self`; a strategy manages its
/// own interior state.
pub trait Strategy: Send + Sync {
    /// Stable instance identifier, used in registry mutations and logs.
    fn id(&self) -> Uuid;

    /// Short human-readable kind tag (e.g. "fixed-rate"), for reports.
    fn kind(&self) -> &str;

    /// Pulls `amount` native units of `asset` out of pool custody and
    /// deposits them into the venue.
    ///
    /// Returns the normalized value the venue credited, which may be less
    /// than `normalize(amount)` when the venue charges an entry fee --
    /// reported, never hidden.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] if the custody transfer fails or the venue
    /// refuses the deposit. On error, no funds have moved.
    fn invest(&self, asset: &AssetId, amount: u128) -> Result<u128, StrategyError>;

    /// Requests `value` (normalized) back from the venue. Tokens land in
    /// pool custody before this returns; the realized value is reported in
    /// the [`StrategyWithdrawal`].
    ///
    /// Never errors solely because the venue pays less than requested.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError`] only for real faults (failed custody
    /// transfer, arithmetic overflow).
    fn withdraw(&self, value: u128) -> Result<StrategyWithdrawal, StrategyError>;

    /// Drains the entire position back to pool custody. Used by
    /// controller-driven strategy migration.
    ///
    /// # Errors
    ///
    /// As for [`withdraw`](Self::withdraw).
    fn withdraw_all(&self) -> Result<StrategyWithdrawal, StrategyError> {
        self.withdraw(self.current_value())
    }

    /// Read-only position value in common precision, reflecting accrued
    /// yield since the last invest/withdraw.
    fn current_value(&self) -> u128;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
