//! # Allocation Policy
//!
//! Decides how much of the pool's value stays idle in custody versus how
//! much is deployed to the active strategy. The policy is a single knob:
//! `reserve_bps`, the fraction of **total** pool value (not of idle value)
//! to keep liquid for cheap withdrawals.
//!
//! Anchoring the target to total value is what makes rebalancing
//! idempotent: once idle equals the target, a second rebalance computes the
//! same target and finds nothing to move.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BPS_DENOMINATOR, DEFAULT_RESERVE_BPS};
use crate::math::{self, MathError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while constructing an allocation policy.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The reserve fraction exceeds 100%.
    #[error("reserve of {bps} bps exceeds the {max} bps denominator")]
    ReserveOutOfRange {
        /// The rejected reserve fraction.
        bps: u32,
        /// The basis-point denominator (100%).
        max: u32,
    },
}

// ---------------------------------------------------------------------------
// AllocationPolicy
// ---------------------------------------------------------------------------

/// Idle-reserve policy applied on every rebalance.
///
/// `reserve_bps == 0` deploys everything to the strategy;
/// `reserve_bps == 10_000` keeps the whole pool idle (strategy unused).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPolicy {
    reserve_bps: u32,
}

impl AllocationPolicy {
    /// Creates a policy keeping `reserve_bps` of total pool value idle.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::ReserveOutOfRange`] if `reserve_bps`
    /// exceeds [`BPS_DENOMINATOR`].
    pub fn new(reserve_bps: u32) -> Result<Self, AllocationError> {
        if reserve_bps > BPS_DENOMINATOR {
            return Err(AllocationError::ReserveOutOfRange {
                bps: reserve_bps,
                max: BPS_DENOMINATOR,
            });
        }
        Ok(Self { reserve_bps })
    }

    /// The reserve fraction in basis points.
    pub fn reserve_bps(&self) -> u32 {
        self.reserve_bps
    }

    /// Normalized value that should sit idle for a pool worth
    /// `total_value` (floor).
    pub fn target_idle(&self, total_value: u128) -> Result<u128, MathError> {
        math::bps_of(total_value, self.reserve_bps)
    }

    /// Idle value above the reserve target, available for deployment.
    pub fn surplus(&self, total_value: u128, idle_value: u128) -> Result<u128, MathError> {
        Ok(idle_value.saturating_sub(self.target_idle(total_value)?))
    }

    /// Value missing from the reserve, to be recalled from the strategy.
    pub fn deficit(&self, total_value: u128, idle_value: u128) -> Result<u128, MathError> {
        Ok(self.target_idle(total_value)?.saturating_sub(idle_value))
    }
}

impl Default for AllocationPolicy {
    /// The stock policy: 5% of pool value held idle.
    fn default() -> Self {
        Self {
            reserve_bps: DEFAULT_RESERVE_BPS,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
