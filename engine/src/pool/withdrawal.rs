//! # Basket Planner
//!
//! Pure planning logic for expressing a normalized value as a basket of
//! native token units drawn from the pool's idle holdings. Withdrawals use
//! it to decide which assets a redeeming holder receives; rebalancing uses
//! it to decide which assets to push into the strategy.
//!
//! Planning is deterministic: assets are ranked by **largest normalized
//! idle balance first**, with registration order breaking ties. Draining
//! the most concentrated holding first keeps the idle book diversified and
//! makes payouts reproducible for a given pool state.
//!
//! The planner never mutates anything. It reads a snapshot of idle rows
//! and returns the basket; the pool executes the resulting transfers.

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::math::MathError;
use crate::value::{denormalize, normalize};

// ---------------------------------------------------------------------------
// Payouts
// ---------------------------------------------------------------------------

/// One leg of a withdrawal basket: `amount` native units of `asset`,
/// worth `value` in common precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPayout {
    /// The asset being paid out.
    pub asset: AssetId,

    /// Native units transferred, in the asset's own decimals.
    pub amount: u128,

    /// Normalized value of `amount` (common 18-decimal precision).
    pub value: u128,
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Snapshot row of one asset's idle custody balance.
///
/// Rows are supplied in registration order; the planner relies on that for
/// its tie-break.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IdleBalance {
    pub asset: AssetId,
    pub decimals: u8,
    /// Native units currently in pool custody.
    pub amount: u128,
}

/// Result of planning a basket against an idle snapshot.
#[derive(Clone, Debug)]
pub(crate) struct BasketPlan {
    /// Per-asset legs, in draw order. Zero-unit legs are never emitted.
    pub payouts: Vec<AssetPayout>,

    /// Normalized value the snapshot could not cover. Includes sub-unit
    /// remainders too small to express in any asset's native units.
    pub unmet: u128,
}

impl BasketPlan {
    /// Total normalized value of all planned legs.
    pub fn planned_value(&self) -> u128 {
        self.payouts.iter().map(|payout| payout.value).sum()
    }
}

/// Plans a basket worth up to `target_value` from the given idle rows.
///
/// Each asset contributes `min(idle, denormalize(remaining))` native units;
/// the contributed value is the normalization of that floored amount, so a
/// leg never overshoots the remaining target. Assets whose native unit is
/// coarser than the remaining value are skipped (a finer-grained asset
/// later in the ranking may still cover it).
pub(crate) fn plan_basket(
    rows: &[IdleBalance],
    target_value: u128,
) -> Result<BasketPlan, MathError> {
    let mut ranked = Vec::with_capacity(rows.len());
    for row in rows {
        ranked.push((normalize(row.amount, row.decimals)?, *row));
    }
    // Stable sort: equal normalized balances keep their input order, which
    // is registration order. That is the tie-break.
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let mut payouts = Vec::new();
    let mut remaining = target_value;

    for (_, row) in ranked {
        if remaining == 0 {
            break;
        }

        let take = row.amount.min(denormalize(remaining, row.decimals));
        if take == 0 {
            continue;
        }

        // take <= denormalize(remaining), so value <= remaining.
        let value = normalize(take, row.decimals)?;
        payouts.push(AssetPayout {
            asset: row.asset,
            amount: take,
            value,
        });
        remaining -= value;
    }

    Ok(BasketPlan {
        payouts,
        unmet: remaining,
    })
}

/// Plans a basket containing every remaining idle unit of every asset.
///
/// Used for the final redemption: when the last shares are burned, flooring
/// must not strand dust in custody, so the whole idle book is paid out.
pub(crate) fn plan_full_sweep(rows: &[IdleBalance]) -> Result<Vec<AssetPayout>, MathError> {
    let mut payouts = Vec::new();
    for row in rows {
        if row.amount == 0 {
            continue;
        }
        payouts.push(AssetPayout {
            asset: row.asset,
            amount: row.amount,
            value: normalize(row.amount, row.decimals)?,
        });
    }
    Ok(payouts)
}

/// Folds `extra` legs into `base`, summing legs that share an asset.
/// First-seen order is preserved.
pub(crate) fn merge_payouts(base: &mut Vec<AssetPayout>, extra: Vec<AssetPayout>) {
    for leg in extra {
        match base.iter_mut().find(|existing| existing.asset == leg.asset) {
            Some(existing) => {
                existing.amount += leg.amount;
                existing.value += leg.value;
            }
            None => base.push(leg),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
