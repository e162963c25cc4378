//! # Pool -- Multi-Asset Share Accounting
//!
//! The pool is where value lives in Basin. Depositors hand over supported
//! stable assets and receive fungible shares priced against the pool's
//! total value; withdrawals burn shares for a proportional basket of
//! whatever sits idle, topped up from the active strategy when idle funds
//! run short.
//!
//! ## Architecture
//!
//! ```text
//! allocation.rs -- idle-reserve policy applied on rebalance
//! withdrawal.rs -- deterministic basket planner (pure)
//! mod.rs        -- the Pool aggregate: deposit, withdraw, rebalance
//! ```
//!
//! ## Design Principles
//!
//! 1. **Native units stay native.** Token amounts are `u128` in each
//!    asset's own smallest denomination; cross-asset arithmetic happens
//!    only after normalizing to the common 18-decimal value scale.
//!
//! 2. **Pool value is computed fresh on every operation.** There is no
//!    cached total to go stale; idle custody balances plus the strategy's
//!    reported position value are summed at the moment they are needed.
//!
//! 3. **Shares burn before anything external runs.** A withdrawal first
//!    removes the holder's claim, then plans and pays the basket. A
//!    re-entrant caller observes the reduced supply and cannot
//!    double-claim.
//!
//! 4. **One operation at a time.** Every mutating entry point takes the
//!    operation guard; overlapping calls abort with a re-entrancy error
//!    instead of interleaving.

pub mod allocation;
pub mod withdrawal;

pub use allocation::{AllocationError, AllocationPolicy};
pub use withdrawal::AssetPayout;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::asset::{AssetId, AssetSet};
use crate::config::COMMON_UNIT;
use crate::controller::Controller;
use crate::ledger::{LedgerError, TokenLedger};
use crate::math::{self, MathError};
use crate::shares::{ShareError, ShareLedger};
use crate::strategy::Strategy;
use crate::strategy::StrategyError;
use crate::value::normalize;
use withdrawal::{merge_payouts, plan_basket, plan_full_sweep, IdleBalance};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The deposit amount is zero.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// The share amount is zero.
    #[error("zero-share operations are not permitted")]
    ZeroShares,

    /// The asset is not in this pool's supported set.
    #[error("asset {0} is not supported by this pool")]
    UnsupportedAsset(AssetId),

    /// The deposit is worth less than one share at the current price.
    /// Accepting it would donate the value to existing holders.
    #[error("deposit of {amount} native units of {asset} is too small to mint a share")]
    DepositTooSmall {
        /// The deposited asset.
        asset: AssetId,
        /// The rejected native amount.
        amount: u128,
    },

    /// Another pool operation is already in progress.
    #[error("operation rejected: another pool operation is in progress")]
    ReentrantCall,

    /// A share ledger operation failed.
    #[error("share ledger error: {0}")]
    Shares(#[from] ShareError),

    /// A token ledger operation failed (missing allowance, insufficient
    /// balance, overflow).
    #[error("token ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Checked arithmetic failed.
    #[error("arithmetic error: {0}")]
    Math(#[from] MathError),

    /// The active strategy reported a hard failure. Shortfalls are not
    /// errors; this is venue-level breakage.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Receipt returned by [`Pool::deposit`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// The pool that accepted the deposit.
    pub pool: Uuid,

    /// The depositing account.
    pub depositor: String,

    /// The asset deposited.
    pub asset: AssetId,

    /// Native units pulled from the depositor.
    pub amount: u128,

    /// Normalized value of the deposit.
    pub value: u128,

    /// Shares minted to the depositor.
    pub shares_minted: u128,

    /// Total share supply after the mint.
    pub share_supply: u128,

    /// When the deposit settled (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Receipt returned by [`Pool::withdraw`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// The pool that processed the withdrawal.
    pub pool: Uuid,

    /// The redeeming holder.
    pub holder: String,

    /// Shares burned. Always the full requested amount, regardless of
    /// how much value was realized.
    pub shares_burned: u128,

    /// Normalized value the burned shares were entitled to at burn time.
    pub entitlement: u128,

    /// Normalized value actually paid out.
    pub value_paid: u128,

    /// Entitlement minus paid value: strategy-side slippage plus any
    /// sub-unit remainder no asset could express. Borne by this holder,
    /// never by the remaining pool.
    pub shortfall: u128,

    /// The basket pushed to the holder, in draw order.
    pub payouts: Vec<AssetPayout>,

    /// When the withdrawal settled (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Report returned by [`Pool::rebalance`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebalanceReport {
    /// The rebalanced pool.
    pub pool: Uuid,

    /// Total pool value at the time of the call.
    pub total_value: u128,

    /// Normalized idle value before any movement.
    pub idle_before: u128,

    /// Policy target for idle value.
    pub target_idle: u128,

    /// Value credited by the strategy for newly invested funds.
    pub invested: u128,

    /// Value realized back from the strategy.
    pub recalled: u128,

    /// Requested-but-unrealized recall value.
    pub recall_shortfall: u128,

    /// When the rebalance ran (UTC).
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Operation Guard
// ---------------------------------------------------------------------------

/// RAII guard serializing mutating pool operations.
///
/// Dropped on every exit path, including early error returns, so a failed
/// operation never wedges the pool.
struct OpGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for OpGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// A pooled multi-asset vault issuing fungible shares against deposits.
///
/// The pool owns a custody account on the shared token ledger
/// (`pool:<uuid>`) where idle funds live, and consults its controller for
/// the currently active strategy. Share accounting is internal.
///
/// # Thread Safety
///
/// `Pool` is `Send + Sync` and is normally shared via `Arc`. Mutating
/// operations are serialized by the operation guard; a second caller
/// arriving mid-operation gets [`PoolError::ReentrantCall`] rather than
/// an interleaved execution.
pub struct Pool {
    /// Registry identity of this pool.
    id: Uuid,

    /// Ledger account holding idle funds (`pool:<uuid>`).
    custody: String,

    /// The assets this pool accepts, in registration order.
    assets: AssetSet,

    /// Shared token ledger where all real balances live.
    ledger: Arc<TokenLedger>,

    /// Registry answering "which strategy is active for me".
    controller: Arc<Controller>,

    /// Idle-reserve policy applied on rebalance.
    policy: AllocationPolicy,

    /// Claim-token accounting for this pool's shares.
    shares: RwLock<ShareLedger>,

    /// Set while a mutating operation is in flight.
    op_flag: Arc<AtomicBool>,

    /// Timestamp when this pool was created.
    created_at: DateTime<Utc>,
}

impl Pool {
    /// Creates a pool over the given ledger, controller, and asset set.
    ///
    /// The pool starts empty: zero shares, zero custody balances. It is
    /// not registered with the controller automatically; that is an admin
    /// action.
    pub fn new(
        ledger: Arc<TokenLedger>,
        controller: Arc<Controller>,
        assets: AssetSet,
        policy: AllocationPolicy,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            custody: format!("pool:{id}"),
            assets,
            ledger,
            controller,
            policy,
            shares: RwLock::new(ShareLedger::new()),
            op_flag: Arc::new(AtomicBool::new(false)),
            created_at: Utc::now(),
        }
    }

    /// Registry identity of this pool.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The ledger account holding this pool's idle funds. Depositors
    /// approve this account before calling [`deposit`](Self::deposit).
    pub fn custody_account(&self) -> &str {
        &self.custody
    }

    /// The supported asset set, in registration order.
    pub fn assets(&self) -> &AssetSet {
        &self.assets
    }

    /// The idle-reserve policy.
    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// When this pool was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Total pool value: normalized idle custody balances plus the active
    /// strategy's reported position value.
    ///
    /// Always computed fresh; never cached, never touches the operation
    /// guard. Safe to call from anywhere, including strategy code running
    /// inside a pool operation.
    pub fn total_value(&self) -> Result<u128, PoolError> {
        let strategy = self.controller.strategy_of(&self.id);
        self.pool_value(strategy.as_deref())
    }

    /// Normalized value of idle custody balances only.
    pub fn idle_value(&self) -> Result<u128, PoolError> {
        let mut total: u128 = 0;
        for info in self.assets.iter() {
            let balance = self.ledger.balance_of(&info.id, &self.custody);
            let value = normalize(balance, info.decimals)?;
            total = math::checked_add(total, value)?;
        }
        Ok(total)
    }

    /// The holder's share balance.
    pub fn share_balance(&self, holder: &str) -> u128 {
        self.shares.read().balance_of(holder)
    }

    /// Total outstanding shares.
    pub fn share_supply(&self) -> u128 {
        self.shares.read().total_supply()
    }

    /// All non-zero share holdings as `(holder, shares)` pairs.
    pub fn share_holders(&self) -> Vec<(String, u128)> {
        self.shares.read().holders()
    }

    /// Normalized value of one whole share (18-decimal precision).
    /// Returns the bootstrap price of exactly one common unit while the
    /// supply is zero.
    pub fn price_per_share(&self) -> Result<u128, PoolError> {
        let supply = self.share_supply();
        if supply == 0 {
            return Ok(COMMON_UNIT);
        }
        Ok(math::mul_div(self.total_value()?, COMMON_UNIT, supply)?)
    }

    // -----------------------------------------------------------------------
    // Deposit
    // -----------------------------------------------------------------------

    /// Deposits `amount` native units of `asset`, minting shares priced
    /// against the pool's value before the deposit.
    ///
    /// The depositor must have approved this pool's custody account for
    /// at least `amount` on the token ledger. The first deposit into an
    /// empty pool mints shares 1:1 with normalized value; later deposits
    /// mint `supply * value / value_before` (floor).
    ///
    /// All fallible arithmetic runs before the token pull, so a failure
    /// never leaves pulled tokens behind.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroAmount`], [`PoolError::UnsupportedAsset`],
    /// [`PoolError::DepositTooSmall`] if the amount would mint zero
    /// shares, [`PoolError::Ledger`] if the pull fails, or
    /// [`PoolError::ReentrantCall`].
    pub fn deposit(
        &self,
        depositor: &str,
        asset: &AssetId,
        amount: u128,
    ) -> Result<DepositReceipt, PoolError> {
        let _guard = self.begin_op()?;

        if amount == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let decimals = self
            .assets
            .get(asset)
            .ok_or(PoolError::UnsupportedAsset(*asset))?
            .decimals;
        let value = normalize(amount, decimals)?;

        let strategy = self.controller.strategy_of(&self.id);
        let value_before = self.pool_value(strategy.as_deref())?;
        let supply = self.share_supply();

        let shares_to_mint = if supply == 0 {
            value
        } else {
            math::mul_div(supply, value, value_before)?
        };
        if shares_to_mint == 0 {
            return Err(PoolError::DepositTooSmall {
                asset: *asset,
                amount,
            });
        }
        // Rule out supply overflow before the pull; the mint below must
        // not be able to fail once the depositor's tokens have moved.
        math::checked_add(supply, shares_to_mint)?;

        self.ledger
            .transfer_from(asset, &self.custody, depositor, &self.custody, amount)?;

        let supply_after = {
            let mut shares = self.shares.write();
            shares.mint(depositor, shares_to_mint)?;
            shares.total_supply()
        };

        tracing::info!(
            pool = %self.id,
            depositor,
            asset = %asset,
            amount,
            value,
            shares = shares_to_mint,
            "deposit accepted"
        );

        Ok(DepositReceipt {
            pool: self.id,
            depositor: depositor.to_string(),
            asset: *asset,
            amount,
            value,
            shares_minted: shares_to_mint,
            share_supply: supply_after,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Withdraw
    // -----------------------------------------------------------------------

    /// Burns `share_amount` of the holder's shares and pays out a
    /// proportional basket of pool assets.
    ///
    /// The basket is drawn from idle custody first (largest normalized
    /// balance first, registration order breaking ties). If idle funds
    /// cannot cover the entitlement and a strategy is active, the
    /// remainder is requested from the strategy; whatever the strategy
    /// fails to realize reduces the payout, not the burn. When the last
    /// outstanding shares are redeemed, every remaining idle unit is
    /// swept so no dust is stranded in custody.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroShares`], [`PoolError::Shares`] if the
    /// holder's balance is insufficient, [`PoolError::Strategy`] on a
    /// hard venue failure, or [`PoolError::ReentrantCall`]. A strategy
    /// shortfall is NOT an error; it is reported in the receipt. A hard
    /// failure aborts the whole withdrawal: the burn is undone and the
    /// holder's shares read exactly as before the call.
    pub fn withdraw(&self, holder: &str, share_amount: u128) -> Result<WithdrawReceipt, PoolError> {
        let _guard = self.begin_op()?;

        if share_amount == 0 {
            return Err(PoolError::ZeroShares);
        }

        let strategy = self.controller.strategy_of(&self.id);
        let value_before = self.pool_value(strategy.as_deref())?;
        let supply_before = self.share_supply();

        // Burn up front. Once the claim is gone, nothing downstream --
        // including a re-entrant call out of the strategy -- can redeem
        // these shares a second time.
        self.shares.write().burn(holder, share_amount)?;

        match self.settle_withdrawal(
            holder,
            share_amount,
            value_before,
            supply_before,
            strategy.as_deref(),
        ) {
            Ok(receipt) => Ok(receipt),
            Err(fault) => {
                // An abort after the burn must put the claim back, or the
                // holder's stake would be silently donated to the
                // remaining holders. Restoring the exact amount just
                // burned cannot overflow the supply it came out of.
                self.shares.write().mint(holder, share_amount)?;
                tracing::error!(
                    pool = %self.id,
                    holder,
                    shares = share_amount,
                    error = %fault,
                    "withdrawal aborted; burned shares restored"
                );
                Err(fault)
            }
        }
    }

    /// Settlement half of [`withdraw`](Self::withdraw): planning, the
    /// strategy draw, and the payout transfers, run after the burn.
    ///
    /// Every fallible step runs before the first token leaves custody;
    /// each transfer then pushes a leg earmarked from live balances, so
    /// once paying starts nothing can abort. The caller compensates the
    /// burn if this returns an error.
    fn settle_withdrawal(
        &self,
        holder: &str,
        share_amount: u128,
        value_before: u128,
        supply_before: u128,
        strategy: Option<&dyn Strategy>,
    ) -> Result<WithdrawReceipt, PoolError> {
        let is_final = share_amount == supply_before;

        // supply_before >= share_amount > 0 here, or the burn would
        // have failed.
        let entitlement = math::mul_div(value_before, share_amount, supply_before)?;

        let plan = plan_basket(&self.idle_rows(), entitlement)?;
        let mut payouts = plan.payouts;

        if plan.unmet > 0 {
            if let Some(strategy) = strategy {
                let outcome = strategy.withdraw(plan.unmet)?;
                if outcome.shortfall() > 0 {
                    tracing::warn!(
                        pool = %self.id,
                        holder,
                        requested = outcome.requested,
                        realized = outcome.realized,
                        "strategy realized less than requested"
                    );
                }
                if outcome.realized > 0 {
                    // The venue paid into custody; plan the realized value
                    // against the refreshed balances, net of legs already
                    // earmarked.
                    let refreshed = self.idle_rows_net_of(&payouts);
                    let second = plan_basket(&refreshed, outcome.realized)?;
                    merge_payouts(&mut payouts, second.payouts);
                }
            }
        }

        if is_final {
            let leftover = self.idle_rows_net_of(&payouts);
            merge_payouts(&mut payouts, plan_full_sweep(&leftover)?);
        }

        let mut value_paid: u128 = 0;
        for leg in &payouts {
            // Every leg was earmarked from live custody balances, so
            // these pushes cannot come up short.
            self.ledger
                .transfer(&leg.asset, &self.custody, holder, leg.amount)?;
            value_paid += leg.value;
        }
        let shortfall = entitlement.saturating_sub(value_paid);

        tracing::info!(
            pool = %self.id,
            holder,
            shares = share_amount,
            entitlement,
            value_paid,
            shortfall,
            full_redemption = is_final,
            "withdrawal settled"
        );

        Ok(WithdrawReceipt {
            pool: self.id,
            holder: holder.to_string(),
            shares_burned: share_amount,
            entitlement,
            value_paid,
            shortfall,
            payouts,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Rebalance
    // -----------------------------------------------------------------------

    /// Moves funds between idle custody and the active strategy until
    /// idle value matches the policy target.
    ///
    /// Callable by anyone: the policy fully determines the outcome, so
    /// there is nothing a caller can steer. With no registered strategy
    /// the call is a logged no-op. Idempotent up to flooring: a second
    /// immediate call finds idle already on target and moves nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Strategy`] on a hard venue failure or
    /// [`PoolError::ReentrantCall`]. Recall shortfalls are reported in
    /// the report, not raised.
    pub fn rebalance(&self) -> Result<RebalanceReport, PoolError> {
        let _guard = self.begin_op()?;

        let strategy = match self.controller.strategy_of(&self.id) {
            Some(strategy) => strategy,
            None => {
                let idle = self.idle_value()?;
                tracing::info!(pool = %self.id, idle, "rebalance skipped: no active strategy");
                return Ok(RebalanceReport {
                    pool: self.id,
                    total_value: idle,
                    idle_before: idle,
                    target_idle: self.policy.target_idle(idle)?,
                    invested: 0,
                    recalled: 0,
                    recall_shortfall: 0,
                    timestamp: Utc::now(),
                });
            }
        };

        let idle_before = self.idle_value()?;
        let total = math::checked_add(idle_before, strategy.current_value())?;
        let target = self.policy.target_idle(total)?;
        let surplus = self.policy.surplus(total, idle_before)?;
        let deficit = self.policy.deficit(total, idle_before)?;

        let mut invested: u128 = 0;
        let mut recalled: u128 = 0;
        let mut recall_shortfall: u128 = 0;

        if surplus > 0 {
            // Deploy the surplus, largest idle holding first. The plan is
            // cut by face value; entry fees show up as credited < planned,
            // never as a change to what leaves idle custody.
            let plan = plan_basket(&self.idle_rows(), surplus)?;
            for leg in &plan.payouts {
                let credited = strategy.invest(&leg.asset, leg.amount)?;
                invested = math::checked_add(invested, credited)?;
            }
            if invested < plan.planned_value() {
                tracing::warn!(
                    pool = %self.id,
                    planned = plan.planned_value(),
                    credited = invested,
                    "venue credited less than the deployed value"
                );
            }
        } else if deficit > 0 {
            let recall = deficit.min(strategy.current_value());
            if recall > 0 {
                let outcome = strategy.withdraw(recall)?;
                recalled = outcome.realized;
                recall_shortfall = outcome.shortfall();
            }
        }

        tracing::info!(
            pool = %self.id,
            total,
            idle_before,
            target,
            invested,
            recalled,
            "rebalance complete"
        );

        Ok(RebalanceReport {
            pool: self.id,
            total_value: total,
            idle_before,
            target_idle: target,
            invested,
            recalled,
            recall_shortfall,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Share Transfers
    // -----------------------------------------------------------------------

    /// Moves shares between holders. Pool value and share supply are
    /// untouched, so the price per share cannot change.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroShares`], [`PoolError::Shares`] on
    /// insufficient balance, or [`PoolError::ReentrantCall`].
    pub fn transfer_shares(&self, from: &str, to: &str, amount: u128) -> Result<(), PoolError> {
        let _guard = self.begin_op()?;

        if amount == 0 {
            return Err(PoolError::ZeroShares);
        }
        self.shares.write().transfer(from, to, amount)?;

        tracing::info!(pool = %self.id, from, to, amount, "shares transferred");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    /// Acquires the operation guard, rejecting overlapping operations.
    fn begin_op(&self) -> Result<OpGuard, PoolError> {
        if self.op_flag.swap(true, Ordering::Acquire) {
            return Err(PoolError::ReentrantCall);
        }
        Ok(OpGuard {
            flag: Arc::clone(&self.op_flag),
        })
    }

    /// Idle value plus the given strategy's position value.
    fn pool_value(&self, strategy: Option<&dyn Strategy>) -> Result<u128, PoolError> {
        let mut total = self.idle_value()?;
        if let Some(strategy) = strategy {
            total = math::checked_add(total, strategy.current_value())?;
        }
        Ok(total)
    }

    /// Snapshot of custody balances, in asset registration order.
    fn idle_rows(&self) -> Vec<IdleBalance> {
        self.assets
            .iter()
            .map(|info| IdleBalance {
                asset: info.id,
                decimals: info.decimals,
                amount: self.ledger.balance_of(&info.id, &self.custody),
            })
            .collect()
    }

    /// Snapshot of custody balances with already-earmarked legs deducted.
    fn idle_rows_net_of(&self, earmarked: &[AssetPayout]) -> Vec<IdleBalance> {
        let mut taken: HashMap<AssetId, u128> = HashMap::new();
        for leg in earmarked {
            *taken.entry(leg.asset).or_insert(0) += leg.amount;
        }

        self.assets
            .iter()
            .map(|info| {
                let balance = self.ledger.balance_of(&info.id, &self.custody);
                let reserved = taken.get(&info.id).copied().unwrap_or(0);
                IdleBalance {
                    asset: info.id,
                    decimals: info.decimals,
                    amount: balance.saturating_sub(reserved),
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("custody", &self.custody)
            .field("assets", &self.assets.len())
            .field("share_supply", &self.share_supply())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{dai, usdc, usdt, Asset, AssetInfo};
    use crate::config::DEFAULT_RESERVE_BPS;

    const ADMIN: &str = "admin";
    const ALICE: &str = "alice";
    const BOB: &str = "bob";

    const USDC_UNIT: u128 = 1_000_000;

    fn setup() -> (Arc<TokenLedger>, Arc<Controller>, Pool) {
        let ledger = Arc::new(TokenLedger::new());
        let controller = Arc::new(Controller::new(ADMIN));

        let mut assets = AssetSet::new();
        assets.register(dai()).unwrap();
        assets.register(usdc()).unwrap();
        assets.register(usdt()).unwrap();

        let pool = Pool::new(
            Arc::clone(&ledger),
            Arc::clone(&controller),
            assets,
            AllocationPolicy::default(),
        );
        (ledger, controller, pool)
    }

    /// Mints `amount` to `holder` and approves the pool's custody account.
    fn fund(ledger: &TokenLedger, pool: &Pool, holder: &str, asset: &AssetInfo, amount: u128) {
        ledger.mint(&asset.id, holder, amount).unwrap();
        ledger.approve(&asset.id, holder, pool.custody_account(), amount);
    }

    #[test]
    fn new_pool_is_empty() {
        let (_, _, pool) = setup();
        assert_eq!(pool.share_supply(), 0);
        assert_eq!(pool.total_value().unwrap(), 0);
        assert_eq!(pool.price_per_share().unwrap(), COMMON_UNIT);
        assert!(pool.custody_account().starts_with("pool:"));
        assert_eq!(pool.policy().reserve_bps(), DEFAULT_RESERVE_BPS);
    }

    #[test]
    fn bootstrap_deposit_mints_normalized_shares() {
        let (ledger, _, pool) = setup();
        let usdc = usdc();
        // 1,000,000 USDC in native 6-decimal units.
        let amount = 1_000_000 * USDC_UNIT;
        fund(&ledger, &pool, ALICE, &usdc, amount);

        let receipt = pool.deposit(ALICE, &usdc.id, amount).unwrap();

        let expected_value = 1_000_000 * COMMON_UNIT;
        assert_eq!(receipt.value, expected_value);
        assert_eq!(receipt.shares_minted, expected_value);
        assert_eq!(pool.share_balance(ALICE), expected_value);
        assert_eq!(pool.total_value().unwrap(), expected_value);
        assert_eq!(ledger.balance_of(&usdc.id, pool.custody_account()), amount);
        assert_eq!(ledger.balance_of(&usdc.id, ALICE), 0);
    }

    #[test]
    fn deposit_zero_rejected() {
        let (_, _, pool) = setup();
        let result = pool.deposit(ALICE, &dai().id, 0);
        assert!(matches!(result, Err(PoolError::ZeroAmount)));
    }

    #[test]
    fn deposit_unsupported_asset_rejected() {
        let (ledger, _, pool) = setup();
        let other = Asset::new("Wrapped Ether", "WETH", 18);
        fund(&ledger, &pool, ALICE, &other, COMMON_UNIT);

        let result = pool.deposit(ALICE, &other.id, COMMON_UNIT);
        assert!(matches!(result, Err(PoolError::UnsupportedAsset(_))));
    }

    #[test]
    fn deposit_without_allowance_aborts_cleanly() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        ledger.mint(&dai.id, ALICE, 100 * COMMON_UNIT).unwrap();
        // No approve.

        let result = pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT);

        assert!(matches!(
            result,
            Err(PoolError::Ledger(LedgerError::InsufficientAllowance { .. }))
        ));
        assert_eq!(pool.share_supply(), 0);
        assert_eq!(ledger.balance_of(&dai.id, ALICE), 100 * COMMON_UNIT);
    }

    #[test]
    fn equal_value_deposits_mint_equal_shares() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        let usdc = usdc();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        fund(&ledger, &pool, BOB, &usdc, 100 * USDC_UNIT);

        pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();
        pool.deposit(BOB, &usdc.id, 100 * USDC_UNIT).unwrap();

        // Same value, different decimals: identical claims.
        assert_eq!(pool.share_balance(ALICE), pool.share_balance(BOB));
        assert_eq!(pool.total_value().unwrap(), 200 * COMMON_UNIT);
    }

    #[test]
    fn deposit_after_yield_mints_fewer_shares() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();

        // Double the pool's value without minting shares.
        ledger
            .mint(&dai.id, pool.custody_account(), 100 * COMMON_UNIT)
            .unwrap();

        fund(&ledger, &pool, BOB, &dai, 100 * COMMON_UNIT);
        let receipt = pool.deposit(BOB, &dai.id, 100 * COMMON_UNIT).unwrap();

        // Bob buys in at twice the price: half the shares.
        assert_eq!(receipt.shares_minted, 50 * COMMON_UNIT);
        assert_eq!(pool.price_per_share().unwrap(), 2 * COMMON_UNIT);
    }

    #[test]
    fn dust_deposit_that_mints_nothing_is_rejected() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        fund(&ledger, &pool, ALICE, &dai, 1_000_000 * COMMON_UNIT);
        pool.deposit(ALICE, &dai.id, 1_000_000 * COMMON_UNIT).unwrap();

        // Inflate the share price 10x, then try to deposit 9 wei of DAI:
        // supply * 9 / value_before floors to zero shares.
        ledger
            .mint(&dai.id, pool.custody_account(), 9_000_000 * COMMON_UNIT)
            .unwrap();
        fund(&ledger, &pool, BOB, &dai, 9);

        let result = pool.deposit(BOB, &dai.id, 9);

        assert!(matches!(result, Err(PoolError::DepositTooSmall { .. })));
        assert_eq!(ledger.balance_of(&dai.id, BOB), 9);
        assert_eq!(pool.share_balance(BOB), 0);
    }

    #[test]
    fn withdraw_pays_proportional_basket() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        let usdc = usdc();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        fund(&ledger, &pool, ALICE, &usdc, 100 * USDC_UNIT);
        pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();
        pool.deposit(ALICE, &usdc.id, 100 * USDC_UNIT).unwrap();

        let receipt = pool.withdraw(ALICE, 100 * COMMON_UNIT).unwrap();

        // Half the shares redeem half the pool's value.
        assert_eq!(receipt.entitlement, 100 * COMMON_UNIT);
        assert_eq!(receipt.value_paid, 100 * COMMON_UNIT);
        assert_eq!(receipt.shortfall, 0);
        // Both holdings are worth 100: registration order puts DAI first.
        assert_eq!(receipt.payouts[0].asset, dai.id);
        assert_eq!(receipt.payouts[0].amount, 100 * COMMON_UNIT);
        assert_eq!(pool.share_balance(ALICE), 100 * COMMON_UNIT);
        assert_eq!(pool.total_value().unwrap(), 100 * COMMON_UNIT);
    }

    #[test]
    fn withdraw_zero_shares_rejected() {
        let (_, _, pool) = setup();
        assert!(matches!(pool.withdraw(ALICE, 0), Err(PoolError::ZeroShares)));
    }

    #[test]
    fn withdraw_insufficient_shares_aborts() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();

        let result = pool.withdraw(ALICE, 200 * COMMON_UNIT);

        assert!(matches!(
            result,
            Err(PoolError::Shares(ShareError::InsufficientShares { .. }))
        ));
        // Nothing moved.
        assert_eq!(pool.share_balance(ALICE), 100 * COMMON_UNIT);
        assert_eq!(pool.total_value().unwrap(), 100 * COMMON_UNIT);
        assert_eq!(ledger.balance_of(&dai.id, ALICE), 0);
    }

    #[test]
    fn final_redemption_sweeps_all_idle_units() {
        let (ledger, _, pool) = setup();
        let usdc = usdc();
        // An awkward amount, prone to flooring residue.
        let amount = 123_456_789u128;
        fund(&ledger, &pool, ALICE, &usdc, amount);
        pool.deposit(ALICE, &usdc.id, amount).unwrap();

        let supply = pool.share_supply();
        let receipt = pool.withdraw(ALICE, supply).unwrap();

        assert_eq!(receipt.shortfall, 0);
        assert_eq!(ledger.balance_of(&usdc.id, ALICE), amount);
        assert_eq!(ledger.balance_of(&usdc.id, pool.custody_account()), 0);
        // Supply zero and value zero, together.
        assert_eq!(pool.share_supply(), 0);
        assert_eq!(pool.total_value().unwrap(), 0);
    }

    #[test]
    fn rebalance_without_strategy_is_a_noop() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();

        let report = pool.rebalance().unwrap();

        assert_eq!(report.invested, 0);
        assert_eq!(report.recalled, 0);
        assert_eq!(report.total_value, 100 * COMMON_UNIT);
        assert_eq!(
            ledger.balance_of(&dai.id, pool.custody_account()),
            100 * COMMON_UNIT
        );
    }

    #[test]
    fn transfer_shares_preserves_price_and_supply() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();

        let price_before = pool.price_per_share().unwrap();
        let supply_before = pool.share_supply();

        pool.transfer_shares(ALICE, BOB, 40 * COMMON_UNIT).unwrap();

        assert_eq!(pool.share_balance(ALICE), 60 * COMMON_UNIT);
        assert_eq!(pool.share_balance(BOB), 40 * COMMON_UNIT);
        assert_eq!(pool.share_supply(), supply_before);
        assert_eq!(pool.price_per_share().unwrap(), price_before);

        // The transferee's claim is real: bob can redeem it.
        let receipt = pool.withdraw(BOB, 40 * COMMON_UNIT).unwrap();
        assert_eq!(receipt.value_paid, 40 * COMMON_UNIT);
        assert_eq!(ledger.balance_of(&dai.id, BOB), 40 * COMMON_UNIT);
    }

    #[test]
    fn transfer_zero_shares_rejected() {
        let (_, _, pool) = setup();
        assert!(matches!(
            pool.transfer_shares(ALICE, BOB, 0),
            Err(PoolError::ZeroShares)
        ));
    }

    #[test]
    fn guard_releases_after_failed_operation() {
        let (ledger, _, pool) = setup();
        let dai = dai();

        // A failing withdraw must not wedge the pool.
        assert!(pool.withdraw(ALICE, 1).is_err());

        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);
        assert!(pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).is_ok());
    }

    #[test]
    fn receipts_serialize_roundtrip() {
        let (ledger, _, pool) = setup();
        let dai = dai();
        fund(&ledger, &pool, ALICE, &dai, 100 * COMMON_UNIT);

        let deposit = pool.deposit(ALICE, &dai.id, 100 * COMMON_UNIT).unwrap();
        let json = serde_json::to_string(&deposit).expect("serialize");
        let recovered: DepositReceipt = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered.shares_minted, deposit.shares_minted);

        let withdraw = pool.withdraw(ALICE, 30 * COMMON_UNIT).unwrap();
        let json = serde_json::to_string(&withdraw).expect("serialize");
        let recovered: WithdrawReceipt = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(recovered.value_paid, withdraw.value_paid);
        assert_eq!(recovered.payouts.len(), withdraw.payouts.len());
    }
}
