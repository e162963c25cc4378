//! # Canonical Vault Session
//!
//! Wires a complete in-memory Basin deployment -- token ledger, three
//! stablecoins of mixed precision, controller, pool, fixed-rate venue --
//! and drives it through the canonical lifecycle:
//!
//! 1. Three depositors each supply one asset.
//! 2. Rebalance deploys the surplus above the idle reserve to the venue.
//! 3. For each depositor in order: accrue yield, rebalance, redeem their
//!    full share balance.
//!
//! The last redemption empties the pool, so the session doubles as a live
//! check of the books: share supply and pool value must both land on zero,
//! and every unit of deposited value must be accounted for between the
//! holders' payouts and whatever the venue retained in fees.
//!
//! Every receipt the engine produces is collected into a [`SessionReport`]
//! and emitted as JSON on stdout (or to a file via `--out`).

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use basin_engine::asset::{self, AssetInfo, AssetSet};
use basin_engine::controller::Controller;
use basin_engine::ledger::TokenLedger;
use basin_engine::pool::{
    AllocationPolicy, DepositReceipt, Pool, RebalanceReport, WithdrawReceipt,
};
use basin_engine::value::normalize;
use basin_strategies::fixed_rate::{FixedRateVenue, VenueConfig};
use basin_strategies::venue::YieldVenue;
use basin_strategies::venue_strategy::VenueStrategy;

use crate::cli::SimulateArgs;
use crate::logging::{self, LogFormat};

/// Ledger account of the simulated admin operating the controller.
const ADMIN: &str = "admin";

/// Name of the simulated yield venue.
const VENUE_NAME: &str = "carry";

/// The simulated depositors, in deposit and redemption order. Each brings
/// one asset of the three-coin basket.
const DEPOSITORS: [&str; 3] = ["alice", "bob", "john"];

// ---------------------------------------------------------------------------
// Session report
// ---------------------------------------------------------------------------

/// Everything the canonical session produced, in execution order.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    /// Identity of the simulated pool.
    pub pool: Uuid,
    /// Parameters the session ran with, after flag/env resolution.
    pub parameters: SessionParameters,
    /// One receipt per depositor, in deposit order.
    pub deposits: Vec<DepositReceipt>,
    /// Every rebalance pass: the initial deployment plus one per cycle.
    pub rebalances: Vec<RebalanceReport>,
    /// Yield minted by the venue in each accrual period.
    pub accruals: Vec<AccrualRecord>,
    /// One receipt per depositor, in redemption order.
    pub withdrawals: Vec<WithdrawReceipt>,
    /// Where the money ended up.
    pub outcome: SessionOutcome,
}

/// Session inputs, echoed into the report so a saved run is reproducible.
#[derive(Debug, Serialize)]
pub struct SessionParameters {
    /// Whole tokens deposited by each depositor.
    pub deposit_whole_units: u64,
    /// Venue APY in basis points.
    pub apy_bps: u32,
    /// Pool idle reserve in basis points.
    pub reserve_bps: u32,
    /// Venue entry fee in basis points.
    pub entry_fee_bps: u32,
    /// Venue exit fee in basis points.
    pub exit_fee_bps: u32,
    /// Accrual period before each redemption, in days.
    pub accrual_days: Vec<u32>,
}

/// One simulated accrual period.
#[derive(Debug, Serialize)]
pub struct AccrualRecord {
    /// Length of the period in days.
    pub days: u32,
    /// Normalized value the venue minted as interest over the period.
    pub value_minted: u128,
}

/// Terminal state of the session.
#[derive(Debug, Serialize)]
pub struct SessionOutcome {
    /// Share supply after the final redemption. Zero on a clean run.
    pub final_share_supply: u128,
    /// Pool value after the final redemption. Zero on a clean run.
    pub final_pool_value: u128,
    /// Normalized value left in venue custody: retained fees plus
    /// precision dust. Zero when the venue charges no fees.
    pub venue_retained: u128,
    /// Per-depositor totals.
    pub holders: Vec<HolderOutcome>,
}

/// What one depositor put in and took out.
#[derive(Debug, Serialize)]
pub struct HolderOutcome {
    /// Depositor's ledger account.
    pub name: String,
    /// Normalized value credited at deposit time.
    pub value_deposited: u128,
    /// Normalized value actually paid out across their redemption.
    pub value_redeemed: u128,
    /// Entitlement the redemption could not cover, if any.
    pub shortfall: u128,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Runs the canonical session and emits the JSON report.
pub fn run(args: SimulateArgs) -> Result<()> {
    logging::init_logging(
        "basin=info,basin_engine=info,basin_strategies=info",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let report = execute(&args)?;

    let json =
        serde_json::to_string_pretty(&report).context("failed to encode session report")?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(path = %path.display(), "session report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}

/// Wires the deployment and drives the full lifecycle.
///
/// Split from [`run`] so integration tests can execute a session without
/// touching logging or stdout.
pub fn execute(args: &SimulateArgs) -> Result<SessionReport> {
    anyhow::ensure!(args.deposit > 0, "deposit must be nonzero");
    anyhow::ensure!(
        args.accrual_days.len() == DEPOSITORS.len(),
        "expected {} accrual periods (one per depositor), got {}",
        DEPOSITORS.len(),
        args.accrual_days.len()
    );

    // --- Wiring ---
    let roster: Vec<AssetInfo> = vec![asset::dai(), asset::usdc(), asset::usdt()];
    let mut assets = AssetSet::new();
    for info in &roster {
        assets
            .register(info.clone())
            .with_context(|| format!("failed to register {}", info.symbol))?;
    }

    let ledger = Arc::new(TokenLedger::new());
    let controller = Arc::new(Controller::new(ADMIN));
    let policy = AllocationPolicy::new(args.reserve_bps)
        .context("invalid reserve configuration")?;
    let pool = Pool::new(
        Arc::clone(&ledger),
        Arc::clone(&controller),
        assets.clone(),
        policy,
    );
    controller
        .add_pool(ADMIN, pool.id())
        .context("failed to register pool with controller")?;

    let venue = Arc::new(
        FixedRateVenue::new(
            VENUE_NAME,
            Arc::clone(&ledger),
            assets.clone(),
            VenueConfig {
                apy_bps: args.apy_bps,
                entry_fee_bps: args.entry_fee_bps,
                exit_fee_bps: args.exit_fee_bps,
            },
        )
        .context("invalid venue configuration")?,
    );
    controller
        .update_strategy(
            ADMIN,
            pool.id(),
            Arc::new(VenueStrategy::new(pool.custody_account(), Arc::clone(&venue))),
        )
        .context("failed to install venue strategy")?;

    tracing::info!(
        pool = %pool.id(),
        venue = VENUE_NAME,
        apy_bps = args.apy_bps,
        reserve_bps = args.reserve_bps,
        "deployment wired"
    );

    // --- Funding ---
    // Whole units scaled by at most 10^18 cannot overflow u128 from a u64.
    for (name, info) in DEPOSITORS.iter().zip(&roster) {
        let amount = args.deposit as u128 * 10u128.pow(info.decimals as u32);
        ledger
            .mint(&info.id, name, amount)
            .with_context(|| format!("failed to fund {name}"))?;
        ledger.approve(&info.id, name, pool.custody_account(), amount);
    }

    // --- Deposits ---
    let mut deposits = Vec::with_capacity(DEPOSITORS.len());
    for (name, info) in DEPOSITORS.iter().zip(&roster) {
        let amount = args.deposit as u128 * 10u128.pow(info.decimals as u32);
        let receipt = pool
            .deposit(name, &info.id, amount)
            .with_context(|| format!("deposit by {name} failed"))?;
        deposits.push(receipt);
    }

    // --- Initial rebalance ---
    let mut rebalances = Vec::new();
    rebalances.push(pool.rebalance().context("initial rebalance failed")?);

    // --- Accrual cycles ---
    let mut accruals = Vec::with_capacity(args.accrual_days.len());
    let mut withdrawals = Vec::with_capacity(DEPOSITORS.len());
    for (days, name) in args.accrual_days.iter().copied().zip(DEPOSITORS) {
        let value_minted = venue
            .accrue(Duration::days(days as i64))
            .with_context(|| format!("accrual of {days} days failed"))?;
        accruals.push(AccrualRecord { days, value_minted });

        rebalances.push(
            pool.rebalance()
                .with_context(|| format!("rebalance before {name}'s redemption failed"))?,
        );

        let price = pool.price_per_share().context("share pricing failed")?;
        tracing::info!(days, value_minted, price_per_share = price, "accrual cycle complete");

        let shares = pool.share_balance(name);
        let receipt = pool
            .withdraw(name, shares)
            .with_context(|| format!("redemption by {name} failed"))?;
        withdrawals.push(receipt);
    }

    // --- Outcome ---
    let mut venue_retained: u128 = 0;
    for info in &roster {
        let balance = ledger.balance_of(&info.id, venue.custody_account());
        venue_retained += normalize(balance, info.decimals)
            .context("venue residue valuation overflowed")?;
    }

    let holders = DEPOSITORS
        .iter()
        .zip(&deposits)
        .zip(&withdrawals)
        .map(|((name, deposit), withdrawal)| HolderOutcome {
            name: name.to_string(),
            value_deposited: deposit.value,
            value_redeemed: withdrawal.value_paid,
            shortfall: withdrawal.shortfall,
        })
        .collect();

    let outcome = SessionOutcome {
        final_share_supply: pool.share_supply(),
        final_pool_value: pool.total_value().context("final valuation failed")?,
        venue_retained,
        holders,
    };

    tracing::info!(
        final_share_supply = outcome.final_share_supply,
        final_pool_value = outcome.final_pool_value,
        venue_retained = outcome.venue_retained,
        "session complete"
    );

    Ok(SessionReport {
        pool: pool.id(),
        parameters: SessionParameters {
            deposit_whole_units: args.deposit,
            apy_bps: args.apy_bps,
            reserve_bps: args.reserve_bps,
            entry_fee_bps: args.entry_fee_bps,
            exit_fee_bps: args.exit_fee_bps,
            accrual_days: args.accrual_days.clone(),
        },
        deposits,
        rebalances,
        accruals,
        withdrawals,
        outcome,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
