//! Full vault sessions against the fixed-rate venue.
//!
//! The engine's own integration tests drive the pool with scripted mock
//! strategies; these tests close the loop with the real thing: a
//! [`FixedRateVenue`] accruing linear interest behind a [`VenueStrategy`],
//! three depositors of mixed-precision stablecoins, and a controller
//! swapping venues mid-flight.
//!
//! The centerpiece is the canonical 210-day session: three deposits, a
//! deployment rebalance, then three accrue/rebalance/redeem cycles. The
//! final redemption must close the books exactly -- every unit of
//! deposited value plus every unit of minted interest lands with a
//! holder, and nothing is stranded in pool or venue custody.

use std::sync::Arc;

use chrono::Duration;

use basin_engine::asset::{dai, usdc, usdt, AssetInfo, AssetSet};
use basin_engine::config::COMMON_UNIT;
use basin_engine::controller::Controller;
use basin_engine::ledger::TokenLedger;
use basin_engine::math;
use basin_engine::pool::{AllocationPolicy, Pool};
use basin_strategies::fixed_rate::{FixedRateVenue, VenueConfig};
use basin_strategies::venue::YieldVenue;
use basin_strategies::venue_strategy::VenueStrategy;

const ADMIN: &str = "admin";
const ALICE: &str = "alice";
const BOB: &str = "bob";
const JOHN: &str = "john";

/// Whole units each depositor brings.
const DEPOSIT_WHOLE: u128 = 1_000_000;

/// Normalized value of one native unit of a 6-decimal asset. Planner
/// flooring can strand at most this much per redemption as dust.
const MICRO_UNIT_VALUE: u128 = 1_000_000_000_000;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Wires a ledger, controller, and registered pool over the three-coin
/// basket, with the default 5% idle reserve.
fn setup() -> (Arc<TokenLedger>, Arc<Controller>, Pool, AssetSet) {
    let ledger = Arc::new(TokenLedger::new());
    let controller = Arc::new(Controller::new(ADMIN));

    let mut assets = AssetSet::new();
    assets.register(dai()).unwrap();
    assets.register(usdc()).unwrap();
    assets.register(usdt()).unwrap();

    let pool = Pool::new(
        Arc::clone(&ledger),
        Arc::clone(&controller),
        assets.clone(),
        AllocationPolicy::default(),
    );
    controller.add_pool(ADMIN, pool.id()).unwrap();
    (ledger, controller, pool, assets)
}

/// Creates a venue with the given config and installs it as the pool's
/// active strategy. Returns the venue so tests can accrue and inspect.
fn install_venue(
    controller: &Controller,
    pool: &Pool,
    ledger: &Arc<TokenLedger>,
    assets: &AssetSet,
    name: &str,
    config: VenueConfig,
) -> Arc<FixedRateVenue> {
    let venue =
        Arc::new(FixedRateVenue::new(name, Arc::clone(ledger), assets.clone(), config).unwrap());
    let strategy = VenueStrategy::new(pool.custody_account(), Arc::clone(&venue));
    controller
        .update_strategy(ADMIN, pool.id(), Arc::new(strategy))
        .unwrap();
    venue
}

/// Mints, approves, and deposits `whole` units of `asset` for `holder`.
fn deposit_whole(
    ledger: &TokenLedger,
    pool: &Pool,
    holder: &str,
    asset: &AssetInfo,
    whole: u128,
) -> u128 {
    let amount = whole * 10u128.pow(asset.decimals as u32);
    ledger.mint(&asset.id, holder, amount).unwrap();
    ledger.approve(&asset.id, holder, pool.custody_account(), amount);
    pool.deposit(holder, &asset.id, amount).unwrap().value
}

/// Normalized value sitting in `account` across the whole basket.
fn account_value(ledger: &TokenLedger, assets: &AssetSet, account: &str) -> u128 {
    assets
        .iter()
        .map(|info| {
            let balance = ledger.balance_of(&info.id, account);
            basin_engine::value::normalize(balance, info.decimals).unwrap()
        })
        .sum()
}

// ---------------------------------------------------------------------------
// 1. The Canonical Session
// ---------------------------------------------------------------------------

#[test]
fn canonical_session_closes_the_books_exactly() {
    let (ledger, controller, pool, assets) = setup();
    let venue = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "carry",
        VenueConfig::default(),
    );

    // Three depositors, one asset each, equal value.
    let deposited = deposit_whole(&ledger, &pool, ALICE, &dai(), DEPOSIT_WHOLE)
        + deposit_whole(&ledger, &pool, BOB, &usdc(), DEPOSIT_WHOLE)
        + deposit_whole(&ledger, &pool, JOHN, &usdt(), DEPOSIT_WHOLE);
    assert_eq!(deposited, 3 * DEPOSIT_WHOLE * COMMON_UNIT);
    assert_eq!(pool.share_supply(), 3 * DEPOSIT_WHOLE * COMMON_UNIT);

    // Deploy: 5% reserve on 3M of value leaves 150k idle.
    let deploy = pool.rebalance().unwrap();
    assert_eq!(deploy.target_idle, 150_000 * COMMON_UNIT);
    assert_eq!(deploy.invested, 2_850_000 * COMMON_UNIT);
    assert_eq!(venue.position_value(), 2_850_000 * COMMON_UNIT);

    // Cycle: accrue, rebalance, redeem -- alice at day 30, bob at day
    // 120, john at day 210.
    let mut minted_total: u128 = 0;
    let mut payouts = Vec::new();
    for (days, holder) in [(30i64, ALICE), (90, BOB), (90, JOHN)] {
        minted_total += venue.accrue(Duration::days(days)).unwrap();
        pool.rebalance().unwrap();
        payouts.push(pool.withdraw(holder, pool.share_balance(holder)).unwrap());
    }

    // No fees: nothing beyond planner dust ever comes up short. The
    // first redemption draws from a deep 18-decimal DAI position and the
    // last one drains the venue exactly, so both settle to the wei; the
    // middle one may strand a sub-unit remainder no 6-decimal asset can
    // express.
    assert_eq!(payouts[0].shortfall, 0);
    assert!(payouts[1].shortfall < MICRO_UNIT_VALUE);
    assert_eq!(payouts[2].shortfall, 0);

    // Longer exposure earns more, and everyone beats their principal.
    assert!(payouts[0].value_paid > DEPOSIT_WHOLE * COMMON_UNIT);
    assert!(payouts[1].value_paid > payouts[0].value_paid);
    assert!(payouts[2].value_paid > payouts[1].value_paid);

    // Exact conservation: deposits plus minted interest, nothing else.
    let paid_total: u128 = payouts.iter().map(|receipt| receipt.value_paid).sum();
    assert_eq!(paid_total, deposited + minted_total);

    // The books are closed everywhere.
    assert_eq!(pool.share_supply(), 0);
    assert_eq!(pool.total_value().unwrap(), 0);
    assert_eq!(venue.position_value(), 0);
    assert_eq!(account_value(&ledger, &assets, pool.custody_account()), 0);
    assert_eq!(account_value(&ledger, &assets, venue.custody_account()), 0);
}

#[test]
fn first_redemption_entitlement_matches_share_math() {
    let (ledger, controller, pool, assets) = setup();
    let venue = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "carry",
        VenueConfig::default(),
    );

    deposit_whole(&ledger, &pool, ALICE, &dai(), DEPOSIT_WHOLE);
    deposit_whole(&ledger, &pool, BOB, &usdc(), DEPOSIT_WHOLE);
    deposit_whole(&ledger, &pool, JOHN, &usdt(), DEPOSIT_WHOLE);
    pool.rebalance().unwrap();

    let minted = venue.accrue(Duration::days(30)).unwrap();
    pool.rebalance().unwrap();

    let value_before = 3 * DEPOSIT_WHOLE * COMMON_UNIT + minted;
    assert_eq!(pool.total_value().unwrap(), value_before);

    let receipt = pool.withdraw(ALICE, pool.share_balance(ALICE)).unwrap();

    // One third of the supply claims one third of the grown pool.
    let expected = math::mul_div(
        value_before,
        DEPOSIT_WHOLE * COMMON_UNIT,
        3 * DEPOSIT_WHOLE * COMMON_UNIT,
    )
    .unwrap();
    assert_eq!(receipt.entitlement, expected);
    assert_eq!(receipt.value_paid, expected);
}

// ---------------------------------------------------------------------------
// 2. Reserve Maintenance
// ---------------------------------------------------------------------------

#[test]
fn accrued_yield_raises_the_target_and_gets_recalled() {
    let (ledger, controller, pool, assets) = setup();
    let venue = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "carry",
        VenueConfig::default(),
    );

    // DAI only, so every recall is exactly expressible in 18 decimals.
    deposit_whole(&ledger, &pool, ALICE, &dai(), DEPOSIT_WHOLE);
    pool.rebalance().unwrap();

    let idle_before = pool.idle_value().unwrap();
    assert_eq!(idle_before, 50_000 * COMMON_UNIT);

    let minted = venue.accrue(Duration::days(365)).unwrap();
    assert!(minted > 0);

    let report = pool.rebalance().unwrap();
    let total = DEPOSIT_WHOLE * COMMON_UNIT + minted;

    assert_eq!(report.total_value, total);
    assert_eq!(report.recalled, report.target_idle - idle_before);
    assert_eq!(report.recall_shortfall, 0);
    assert_eq!(pool.idle_value().unwrap(), report.target_idle);
}

// ---------------------------------------------------------------------------
// 3. Fees and Shortfall
// ---------------------------------------------------------------------------

#[test]
fn exit_fees_become_withdrawal_shortfalls_and_venue_revenue() {
    let (ledger, controller, pool, assets) = setup();
    let venue = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "tollbooth",
        VenueConfig {
            apy_bps: 0,
            entry_fee_bps: 0,
            exit_fee_bps: 200,
        },
    );

    deposit_whole(&ledger, &pool, ALICE, &dai(), DEPOSIT_WHOLE);
    pool.rebalance().unwrap();

    // Entitlement 500k against 50k idle: 450k requested from the venue,
    // which keeps 2% of it.
    let receipt = pool
        .withdraw(ALICE, pool.share_balance(ALICE) / 2)
        .unwrap();

    assert_eq!(receipt.entitlement, 500_000 * COMMON_UNIT);
    assert_eq!(receipt.value_paid, 491_000 * COMMON_UNIT);
    assert_eq!(receipt.shortfall, 9_000 * COMMON_UNIT);

    // The fee did not vanish: it sits in venue custody, outside the
    // position the venue reports.
    let venue_balance = account_value(&ledger, &assets, venue.custody_account());
    assert_eq!(venue_balance - venue.position_value(), 9_000 * COMMON_UNIT);
}

#[test]
fn entry_fees_reduce_the_credited_position_not_the_reserve() {
    let (ledger, controller, pool, assets) = setup();
    let venue = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "tollbooth",
        VenueConfig {
            apy_bps: 0,
            entry_fee_bps: 200,
            exit_fee_bps: 0,
        },
    );

    deposit_whole(&ledger, &pool, ALICE, &dai(), DEPOSIT_WHOLE);
    let report = pool.rebalance().unwrap();

    // The planner deploys the full 950k surplus; the venue keeps 2% on
    // the way in, so the credited position is 931k.
    assert_eq!(report.target_idle, 50_000 * COMMON_UNIT);
    assert_eq!(report.invested, 931_000 * COMMON_UNIT);
    assert_eq!(venue.position_value(), 931_000 * COMMON_UNIT);

    // Idle still lands exactly on target: the fee came out of the
    // credited position, not the reserve, so the pass cannot overshoot.
    assert_eq!(pool.idle_value().unwrap(), report.target_idle);

    // The fee sits in venue custody outside the reported position.
    let venue_balance = account_value(&ledger, &assets, venue.custody_account());
    assert_eq!(venue_balance - venue.position_value(), 19_000 * COMMON_UNIT);

    // The shrunken total lowers the next target, so the follow-up pass
    // deploys the freed 950 rather than recalling anything.
    let second = pool.rebalance().unwrap();
    assert_eq!(second.target_idle, 49_050 * COMMON_UNIT);
    assert_eq!(second.invested, 931 * COMMON_UNIT);
    assert_eq!(second.recalled, 0);
}

// ---------------------------------------------------------------------------
// 4. Venue Migration
// ---------------------------------------------------------------------------

#[test]
fn controller_migration_moves_the_position_between_venues() {
    let (ledger, controller, pool, assets) = setup();
    let alpha = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "alpha",
        VenueConfig::default(),
    );

    deposit_whole(&ledger, &pool, ALICE, &dai(), DEPOSIT_WHOLE);
    pool.rebalance().unwrap();
    let minted = alpha.accrue(Duration::days(365)).unwrap();
    let total = DEPOSIT_WHOLE * COMMON_UNIT + minted;

    // Swapping venues drains alpha back into pool custody first.
    let beta = install_venue(
        &controller,
        &pool,
        &ledger,
        &assets,
        "beta",
        VenueConfig::default(),
    );

    assert_eq!(alpha.position_value(), 0);
    assert_eq!(account_value(&ledger, &assets, alpha.custody_account()), 0);
    assert_eq!(pool.idle_value().unwrap(), total);
    assert_eq!(pool.total_value().unwrap(), total);

    // The next rebalance deploys into beta, and value is still intact.
    let report = pool.rebalance().unwrap();
    assert_eq!(report.invested, beta.position_value());
    assert!(beta.position_value() > 0);
    assert_eq!(pool.total_value().unwrap(), total);
}
