//! # Fixed-Rate Venue
//!
//! A deterministic simulated venue paying linear interest at a fixed APY.
//! Useful for demos, integration tests, and exercising shortfall paths
//! (configure an exit fee and every withdrawal under-delivers).
//!
//! Honesty rule: the position is always backed by payable tokens. Interest
//! is not a number that drifts upward on its own -- `accrue` mints the
//! owed tokens into venue custody at the moment the position grows, so a
//! full drain can always be settled in real balances.
//!
//! Fees, where configured, are retained in the venue's custody account:
//! skimmed off the top at entry, withheld from the payout at exit. Either
//! way the difference between face value and credited/realized value
//! surfaces downstream as a reportable shortfall, never silently.

use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use basin_engine::asset::{AssetId, AssetSet};
use basin_engine::config::BPS_DENOMINATOR;
use basin_engine::ledger::TokenLedger;
use basin_engine::math;
use basin_engine::value::{denormalize, normalize, scaling_factor};

use crate::venue::{VenueError, YieldVenue};

/// Seconds in the venue's interest year (365 days).
const SECONDS_PER_YEAR: u128 = 31_536_000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Rate and fee parameters for a [`FixedRateVenue`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Annual interest rate in basis points (e.g., 500 = 5.00% APY).
    pub apy_bps: u32,

    /// Fee skimmed from each deposit, in basis points.
    pub entry_fee_bps: u32,

    /// Fee withheld from each withdrawal payout, in basis points.
    pub exit_fee_bps: u32,
}

impl Default for VenueConfig {
    /// 5% APY, no fees.
    fn default() -> Self {
        Self {
            apy_bps: 500,
            entry_fee_bps: 0,
            exit_fee_bps: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// FixedRateVenue
// ---------------------------------------------------------------------------

/// Per-asset position book. Native units, interest included.
///
/// Snapshots clone out through [`FixedRateVenue::book`] and serialize with
/// hex-encoded asset keys, so a venue's state can land in reports and test
/// fixtures as plain JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VenueBook {
    /// `asset -> native units` currently credited to the position.
    #[serde(with = "basin_engine::asset::asset_id_map")]
    pub holdings: HashMap<AssetId, u128>,

    /// Total simulated time advanced through [`FixedRateVenue::accrue`].
    pub elapsed_secs: u64,
}

/// Simulated fixed-APY venue custodying real ledger balances.
///
/// Value changes only through [`deposit`](YieldVenue::deposit),
/// [`withdraw`](YieldVenue::withdraw), and explicit
/// [`accrue`](Self::accrue) calls; nothing moves on wall-clock time.
pub struct FixedRateVenue {
    name: String,

    /// Ledger account holding principal, accrued interest, and retained
    /// fees (`venue:<name>`).
    account: String,

    ledger: Arc<TokenLedger>,

    /// Assets the venue deals in; decimals come from here.
    assets: AssetSet,

    config: VenueConfig,

    book: Mutex<VenueBook>,
}

impl FixedRateVenue {
    /// Creates a venue named `name` over the given ledger and asset set.
    ///
    /// # Errors
    ///
    /// Returns [`VenueError::FeeOutOfRange`] if either fee exceeds 100%.
    pub fn new(
        name: &str,
        ledger: Arc<TokenLedger>,
        assets: AssetSet,
        config: VenueConfig,
    ) -> Result<Self, VenueError> {
        for bps in [config.entry_fee_bps, config.exit_fee_bps] {
            if bps > BPS_DENOMINATOR {
                return Err(VenueError::FeeOutOfRange {
                    bps,
                    max: BPS_DENOMINATOR,
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            account: format!("venue:{name}"),
            ledger,
            assets,
            config,
            book: Mutex::new(VenueBook::default()),
        })
    }

    /// The venue's rate and fee configuration.
    pub fn config(&self) -> VenueConfig {
        self.config
    }

    /// Total simulated seconds advanced so far.
    pub fn elapsed_secs(&self) -> u64 {
        self.book.lock().elapsed_secs
    }

    /// Native units held for `asset`, interest included.
    pub fn holding(&self, asset: &AssetId) -> u128 {
        self.book.lock().holdings.get(asset).copied().unwrap_or(0)
    }

    /// Snapshot of the position book: per-asset holdings plus elapsed
    /// simulated time.
    pub fn book(&self) -> VenueBook {
        self.book.lock().clone()
    }

    /// Advances simulated time, minting linear interest on every holding.
    ///
    /// Interest per asset is `holding * apy_bps * seconds / (10_000 *
    /// seconds_per_year)`, floored, and is minted straight into venue
    /// custody so the grown position stays fully backed. Returns the total
    /// normalized value minted. Non-positive durations accrue nothing.
    ///
    /// # Errors
    ///
    /// Returns [`VenueError::Math`] on arithmetic overflow or
    /// [`VenueError::Ledger`] if minting fails.
    pub fn accrue(&self, elapsed: Duration) -> Result<u128, VenueError> {
        let secs = elapsed.num_seconds();
        if secs <= 0 {
            return Ok(0);
        }
        let secs = secs as u128;

        let mut book = self.book.lock();
        let mut minted_value: u128 = 0;

        for info in self.assets.iter() {
            let holding = match book.holdings.get_mut(&info.id) {
                Some(holding) => holding,
                None => continue,
            };
            let interest = math::mul_div(
                *holding,
                self.config.apy_bps as u128 * secs,
                BPS_DENOMINATOR as u128 * SECONDS_PER_YEAR,
            )?;
            if interest == 0 {
                continue;
            }

            self.ledger.mint(&info.id, &self.account, interest)?;
            // Bounded by venue custody, which the mint above just grew.
            *holding += interest;
            minted_value = math::checked_add(minted_value, normalize(interest, info.decimals)?)?;
        }

        book.elapsed_secs += elapsed.num_seconds() as u64;

        tracing::info!(
            venue = %self.name,
            days = elapsed.num_days(),
            minted_value,
            "interest accrued"
        );
        Ok(minted_value)
    }

    /// Normalized position value, saturating at the numeric ceiling.
    fn value_of(&self, amount: u128, decimals: u8) -> u128 {
        amount.saturating_mul(scaling_factor(decimals))
    }
}

impl YieldVenue for FixedRateVenue {
    fn name(&self) -> &str {
        &self.name
    }

    fn custody_account(&self) -> &str {
        &self.account
    }

    fn deposit(&self, source: &str, asset: &AssetId, amount: u128) -> Result<u128, VenueError> {
        if amount == 0 {
            return Err(VenueError::ZeroAmount);
        }
        let decimals = self
            .assets
            .get(asset)
            .ok_or_else(|| VenueError::UnsupportedAsset {
                venue: self.name.clone(),
                asset: *asset,
            })?
            .decimals;

        self.ledger.transfer(asset, source, &self.account, amount)?;

        let fee = math::bps_of(amount, self.config.entry_fee_bps)?;
        let credited = amount - fee;

        if credited > 0 {
            let mut book = self.book.lock();
            let holding = book.holdings.entry(*asset).or_insert(0);
            // Bounded by venue custody, which the transfer above grew.
            *holding += credited;
        }

        let credited_value = normalize(credited, decimals)?;
        tracing::debug!(
            venue = %self.name,
            asset = %asset,
            amount,
            fee,
            credited_value,
            "deposit credited"
        );
        Ok(credited_value)
    }

    fn withdraw(&self, beneficiary: &str, value: u128) -> Result<u128, VenueError> {
        let mut book = self.book.lock();
        let mut remaining = value;
        let mut realized: u128 = 0;

        for info in self.assets.iter() {
            if remaining == 0 {
                break;
            }
            let holding = match book.holdings.get_mut(&info.id) {
                Some(holding) => holding,
                None => continue,
            };

            let take = (*holding).min(denormalize(remaining, info.decimals));
            if take == 0 {
                continue;
            }

            let fee = math::bps_of(take, self.config.exit_fee_bps)?;
            let payout = take - fee;
            if payout > 0 {
                self.ledger
                    .transfer(&info.id, &self.account, beneficiary, payout)?;
            }

            // The whole take leaves the position; the fee part stays in
            // custody as venue revenue.
            *holding -= take;
            realized = math::checked_add(realized, normalize(payout, info.decimals)?)?;
            remaining = remaining.saturating_sub(normalize(take, info.decimals)?);
        }

        tracing::debug!(
            venue = %self.name,
            requested = value,
            realized,
            "withdrawal paid"
        );
        Ok(realized)
    }

    fn position_value(&self) -> u128 {
        let book = self.book.lock();
        let mut total: u128 = 0;
        for info in self.assets.iter() {
            if let Some(holding) = book.holdings.get(&info.id) {
                total = total.saturating_add(self.value_of(*holding, info.decimals));
            }
        }
        total
    }
}

impl std::fmt::Debug for FixedRateVenue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedRateVenue")
            .field("name", &self.name)
            .field("apy_bps", &self.config.apy_bps)
            .field("position_value", &self.position_value())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
