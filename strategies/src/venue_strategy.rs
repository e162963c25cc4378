//! # Venue-Backed Strategy
//!
//! The adapter that closes the loop: it implements the engine's
//! `Strategy` boundary over any [`YieldVenue`], translating pool-side
//! invest/withdraw calls into venue deposits and clamped payouts.
//!
//! The adapter is bound at construction to the pool custody account it
//! serves. `invest` pulls from there, `withdraw` pays back into it; the
//! pool never learns the venue's account and the venue never learns about
//! shares.

use std::sync::Arc;
use uuid::Uuid;

use basin_engine::asset::AssetId;
use basin_engine::strategy::{Strategy, StrategyError, StrategyWithdrawal};

use crate::venue::{VenueError, YieldVenue};

/// Engine-facing strategy wrapping a shared venue handle.
///
/// The venue stays shared (`Arc`): whoever wired the strategy keeps a
/// handle for venue-side operations such as interest accrual, while the
/// controller installs this adapter into the pool's registry slot.
pub struct VenueStrategy<V: YieldVenue> {
    id: Uuid,
    kind: String,
    pool_custody: String,
    venue: Arc<V>,
}

impl<V: YieldVenue> VenueStrategy<V> {
    /// Binds `venue` to the pool custody account it will serve.
    pub fn new(pool_custody: &str, venue: Arc<V>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: format!("venue:{}", venue.name()),
            pool_custody: pool_custody.to_string(),
            venue,
        }
    }

    /// Lifts a venue fault into the engine's error vocabulary. Ledger and
    /// arithmetic faults pass through; everything else becomes a venue
    /// rejection.
    fn venue_fault(&self, err: VenueError) -> StrategyError {
        match err {
            VenueError::Ledger(inner) => StrategyError::Ledger(inner),
            VenueError::Math(inner) => StrategyError::Math(inner),
            other => StrategyError::Venue {
                venue: self.venue.name().to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl<V: YieldVenue> Strategy for VenueStrategy<V> {
    fn id(&self) -> Uuid {
        self.id
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn invest(&self, asset: &AssetId, amount: u128) -> Result<u128, StrategyError> {
        self.venue
            .deposit(&self.pool_custody, asset, amount)
            .map_err(|err| self.venue_fault(err))
    }

    fn withdraw(&self, value: u128) -> Result<StrategyWithdrawal, StrategyError> {
        let realized = self
            .venue
            .withdraw(&self.pool_custody, value)
            .map_err(|err| self.venue_fault(err))?;
        Ok(StrategyWithdrawal {
            requested: value,
            realized,
        })
    }

    fn current_value(&self) -> u128 {
        self.venue.position_value()
    }
}

impl<V: YieldVenue> std::fmt::Debug for VenueStrategy<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VenueStrategy")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("pool_custody", &self.pool_custody)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_rate::{FixedRateVenue, VenueConfig};
    use basin_engine::asset::{dai, usdc, AssetSet};
    use basin_engine::config::COMMON_UNIT;
    use basin_engine::ledger::{LedgerError, TokenLedger};
    use chrono::Duration;

    const POOL: &str = "pool:test";
    const USDC_UNIT: u128 = 1_000_000;

    fn setup(config: VenueConfig) -> (
        Arc<TokenLedger>,
        Arc<FixedRateVenue>,
        VenueStrategy<FixedRateVenue>,
    ) {
        let ledger = Arc::new(TokenLedger::new());
        let mut assets = AssetSet::new();
        assets.register(dai()).unwrap();
        assets.register(usdc()).unwrap();

        let venue = Arc::new(
            FixedRateVenue::new("carry", Arc::clone(&ledger), assets, config).unwrap(),
        );
        let strategy = VenueStrategy::new(POOL, Arc::clone(&venue));
        (ledger, venue, strategy)
    }

    #[test]
    fn invest_moves_pool_funds_into_the_venue() {
        let (ledger, venue, strategy) = setup(VenueConfig::default());
        let usdc = usdc();
        ledger.mint(&usdc.id, POOL, 1_000 * USDC_UNIT).unwrap();

        let credited = strategy.invest(&usdc.id, 1_000 * USDC_UNIT).unwrap();

        assert_eq!(credited, 1_000 * COMMON_UNIT);
        assert_eq!(strategy.current_value(), 1_000 * COMMON_UNIT);
        assert_eq!(ledger.balance_of(&usdc.id, POOL), 0);
        assert_eq!(
            ledger.balance_of(&usdc.id, venue.custody_account()),
            1_000 * USDC_UNIT
        );
    }

    #[test]
    fn invest_without_funds_is_a_ledger_fault() {
        let (_, _, strategy) = setup(VenueConfig::default());
        let result = strategy.invest(&usdc().id, 1_000 * USDC_UNIT);
        assert!(matches!(
            result,
            Err(StrategyError::Ledger(LedgerError::InsufficientBalance { .. }))
        ));
    }

    #[test]
    fn invest_in_unknown_asset_is_a_venue_rejection() {
        let (ledger, _, strategy) = setup(VenueConfig::default());
        let other = basin_engine::asset::Asset::new("Wrapped Ether", "WETH", 18);
        ledger.mint(&other.id, POOL, COMMON_UNIT).unwrap();

        let result = strategy.invest(&other.id, COMMON_UNIT);
        assert!(matches!(result, Err(StrategyError::Venue { .. })));
    }

    #[test]
    fn withdraw_reports_requested_and_realized() {
        let config = VenueConfig {
            apy_bps: 500,
            entry_fee_bps: 0,
            exit_fee_bps: 200, // 2%
        };
        let (ledger, _, strategy) = setup(config);
        let usdc = usdc();
        ledger.mint(&usdc.id, POOL, 1_000 * USDC_UNIT).unwrap();
        strategy.invest(&usdc.id, 1_000 * USDC_UNIT).unwrap();

        let outcome = strategy.withdraw(500 * COMMON_UNIT).unwrap();

        assert_eq!(outcome.requested, 500 * COMMON_UNIT);
        assert_eq!(outcome.realized, 490 * COMMON_UNIT);
        assert_eq!(outcome.shortfall(), 10 * COMMON_UNIT);
        assert!(!outcome.is_complete());
        assert_eq!(ledger.balance_of(&usdc.id, POOL), 490 * USDC_UNIT);
    }

    #[test]
    fn withdraw_all_drains_the_position() {
        let (ledger, venue, strategy) = setup(VenueConfig::default());
        let dai = dai();
        ledger.mint(&dai.id, POOL, 10_000 * COMMON_UNIT).unwrap();
        strategy.invest(&dai.id, 10_000 * COMMON_UNIT).unwrap();
        venue.accrue(Duration::days(365)).unwrap();

        let outcome = strategy.withdraw_all().unwrap();

        assert_eq!(outcome.requested, 10_500 * COMMON_UNIT);
        assert_eq!(outcome.realized, 10_500 * COMMON_UNIT);
        assert_eq!(strategy.current_value(), 0);
        assert_eq!(ledger.balance_of(&dai.id, POOL), 10_500 * COMMON_UNIT);
    }

    #[test]
    fn current_value_tracks_accrual() {
        let (ledger, venue, strategy) = setup(VenueConfig::default());
        let usdc = usdc();
        ledger.mint(&usdc.id, POOL, 10_000 * USDC_UNIT).unwrap();
        strategy.invest(&usdc.id, 10_000 * USDC_UNIT).unwrap();

        assert_eq!(strategy.current_value(), 10_000 * COMMON_UNIT);
        venue.accrue(Duration::days(73)).unwrap();
        assert_eq!(strategy.current_value(), 10_100 * COMMON_UNIT);
    }

    #[test]
    fn kind_names_the_venue() {
        let (_, _, strategy) = setup(VenueConfig::default());
        assert_eq!(strategy.kind(), "venue:carry");
    }
}
