//! # Yield Venue Boundary
//!
//! A venue is anywhere pool funds can sit and earn: a lending market, an
//! AMM position, a treasury desk. Basin models venues behind one narrow
//! trait so the strategy layer can treat them uniformly, and so tests can
//! substitute scripted ones.
//!
//! The contract that matters: [`YieldVenue::withdraw`] clamps. Asking for
//! more value than the position holds is not an error -- the venue pays
//! what it can and reports the realized value. Hard errors are reserved
//! for genuine breakage (ledger faults, configuration mistakes).

use thiserror::Error;

use basin_engine::asset::AssetId;
use basin_engine::ledger::LedgerError;
use basin_engine::math::MathError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur at the venue boundary.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Zero-amount deposits are rejected up front.
    #[error("zero-amount operations are not permitted")]
    ZeroAmount,

    /// The venue does not deal in this asset.
    #[error("venue {venue} does not accept asset {asset}")]
    UnsupportedAsset {
        /// The venue's display name.
        venue: String,
        /// The rejected asset.
        asset: AssetId,
    },

    /// A fee was configured above 100%.
    #[error("fee of {bps} bps exceeds the {max} bps denominator")]
    FeeOutOfRange {
        /// The rejected fee.
        bps: u32,
        /// The basis-point denominator.
        max: u32,
    },

    /// A token movement failed underneath the venue.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Checked arithmetic failed.
    #[error("arithmetic error: {0}")]
    Math(#[from] MathError),
}

// ---------------------------------------------------------------------------
// YieldVenue
// ---------------------------------------------------------------------------

/// An external place pool funds can be parked to earn yield.
///
/// Implementations custody real ledger balances in their own account;
/// `position_value` must always be payable in tokens the venue actually
/// holds.
pub trait YieldVenue: Send + Sync {
    /// Display name for logs and error messages.
    fn name(&self) -> &str;

    /// The ledger account where the venue custodies tokens.
    fn custody_account(&self) -> &str;

    /// Pulls `amount` native units of `asset` from `source` into venue
    /// custody and credits the position.
    ///
    /// Returns the normalized value actually credited, which may be below
    /// the deposit's face value when the venue charges an entry fee.
    ///
    /// # Errors
    ///
    /// Returns [`VenueError::ZeroAmount`],
    /// [`VenueError::UnsupportedAsset`], or [`VenueError::Ledger`] if the
    /// pull fails.
    fn deposit(&self, source: &str, asset: &AssetId, amount: u128) -> Result<u128, VenueError>;

    /// Pays tokens worth up to `value` (normalized) from the position to
    /// `beneficiary`.
    ///
    /// Clamps to the position's payable value; never errors on shortfall.
    /// Returns the normalized value actually paid, net of any exit fee.
    fn withdraw(&self, beneficiary: &str, value: u128) -> Result<u128, VenueError>;

    /// Current normalized value of the position, accrued yield included.
    fn position_value(&self) -> u128;
}
