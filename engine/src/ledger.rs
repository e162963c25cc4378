//! # Token Ledger
//!
//! An in-memory multi-asset fungible-token ledger with standard semantics:
//! balances, allowances, push transfers, and pull transfers. This is the
//! transfer primitive the pool custodies funds through -- depositors approve
//! the pool's custody account and the pool pulls; payouts and strategy
//! movements are pushes between custody accounts.
//!
//! The ledger is shared (`Arc<TokenLedger>`) between the pool, its
//! strategies, and whatever drives them. Interior mutability is per-entry;
//! cross-entry consistency comes from the engine's serialized-transition
//! model, with explicit compensation on the one failure path (recipient
//! overflow) that could otherwise strand value mid-transfer.
//!
//! Two invariants hold after every successful or failed operation:
//! per-asset `sum(balances) == total_supply`, and a failed operation leaves
//! every balance and allowance exactly as it found them.

use dashmap::DashMap;
use std::collections::HashMap;
use thiserror::Error;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Zero-amount moves are rejected outright. Nothing good ever comes
    /// from a zero transfer except a misleading event trail.
    #[error("zero amount")]
    ZeroAmount,

    /// Attempted to move more than the holder's balance.
    #[error(
        "insufficient balance: {holder} holds {available} of asset {asset}, requested {requested}"
    )]
    InsufficientBalance {
        /// The asset being debited.
        asset: AssetId,
        /// The account being debited.
        holder: String,
        /// Balance at the time of the failed debit.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Pull transfer exceeds the allowance granted to the spender.
    #[error(
        "insufficient allowance: {owner} granted {spender} {available} of asset {asset}, requested {requested}"
    )]
    InsufficientAllowance {
        /// The asset being pulled.
        asset: AssetId,
        /// The account that granted the allowance.
        owner: String,
        /// The account attempting the pull.
        spender: String,
        /// Remaining allowance.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// A credit would overflow the recipient's balance.
    #[error("balance overflow: {holder} at {current}, credit {credit} (asset {asset})")]
    BalanceOverflow {
        /// The asset being credited.
        asset: AssetId,
        /// The account being credited.
        holder: String,
        /// Balance before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },

    /// A mint would overflow the asset's total supply.
    #[error("supply overflow: asset {asset} at {current}, mint {increment}")]
    SupplyOverflow {
        /// The asset being minted.
        asset: AssetId,
        /// Supply before the failed mint.
        current: u128,
        /// The amount that caused the overflow.
        increment: u128,
    },
}

// ---------------------------------------------------------------------------
// TokenLedger
// ---------------------------------------------------------------------------

/// Shared in-memory fungible-token ledger.
///
/// Balances are keyed by `(asset, holder)`, allowances by
/// `(asset, owner, spender)`. Accounts are plain string addresses; an
/// account with no entry simply holds zero.
#[derive(Debug, Default)]
pub struct TokenLedger {
    /// `(asset, holder) -> balance` in the asset's native smallest units.
    balances: DashMap<(AssetId, String), u128>,

    /// `(asset, owner, spender) -> remaining allowance`. An approve
    /// overwrites; a pull decrements.
    allowances: DashMap<(AssetId, String, String), u128>,

    /// Per-asset total minted supply.
    supplies: DashMap<AssetId, u128>,
}

impl TokenLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // -- queries ------------------------------------------------------------

    /// Returns the holder's balance of `asset` in native units.
    pub fn balance_of(&self, asset: &AssetId, holder: &str) -> u128 {
        self.balances
            .get(&(*asset, holder.to_string()))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    /// Returns the total minted supply of `asset`.
    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        self.supplies.get(asset).map(|entry| *entry).unwrap_or(0)
    }

    /// Returns the remaining allowance `owner` has granted `spender`.
    pub fn allowance(&self, asset: &AssetId, owner: &str, spender: &str) -> u128 {
        self.allowances
            .get(&(*asset, owner.to_string(), spender.to_string()))
            .map(|entry| *entry)
            .unwrap_or(0)
    }

    /// Returns the holder's non-zero balances across all assets.
    pub fn holdings(&self, holder: &str) -> HashMap<AssetId, u128> {
        self.balances
            .iter()
            .filter(|entry| entry.key().1 == holder && *entry.value() > 0)
            .map(|entry| (entry.key().0, *entry.value()))
            .collect()
    }

    /// Sums every holder's balance of `asset`. Audit helper: must equal
    /// [`total_supply`](Self::total_supply) at all times.
    pub fn sum_of_balances(&self, asset: &AssetId) -> u128 {
        self.balances
            .iter()
            .filter(|entry| entry.key().0 == *asset)
            .map(|entry| *entry.value())
            .sum()
    }

    // -- issuance -----------------------------------------------------------

    /// Mints `amount` of `asset` into `holder`'s balance.
    ///
    /// Minting models value entering the ledger from outside -- genesis
    /// funding in tests, yield materializing at a venue. Supply and balance
    /// move together or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`], [`LedgerError::SupplyOverflow`]
    /// or [`LedgerError::BalanceOverflow`]; on any error nothing changes.
    pub fn mint(&self, asset: &AssetId, holder: &str, amount: u128) -> Result<u128, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        {
            let mut supply = self.supplies.entry(*asset).or_insert(0);
            let new_supply = supply
                .checked_add(amount)
                .ok_or(LedgerError::SupplyOverflow {
                    asset: *asset,
                    current: *supply,
                    increment: amount,
                })?;
            *supply = new_supply;
        }

        match self.credit(asset, holder, amount) {
            Ok(new_balance) => Ok(new_balance),
            Err(err) => {
                // Compensate the supply bump so the failed mint is a no-op.
                let mut supply = self.supplies.entry(*asset).or_insert(0);
                *supply -= amount;
                Err(err)
            }
        }
    }

    // -- transfers ----------------------------------------------------------

    /// Push transfer: moves `amount` of `asset` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`],
    /// [`LedgerError::InsufficientBalance`] or
    /// [`LedgerError::BalanceOverflow`]; on any error both balances are
    /// unchanged.
    pub fn transfer(
        &self,
        asset: &AssetId,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        self.debit(asset, from, amount)?;

        if let Err(err) = self.credit(asset, to, amount) {
            // Refund the debit. This cannot overflow: the units just left
            // this very balance.
            let mut entry = self.balances.entry((*asset, from.to_string())).or_insert(0);
            *entry += amount;
            return Err(err);
        }

        Ok(())
    }

    /// Grants `spender` an allowance of `amount` over `owner`'s balance of
    /// `asset`. An absolute grant: each approve overwrites the previous
    /// value, and approving zero revokes.
    pub fn approve(&self, asset: &AssetId, owner: &str, spender: &str, amount: u128) {
        self.allowances
            .insert((*asset, owner.to_string(), spender.to_string()), amount);
    }

    /// Pull transfer: `spender` moves `amount` of `asset` from `from` to
    /// `to`, consuming allowance.
    ///
    /// The allowance is reserved before the balance moves and restored if
    /// the move fails, so a failed pull leaves both untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`],
    /// [`LedgerError::InsufficientAllowance`],
    /// [`LedgerError::InsufficientBalance`] or
    /// [`LedgerError::BalanceOverflow`].
    pub fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &str,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }

        let key = (*asset, from.to_string(), spender.to_string());
        {
            let mut entry = self.allowances.entry(key.clone()).or_insert(0);
            if *entry < amount {
                return Err(LedgerError::InsufficientAllowance {
                    asset: *asset,
                    owner: from.to_string(),
                    spender: spender.to_string(),
                    available: *entry,
                    requested: amount,
                });
            }
            *entry -= amount;
        }

        match self.transfer(asset, from, to, amount) {
            Ok(()) => Ok(()),
            Err(err) => {
                // Restore the reserved allowance; the transfer moved nothing.
                let mut entry = self.allowances.entry(key).or_insert(0);
                *entry += amount;
                Err(err)
            }
        }
    }

    // -- internals ----------------------------------------------------------

    fn debit(&self, asset: &AssetId, holder: &str, amount: u128) -> Result<u128, LedgerError> {
        let mut entry = self.balances.entry((*asset, holder.to_string())).or_insert(0);
        if *entry < amount {
            return Err(LedgerError::InsufficientBalance {
                asset: *asset,
                holder: holder.to_string(),
                available: *entry,
                requested: amount,
            });
        }
        *entry -= amount;
        Ok(*entry)
    }

    fn credit(&self, asset: &AssetId, holder: &str, amount: u128) -> Result<u128, LedgerError> {
        let mut entry = self.balances.entry((*asset, holder.to_string())).or_insert(0);
        let new_balance = entry.checked_add(amount).ok_or(LedgerError::BalanceOverflow {
            asset: *asset,
            holder: holder.to_string(),
            current: *entry,
            credit: amount,
        })?;
        *entry = new_balance;
        Ok(new_balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
