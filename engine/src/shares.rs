//! # Share Ledger
//!
//! The pool's claim token. Every depositor holds shares -- a single
//! fungible unit at common precision, regardless of how many underlying
//! assets the pool custodies. Supply moves only through mint (deposit) and
//! burn (withdrawal); holder-to-holder transfer moves claims around without
//! touching supply or pool value.
//!
//! A [`ShareLedger`] is owned exclusively by its pool and mutated only
//! inside pool transitions, so it is a plain map with `&mut` methods --
//! no interior mutability, no locks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during share ledger operations.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Zero-share mints, burns, and transfers are rejected.
    #[error("zero share amount")]
    ZeroAmount,

    /// Attempted to burn or transfer more shares than the holder owns.
    #[error("insufficient shares: {holder} holds {available}, requested {requested}")]
    InsufficientShares {
        /// The holder being debited.
        holder: String,
        /// Share balance at the time of the failed operation.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// A mint would overflow total supply.
    #[error("share supply overflow: current {current}, mint {increment}")]
    SupplyOverflow {
        /// Supply before the failed mint.
        current: u128,
        /// The amount that caused the overflow.
        increment: u128,
    },
}

// ---------------------------------------------------------------------------
// ShareLedger
// ---------------------------------------------------------------------------

/// Per-holder share balances plus total supply.
///
/// Invariant: `total_supply == sum(balances)` after every operation,
/// successful or failed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShareLedger {
    /// Share balances by holder address.
    balances: HashMap<String, u128>,

    /// Total outstanding shares.
    total_supply: u128,
}

impl ShareLedger {
    /// Creates an empty share ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints `amount` shares to `holder`.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::ZeroAmount`] or [`ShareError::SupplyOverflow`];
    /// on error nothing changes.
    pub fn mint(&mut self, holder: &str, amount: u128) -> Result<u128, ShareError> {
        if amount == 0 {
            return Err(ShareError::ZeroAmount);
        }

        self.total_supply =
            self.total_supply
                .checked_add(amount)
                .ok_or(ShareError::SupplyOverflow {
                    current: self.total_supply,
                    increment: amount,
                })?;

        let balance = self.balances.entry(holder.to_string()).or_insert(0);
        // Cannot overflow: every balance is bounded by total supply, which
        // was checked above.
        *balance += amount;
        Ok(*balance)
    }

    /// Burns `amount` shares from `holder`.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::ZeroAmount`] or
    /// [`ShareError::InsufficientShares`]; on error nothing changes.
    pub fn burn(&mut self, holder: &str, amount: u128) -> Result<u128, ShareError> {
        if amount == 0 {
            return Err(ShareError::ZeroAmount);
        }

        let balance =
            self.balances
                .get_mut(holder)
                .ok_or_else(|| ShareError::InsufficientShares {
                    holder: holder.to_string(),
                    available: 0,
                    requested: amount,
                })?;

        if *balance < amount {
            return Err(ShareError::InsufficientShares {
                holder: holder.to_string(),
                available: *balance,
                requested: amount,
            });
        }

        *balance -= amount;
        let remaining = *balance;
        // Supply tracks the sum of balances, so this cannot underflow.
        self.total_supply -= amount;
        Ok(remaining)
    }

    /// Transfers `amount` shares between holders. Supply is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ShareError::ZeroAmount`] or
    /// [`ShareError::InsufficientShares`]; on error nothing changes.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u128) -> Result<(), ShareError> {
        if amount == 0 {
            return Err(ShareError::ZeroAmount);
        }

        let available = self.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(ShareError::InsufficientShares {
                holder: from.to_string(),
                available,
                requested: amount,
            });
        }

        // Same-holder transfer is a no-op once the balance check passed.
        if from == to {
            return Ok(());
        }

        *self.balances.entry(from.to_string()).or_insert(0) -= amount;
        // Bounded by total supply, cannot overflow.
        *self.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }

    /// Returns the holder's share balance.
    pub fn balance_of(&self, holder: &str) -> u128 {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// Returns total outstanding shares.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Returns all non-zero holdings as `(holder, shares)` pairs.
    pub fn holders(&self) -> Vec<(String, u128)> {
        self.balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(holder, balance)| (holder.clone(), *balance))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
