//! # Controller Registry
//!
//! The controller binds each pool to its currently active strategy. It is
//! deliberately small: one admin account, one map, three operations. Pools
//! hold an `Arc<Controller>` handle injected at construction -- there is no
//! global lookup, and a pool can only ever see the single strategy the
//! registry assigns to it.
//!
//! Strategy replacement is where the care goes. `update_strategy` drains
//! the outgoing strategy's position back into pool idle custody before the
//! replacement is installed, so value is never stranded in a venue nobody
//! is watching. If the drain fails, the old mapping stays -- a failed swap
//! must not leave the pool strategyless.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::strategy::{Strategy, StrategyError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The caller is not the controller admin.
    #[error("unauthorized registry action by {caller}")]
    Unauthorized {
        /// The rejected caller.
        caller: String,
    },

    /// The pool is already registered. Re-adding must never silently
    /// overwrite an active strategy mapping.
    #[error("pool {0} is already registered")]
    AlreadyRegistered(Uuid),

    /// The pool has never been registered.
    #[error("pool {0} is not registered")]
    UnknownPool(Uuid),

    /// Draining the outgoing strategy during a swap failed.
    #[error("strategy migration failed: {0}")]
    Migration(#[from] StrategyError),
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Admin-gated registry mapping pool ids to their active strategy.
///
/// A registered pool with no strategy yet maps to `None`; the pool treats
/// that the same as not being registered at all (rebalance becomes a
/// no-op, withdrawals are served from idle funds only).
pub struct Controller {
    /// The only account allowed to mutate the registry.
    admin: String,

    /// `pool id -> active strategy`, `None` until the first assignment.
    entries: DashMap<Uuid, Option<Arc<dyn Strategy>>>,
}

impl Controller {
    /// Creates a registry administered by `admin`.
    pub fn new(admin: impl Into<String>) -> Self {
        Self {
            admin: admin.into(),
            entries: DashMap::new(),
        }
    }

    /// Returns the admin account address.
    pub fn admin(&self) -> &str {
        &self.admin
    }

    /// Registers a pool with no strategy assigned.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Unauthorized`] for non-admin callers and
    /// [`ControllerError::AlreadyRegistered`] on re-registration.
    pub fn add_pool(&self, caller: &str, pool_id: Uuid) -> Result<(), ControllerError> {
        self.authorize(caller)?;

        match self.entries.entry(pool_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(ControllerError::AlreadyRegistered(pool_id))
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(None);
                tracing::info!(pool = %pool_id, "pool registered");
                Ok(())
            }
        }
    }

    /// Atomically replaces the active strategy for a registered pool.
    ///
    /// If the outgoing strategy holds value, its entire position is drained
    /// back to pool custody first; the realized migration value is
    /// returned. The replacement is installed only after a successful
    /// drain.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Unauthorized`],
    /// [`ControllerError::UnknownPool`], or
    /// [`ControllerError::Migration`] if the outgoing drain fails (the old
    /// mapping is kept in that case).
    pub fn update_strategy(
        &self,
        caller: &str,
        pool_id: Uuid,
        strategy: Arc<dyn Strategy>,
    ) -> Result<u128, ControllerError> {
        self.authorize(caller)?;

        let outgoing = self
            .entries
            .get(&pool_id)
            .ok_or(ControllerError::UnknownPool(pool_id))?
            .clone();

        let mut migrated = 0u128;
        if let Some(old) = outgoing {
            if old.current_value() > 0 {
                let outcome = old.withdraw_all()?;
                migrated = outcome.realized;
                tracing::info!(
                    pool = %pool_id,
                    old_strategy = %old.id(),
                    migrated,
                    shortfall = outcome.shortfall(),
                    "outgoing strategy drained"
                );
            }
        }

        tracing::info!(
            pool = %pool_id,
            strategy = %strategy.id(),
            kind = strategy.kind(),
            "strategy updated"
        );
        self.entries.insert(pool_id, Some(strategy));
        Ok(migrated)
    }

    /// Looks up the active strategy for a pool. Unregistered pools and
    /// pools awaiting their first assignment both return `None`.
    pub fn strategy_of(&self, pool_id: &Uuid) -> Option<Arc<dyn Strategy>> {
        self.entries
            .get(pool_id)
            .and_then(|entry| entry.clone())
    }

    /// Returns `true` if the pool has been registered (with or without a
    /// strategy).
    pub fn is_registered(&self, pool_id: &Uuid) -> bool {
        self.entries.contains_key(pool_id)
    }

    /// Number of registered pools.
    pub fn pool_count(&self) -> usize {
        self.entries.len()
    }

    fn authorize(&self, caller: &str) -> Result<(), ControllerError> {
        if caller != self.admin {
            return Err(ControllerError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("admin", &self.admin)
            .field("pools", &self.entries.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
