// Copyright (c) 2026 Basin Labs. MIT License.
// See LICENSE for details.

//! # Basin Engine -- Core Library
//!
//! The accounting core of Basin: a pooled multi-asset vault that accepts
//! stablecoin deposits, issues fungible shares against the pool's total
//! value, and farms the idle majority out to a yield strategy.
//!
//! Basin takes a conservative stance: integer arithmetic only (amounts are
//! `u128`, share-pricing intermediates go through 256 bits), every overflow
//! is a typed error, and the books must balance after every operation --
//! a share supply of zero means a pool value of zero, exactly.
//!
//! ## Architecture
//!
//! The engine is split into modules that mirror the concerns of a pooled
//! vault:
//!
//! - **asset** -- Asset identity and the per-pool supported set.
//! - **config** -- Engine constants: precision, reserve defaults, limits.
//! - **controller** -- Admin-gated registry binding pools to strategies.
//! - **ledger** -- In-memory multi-asset token ledger with allowances.
//! - **math** -- Checked wide arithmetic; `mul_div` over a 256-bit lane.
//! - **pool** -- Deposit, withdraw, rebalance; the share accounting core.
//! - **shares** -- Claim-token balances and supply.
//! - **strategy** -- The boundary trait pools invest through.
//! - **value** -- Decimal normalization onto the common 18-decimal scale.
//!
//! ## Design Philosophy
//!
//! 1. Flooring always favors the pool, never the individual claimant.
//! 2. Shortfall is data, not an error. Venues under-deliver; the engine
//!    reports it and keeps the books straight.
//! 3. Burn first, pay second. A claim is dead before external code runs.
//! 4. If it moves value, it returns a receipt.

pub mod asset;
pub mod config;
pub mod controller;
pub mod ledger;
pub mod math;
pub mod pool;
pub mod shares;
pub mod strategy;
pub mod value;
