//! # Basin Strategies
//!
//! Yield venues and the adapters that connect them to Basin pools. The
//! engine deliberately knows nothing about where yield comes from; it
//! invests through the `Strategy` trait and accepts whatever comes back.
//! This crate supplies the other side of that boundary:
//!
//! - **venue** -- the [`YieldVenue`](venue::YieldVenue) trait: an external
//!   place tokens can sit and earn, with clamped (never-failing)
//!   withdrawals.
//! - **fixed_rate** -- a deterministic simulated venue paying a fixed APY,
//!   with optional entry and exit fees. All positions are backed by real
//!   ledger balances, interest included.
//! - **venue_strategy** -- the adapter implementing the engine's
//!   `Strategy` trait over any venue.
//!
//! ## Design Principles
//!
//! 1. Venues hold real tokens. Position value is never a number floating
//!    free of the ledger; accrued interest is minted before it is owed.
//! 2. Withdrawals clamp instead of failing. A venue that cannot pay in
//!    full pays what it can and the shortfall travels up as data.
//! 3. Determinism. A venue's value changes only through deposit,
//!    withdraw, and explicit time advancement.

pub mod fixed_rate;
pub mod venue;
pub mod venue_strategy;
