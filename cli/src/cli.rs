//! # CLI Interface
//!
//! Defines the command-line argument structure for `basin` using `clap`
//! derive. Supports two subcommands: `simulate` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use basin_engine::config::DEFAULT_RESERVE_BPS;

/// Basin pooled-value vault tooling.
///
/// Drives a fully in-memory deployment of the Basin engine: a token
/// ledger, a multi-asset pool, and a fixed-rate yield venue. Useful for
/// demonstrating the accounting lifecycle and for eyeballing receipts
/// without touching a chain.
#[derive(Parser, Debug)]
#[command(
    name = "basin",
    about = "Basin multi-asset vault simulator",
    version,
    propagate_version = true
)]
pub struct BasinCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `basin` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the canonical deposit/rebalance/accrue/withdraw session and
    /// print a JSON report of every receipt.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Whole tokens deposited by each simulated depositor.
    ///
    /// Each depositor brings this many whole units of their own asset,
    /// scaled to the asset's native decimals before minting.
    #[arg(long, env = "BASIN_DEPOSIT", default_value_t = 1_000_000)]
    pub deposit: u64,

    /// Annual yield paid by the simulated venue, in basis points.
    #[arg(long, env = "BASIN_APY_BPS", default_value_t = 500)]
    pub apy_bps: u32,

    /// Idle reserve the pool retains on rebalance, in basis points of
    /// total pool value.
    #[arg(long, env = "BASIN_RESERVE_BPS", default_value_t = DEFAULT_RESERVE_BPS)]
    pub reserve_bps: u32,

    /// Fee the venue skims from every deposit, in basis points.
    #[arg(long, env = "BASIN_ENTRY_FEE_BPS", default_value_t = 0)]
    pub entry_fee_bps: u32,

    /// Fee the venue skims from every withdrawal, in basis points.
    ///
    /// A nonzero exit fee is the easiest way to watch shortfall
    /// accounting flow through withdrawal receipts.
    #[arg(long, env = "BASIN_EXIT_FEE_BPS", default_value_t = 0)]
    pub exit_fee_bps: u32,

    /// Days of yield accrued before each withdrawal, comma separated.
    ///
    /// Must name one period per depositor: the session accrues, then
    /// rebalances, then redeems the next depositor in order.
    #[arg(long, env = "BASIN_ACCRUAL_DAYS", value_delimiter = ',', default_values_t = [30, 90, 90])]
    pub accrual_days: Vec<u32>,

    /// Log output format: pretty or json.
    #[arg(long, env = "BASIN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Write the JSON session report to this file instead of stdout.
    #[arg(long, short = 'o', env = "BASIN_OUT")]
    pub out: Option<PathBuf>,
}
