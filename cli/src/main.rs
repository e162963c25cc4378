// Copyright (c) 2026 Basin Labs. MIT License.
// See LICENSE for details.

//! # Basin CLI
//!
//! Entry point for the `basin` binary. Parses CLI arguments, initializes
//! logging, and drives a fully in-memory vault deployment through its
//! accounting lifecycle.
//!
//! The binary supports two subcommands:
//!
//! - `simulate` -- run the canonical deposit/rebalance/accrue/withdraw
//!   session and print a JSON report of every receipt
//! - `version`  -- print build version information

mod cli;
mod logging;
mod simulate;

use anyhow::Result;
use clap::Parser;

use cli::{BasinCli, Commands};

fn main() -> Result<()> {
    let cli = BasinCli::parse();

    match cli.command {
        Commands::Simulate(args) => simulate::run(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Prints version information to stdout.
fn print_version() {
    println!("basin  {}", env!("CARGO_PKG_VERSION"));
    println!("engine {}", basin_engine::config::ENGINE_VERSION);
    println!("rustc  {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
