// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # array-cache
//!
//! Diagnostics CLI for the array reuse cache.
//!
//! ## Usage
//! ```bash
//! # Deterministic workload on one cache, human-readable report
//! array-cache simulate --max-bytes 1M --buffers 10000 --sizes 64,256,4K
//!
//! # Same, with every 8th buffer pinned, as JSON
//! array-cache simulate --max-bytes 64K --pinned-every 8 --json
//!
//! # Concurrent workers on a shared cache
//! array-cache stress --max-bytes 64M --workers 8 --ops 10000
//!
//! # Print the effective configuration
//! array-cache --config cache.toml config
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "array-cache",
    about = "Size-classed reuse cache for array buffers: workload diagnostics",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (CLI arguments override it).
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a deterministic allocate/release workload on one cache.
    Simulate {
        /// Cache byte ceiling (e.g., "1M", "0", "unbounded").
        #[arg(short = 'm', long)]
        max_bytes: Option<String>,

        /// Number of buffers to allocate over the run.
        #[arg(short, long, default_value_t = 10_000)]
        buffers: usize,

        /// Comma-separated buffer byte sizes, cycled round-robin.
        #[arg(short, long, default_value = "64,256,4K")]
        sizes: String,

        /// How many buffers stay on loan at once before the oldest is released.
        #[arg(short, long, default_value_t = 32)]
        window: usize,

        /// Pin every Nth buffer with an external reference while it is cached.
        #[arg(short, long)]
        pinned_every: Option<usize>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Hammer a shared cache from concurrent tokio tasks and verify accounting.
    Stress {
        /// Cache byte ceiling (e.g., "64M").
        #[arg(short = 'm', long)]
        max_bytes: Option<String>,

        /// Number of concurrent workers.
        #[arg(short, long, default_value_t = 8)]
        workers: usize,

        /// Loans per worker.
        #[arg(short, long, default_value_t = 10_000)]
        ops: usize,
    },

    /// Print the effective cache configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Simulate {
            max_bytes,
            buffers,
            sizes,
            window,
            pinned_every,
            json,
        } => {
            let config = commands::load_config(cli.config.as_deref(), max_bytes)?;
            commands::simulate::execute(config, buffers, sizes, window, pinned_every, json).await
        }
        Commands::Stress {
            max_bytes,
            workers,
            ops,
        } => {
            let config = commands::load_config(cli.config.as_deref(), max_bytes)?;
            commands::stress::execute(config, workers, ops).await
        }
        Commands::Config => {
            let config = commands::load_config(cli.config.as_deref(), None)?;
            commands::config::execute(config).await
        }
    }
}
