// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI plumbing.

pub mod config;
pub mod simulate;
pub mod stress;

use array_cache::CacheConfig;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads the configuration file if given, then applies the `--max-bytes`
/// override on top of it.
pub fn load_config(path: Option<&Path>, max_bytes: Option<String>) -> anyhow::Result<CacheConfig> {
    let mut config = match path {
        Some(p) => {
            tracing::debug!("loading configuration from {}", p.display());
            CacheConfig::from_file(p)?
        }
        None => CacheConfig::default(),
    };
    if let Some(max_bytes) = max_bytes {
        config.max_cache_bytes = max_bytes;
    }
    // Fail early on a bad ceiling rather than inside a subcommand.
    config.parse_limit()?;
    Ok(config)
}
