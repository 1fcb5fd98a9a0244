// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `array-cache config` command: print the effective configuration.

use array_cache::CacheConfig;

pub async fn execute(config: CacheConfig) -> anyhow::Result<()> {
    let limit = config.parse_limit()?;

    println!("# effective ceiling: {limit}");
    print!("{}", config.to_toml()?);
    Ok(())
}
