// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::config::Config;
use crate::error::Result;

/// Print the resolved configuration.
pub fn run(config: &Config) -> Result<()> {
    print!("{}", config.to_display_toml()?);
    Ok(())
}
