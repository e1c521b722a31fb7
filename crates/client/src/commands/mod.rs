// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod config;
pub mod generate;
pub mod listen;
pub mod sessions;

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads a UTF-8 text input, rejecting blank files.
pub(crate) fn read_text(path: &Path, field: &'static str) -> Result<String> {
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(Error::FieldEmpty { field });
    }
    Ok(text)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
