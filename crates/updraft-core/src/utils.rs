//! Shared utility functions for Updraft crates

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Get the user's home directory
///
/// The HOME (or USERPROFILE) variable wins over `dirs::home_dir()` so that
/// sandboxed hosts that relocate HOME keep their configuration together.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    dirs::home_dir().ok_or_else(|| Error::invalid_config("Could not determine home directory"))
}
