//! CLI command implementations

pub mod check;
pub mod compare;
pub mod hash;
pub mod manifest;
pub mod version;

use anyhow::{Context, Result};
use camino::Utf8Path;
use updraft_core::{HierarchicalConfigLoader, RuntimeConfig};

/// Load runtime configuration and apply its display settings
pub(crate) fn load_config(config_dir: Option<&Utf8Path>) -> Result<RuntimeConfig> {
    let loader = match config_dir {
        Some(dir) => HierarchicalConfigLoader::with_dir(dir.to_path_buf()),
        None => HierarchicalConfigLoader::new()?,
    };
    let config = loader
        .load_runtime_config()
        .with_context(|| format!("Failed to load configuration from {}", loader.config_dir()))?;

    if !config.display.color_enabled {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    Ok(config)
}
