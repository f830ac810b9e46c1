//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Embedded defaults (built into binary)
//! 2. Runtime config (~/.updraft/updraft-runtime.yaml)
//! 3. Environment variables (UPDRAFT_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use crate::types::RuntimeConfig;
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use rust_embed::RustEmbed;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// File name of the user runtime configuration
pub const RUNTIME_CONFIG_FILE: &str = "updraft-runtime.yaml";

/// Embedded configuration files
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/embedded/config/"]
#[prefix = ""]
struct EmbeddedConfigs;

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    /// Base directory for configuration files
    config_dir: Utf8PathBuf,
}

impl HierarchicalConfigLoader {
    /// Create a new hierarchical config loader rooted at ~/.updraft
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        Ok(Self { config_dir })
    }

    /// Create a loader with a custom config directory
    pub fn with_dir(config_dir: Utf8PathBuf) -> Self {
        Self { config_dir }
    }

    /// Get the standard config directory (~/.updraft)
    fn get_config_dir() -> Result<Utf8PathBuf> {
        let home = get_home_dir()?;
        let home = Utf8PathBuf::from_path_buf(home)
            .map_err(|p| Error::invalid_config(format!("Home directory is not UTF-8: {:?}", p)))?;
        Ok(home.join(".updraft"))
    }

    /// Load runtime configuration with hierarchical precedence
    pub fn load_runtime_config(&self) -> Result<RuntimeConfig> {
        // Start with embedded defaults
        let mut config = Self::load_embedded_config::<RuntimeConfig>("runtime-defaults.yaml")?;

        let runtime_config_path = self.config_dir.join(RUNTIME_CONFIG_FILE);
        if runtime_config_path.exists() {
            debug!("Loading runtime config from {}", runtime_config_path);
            let file_config = self.load_yaml_file::<RuntimeConfig>(&runtime_config_path)?;
            config = Self::merge_runtime_config(config, file_config);
        }

        config = self.apply_env_overrides(config)?;

        Ok(config)
    }

    /// Load an embedded configuration file
    fn load_embedded_config<T: DeserializeOwned>(filename: &str) -> Result<T> {
        let embedded_file = EmbeddedConfigs::get(filename).ok_or_else(|| {
            Error::config_not_found(format!("Embedded config not found: {}", filename))
        })?;

        let content = std::str::from_utf8(&embedded_file.data).map_err(|_| {
            Error::invalid_config(format!("Invalid UTF-8 in embedded config: {}", filename))
        })?;

        let config: T = serde_yaml_ng::from_str(content).map_err(|e| {
            Error::invalid_config(format!(
                "Failed to parse embedded config {}: {}",
                filename, e
            ))
        })?;

        Ok(config)
    }

    /// Load a YAML file and parse it
    fn load_yaml_file<T: DeserializeOwned>(&self, path: &Utf8Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let config: T = serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))?;
        Ok(config)
    }

    /// Merge two runtime configs (base is overridden by overlay)
    fn merge_runtime_config(base: RuntimeConfig, overlay: RuntimeConfig) -> RuntimeConfig {
        let mut download = overlay.download;
        if download.temp_dir.is_none() {
            download.temp_dir = base.download.temp_dir;
        }

        RuntimeConfig {
            network: overlay.network,
            download,
            handoff: overlay.handoff,
            display: overlay.display,
        }
    }

    /// Apply environment variable overrides to runtime config
    fn apply_env_overrides(&self, mut config: RuntimeConfig) -> Result<RuntimeConfig> {
        if let Some(val) = parse_env::<u64>("UPDRAFT_HTTP_TIMEOUT_SECS")? {
            config.network.http_timeout_secs = val;
        }

        if let Some(val) = parse_env::<u64>("UPDRAFT_DOWNLOAD_TIMEOUT_SECS")? {
            config.network.download_timeout_secs = val;
        }

        if let Some(val) = parse_env::<u64>("UPDRAFT_CONNECT_TIMEOUT_SECS")? {
            config.network.connect_timeout_secs = val;
        }

        if let Ok(val) = env::var("UPDRAFT_USER_AGENT") {
            config.network.user_agent = val;
        }

        if let Ok(val) = env::var("UPDRAFT_TEMP_DIR") {
            config.download.temp_dir = Some(PathBuf::from(val));
        }

        if let Some(val) = parse_env::<u64>("UPDRAFT_EXIT_WAIT_SECS")? {
            config.handoff.exit_wait_secs = val;
        }

        if let Ok(val) = env::var("UPDRAFT_VERBOSE") {
            config.display.verbose = val.parse().unwrap_or(false);
        }

        if let Ok(val) = env::var("UPDRAFT_NO_COLOR") {
            config.display.color_enabled = !val.parse().unwrap_or(false);
        }

        Ok(config)
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::invalid_config(format!("{} must be a valid number", name))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn create_temp_loader() -> (HierarchicalConfigLoader, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir =
            Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).expect("Invalid UTF-8 path");
        let loader = HierarchicalConfigLoader::with_dir(config_dir);
        (loader, temp_dir)
    }

    #[test]
    #[serial]
    fn test_load_runtime_config_defaults() {
        let (loader, _temp) = create_temp_loader();
        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.network.http_timeout_secs, 30);
        assert_eq!(config.network.probe_timeout_ms, 3000);
        assert_eq!(config.download.file_prefix, "updraft-");
        assert_eq!(config.handoff.exit_wait_secs, 30);
        assert_eq!(config.handoff.updated_flag, "--updated");
        assert!(config.network.user_agent.starts_with("updraft/"));
    }

    #[test]
    #[serial]
    fn test_load_runtime_config_from_file() {
        let (loader, _temp) = create_temp_loader();

        let config_content = r#"
network:
  http-timeout-secs: 60
  download-timeout-secs: 900
handoff:
  exit-wait-secs: 5
  updated-flag: "--just-updated"
"#;
        let config_path = loader.config_dir().join(RUNTIME_CONFIG_FILE);
        fs::write(&config_path, config_content).unwrap();

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.network.http_timeout_secs, 60);
        assert_eq!(config.network.download_timeout_secs, 900);
        assert_eq!(config.handoff.exit_wait_secs, 5);
        assert_eq!(config.handoff.updated_flag, "--just-updated");
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_reported() {
        let (loader, _temp) = create_temp_loader();
        let config_path = loader.config_dir().join(RUNTIME_CONFIG_FILE);
        fs::write(&config_path, "network: [not, a, map]").unwrap();

        let err = loader.load_runtime_config().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("UPDRAFT_HTTP_TIMEOUT_SECS", "120");
        env::set_var("UPDRAFT_EXIT_WAIT_SECS", "7");
        env::set_var("UPDRAFT_TEMP_DIR", "/tmp/updraft-staging");
        env::set_var("UPDRAFT_NO_COLOR", "true");

        let config = loader.load_runtime_config().unwrap();
        assert_eq!(config.network.http_timeout_secs, 120);
        assert_eq!(config.handoff.exit_wait_secs, 7);
        assert_eq!(
            config.download.temp_dir,
            Some(PathBuf::from("/tmp/updraft-staging"))
        );
        assert!(!config.display.color_enabled);

        env::remove_var("UPDRAFT_HTTP_TIMEOUT_SECS");
        env::remove_var("UPDRAFT_EXIT_WAIT_SECS");
        env::remove_var("UPDRAFT_TEMP_DIR");
        env::remove_var("UPDRAFT_NO_COLOR");
    }

    #[test]
    #[serial]
    fn test_env_override_rejects_garbage() {
        let (loader, _temp) = create_temp_loader();

        env::set_var("UPDRAFT_CONNECT_TIMEOUT_SECS", "soon");
        let result = loader.load_runtime_config();
        env::remove_var("UPDRAFT_CONNECT_TIMEOUT_SECS");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("UPDRAFT_CONNECT_TIMEOUT_SECS"));
    }

    #[test]
    fn test_merge_keeps_base_temp_dir() {
        let mut base = RuntimeConfig::default();
        base.download.temp_dir = Some(PathBuf::from("/base"));
        let mut overlay = RuntimeConfig::default();
        overlay.network.http_timeout_secs = 999;

        let merged = HierarchicalConfigLoader::merge_runtime_config(base, overlay);
        assert_eq!(merged.network.http_timeout_secs, 999);
        assert_eq!(merged.download.temp_dir, Some(PathBuf::from("/base")));
    }
}
