//! Runtime configuration types for operational parameters
//!
//! These types define configuration that controls runtime behavior like
//! network timeouts, temp-file placement, and how the replacement helper
//! waits for the host process to exit.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Network and HTTP configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Artifact download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Replacement helper settings
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Display and output settings
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Network and HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    /// Timeout for manifest requests in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Timeout for a whole artifact download in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Reachability probe timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// User agent string for HTTP requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            download_timeout_secs: default_download_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            probe_timeout_ms: default_probe_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_download_timeout() -> u64 {
    600 // 10 minutes
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_probe_timeout() -> u64 {
    3000
}
fn default_user_agent() -> String {
    format!(
        "updraft/{} ({}; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// Artifact download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DownloadConfig {
    /// Read buffer size used when hashing a downloaded file
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Directory for in-flight artifacts (system temp dir when unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// File name prefix for in-flight artifacts
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            temp_dir: None,
            file_prefix: default_file_prefix(),
        }
    }
}

impl DownloadConfig {
    /// Directory where artifacts are staged
    pub fn staging_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn default_chunk_size() -> usize {
    64 * 1024
}
fn default_file_prefix() -> String {
    "updraft-".to_string()
}

/// Settings for the detached replacement helper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HandoffConfig {
    /// Upper bound on how long the helper waits for the host to exit
    #[serde(default = "default_exit_wait")]
    pub exit_wait_secs: u64,

    /// Delay between checks while waiting for exit or a locked file
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Attempts made to delete a file that is still locked
    #[serde(default = "default_locked_file_retries")]
    pub locked_file_retries: u32,

    /// Flag appended to the relaunch command line
    #[serde(default = "default_updated_flag")]
    pub updated_flag: String,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            exit_wait_secs: default_exit_wait(),
            poll_interval_ms: default_poll_interval(),
            locked_file_retries: default_locked_file_retries(),
            updated_flag: default_updated_flag(),
        }
    }
}

impl HandoffConfig {
    /// Number of polls that fit into `exit_wait_secs`
    pub fn exit_wait_polls(&self) -> u64 {
        let interval = self.poll_interval_ms.max(1);
        self.exit_wait_secs
            .saturating_mul(1000)
            .div_ceil(interval)
            .max(1)
    }
}

fn default_exit_wait() -> u64 {
    30
}
fn default_poll_interval() -> u64 {
    250
}
fn default_locked_file_retries() -> u32 {
    20
}
fn default_updated_flag() -> String {
    "--updated".to_string()
}

/// Display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Verbose output
    #[serde(default = "default_verbose")]
    pub verbose: bool,

    /// Colored terminal output
    #[serde(default = "default_color_enabled")]
    pub color_enabled: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            verbose: default_verbose(),
            color_enabled: default_color_enabled(),
        }
    }
}

fn default_verbose() -> bool {
    false
}
fn default_color_enabled() -> bool {
    true
}
