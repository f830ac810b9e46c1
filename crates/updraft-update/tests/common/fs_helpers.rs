//! Filesystem helpers for staging directories and fake binaries

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use updraft_core::RuntimeConfig;

/// Runtime config staging artifacts under `staging` with a short exit wait
pub fn test_config(staging: &Path) -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.download.temp_dir = Some(staging.to_path_buf());
    config.handoff.exit_wait_secs = 1;
    config.handoff.poll_interval_ms = 100;
    config.handoff.locked_file_retries = 3;
    config
}

/// Names of the files currently in `dir`
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Create a file and mark it executable
pub fn create_fake_binary(path: &Path, content: &[u8]) -> std::io::Result<()> {
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

/// Script that records its arguments, one per line, in `launched.txt` next to itself
pub const RECORD_ARGS_SCRIPT: &[u8] = b"#!/bin/sh
d=\"$(dirname \"$0\")\"
printf '%s\\n' \"$@\" > \"$d/launched.tmp\" && mv \"$d/launched.tmp\" \"$d/launched.txt\"
";

/// Installer script that writes "installed" into the file named by its first argument
pub const INSTALLER_SCRIPT: &[u8] = b"#!/bin/sh\necho installed > \"$1\"\n";

/// Poll until `path` holds non-empty content or `timeout` elapses
pub async fn wait_for_content(path: &Path, timeout: Duration) -> Option<String> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(content) = fs::read_to_string(path) {
            if content.ends_with('\n') {
                return Some(content.trim().to_string());
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    None
}

/// Poll until `path` no longer exists
pub async fn wait_for_removal(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    !path.exists()
}

/// Temp dir plus its path, for tests that need several
pub fn temp_dir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_path_buf();
    (dir, path)
}
