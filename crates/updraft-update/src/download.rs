//! Artifact download with progress tracking and verification
//!
//! Artifacts are streamed into a named temp file inside the staging
//! directory. The file is only kept once its MD5 digest matches the
//! manifest; a cancelled, failed, or mismatched download removes it.
//!
//! # Example
//!
//! ```no_run
//! use updraft_core::types::{DownloadConfig, NetworkConfig};
//! use updraft_update::{ArtifactFetcher, CancellationToken};
//!
//! #[tokio::main]
//! async fn main() -> updraft_update::Result<()> {
//!     let fetcher = ArtifactFetcher::new(&NetworkConfig::default(), &DownloadConfig::default())?;
//!     let url = url::Url::parse("https://example.com/app.exe").expect("valid url");
//!     let cancel = CancellationToken::new();
//!
//!     let result = fetcher
//!         .download(&url, "9e107d9d372bb6826bd81d3542a419d6", &|p| println!("{}", p.summary()), &cancel)
//!         .await?;
//!
//!     println!("Downloaded to: {:?}", result.file_path);
//!     Ok(())
//! }
//! ```

use futures_util::StreamExt;
use md5::{Digest, Md5};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use updraft_core::types::{DownloadConfig, NetworkConfig};
use url::Url;

use crate::error::{Result, UpdateError};

/// Buffer size used by [`calculate_md5`]
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Download progress information
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far
    pub downloaded_bytes: u64,

    /// Total bytes to download, when the server announced it
    pub total_bytes: Option<u64>,

    /// Time since the transfer started
    pub elapsed: Duration,

    /// Average throughput, unknown until some time has elapsed
    pub speed_bps: Option<f64>,
}

impl DownloadProgress {
    /// Build a progress snapshot
    pub fn new(downloaded_bytes: u64, total_bytes: Option<u64>, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let speed_bps = if secs > 0.0 {
            Some(downloaded_bytes as f64 / secs)
        } else {
            None
        };

        Self {
            downloaded_bytes,
            total_bytes,
            elapsed,
            speed_bps,
        }
    }

    /// Progress percentage (0-100)
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.downloaded_bytes as f64 / total as f64 * 100.0).min(100.0))
            }
            _ => None,
        }
    }

    /// Estimated time remaining
    pub fn eta(&self) -> Option<Duration> {
        let total = self.total_bytes?;
        let speed = self.speed_bps.filter(|s| *s > 0.0)?;
        let remaining = total.saturating_sub(self.downloaded_bytes);
        Some(Duration::from_secs_f64(remaining as f64 / speed))
    }

    /// Check if download is complete
    pub fn is_complete(&self) -> bool {
        self.total_bytes
            .is_some_and(|total| self.downloaded_bytes >= total)
    }

    /// One-line human readable summary, omitting unknown parts
    pub fn summary(&self) -> String {
        let mut text = format!("Downloaded {}", format_bytes(self.downloaded_bytes));
        if let Some(total) = self.total_bytes {
            text.push_str(&format!(" of {}", format_bytes(total)));
        }
        if let Some(speed) = self.speed_bps {
            text.push_str(&format!(" at {}/s", format_bytes(speed as u64)));
        }
        if let Some(eta) = self.eta() {
            text.push_str(&format!(", ~{} sec remaining", eta.as_secs_f64().ceil() as u64));
        }
        text
    }
}

/// Result of a download operation
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the verified artifact
    pub file_path: PathBuf,

    /// Size of the artifact in bytes
    pub file_size: u64,

    /// MD5 digest of the artifact
    pub checksum: String,

    /// Time taken by the transfer
    pub elapsed: Duration,
}

/// State of one download attempt
///
/// Owns the temp file; dropping the session without calling
/// [`DownloadSession::persist`] deletes it.
struct DownloadSession {
    file: NamedTempFile,
    downloaded: u64,
    total: Option<u64>,
    started: Instant,
}

impl DownloadSession {
    fn create(dir: &Path, prefix: &str, suffix: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?;
        debug!("Staging artifact at {}", file.path().display());

        Ok(Self {
            file,
            downloaded: 0,
            total: None,
            started: Instant::now(),
        })
    }

    fn path(&self) -> &Path {
        self.file.path()
    }

    fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk)?;
        self.downloaded += chunk.len() as u64;
        Ok(())
    }

    fn progress(&self) -> DownloadProgress {
        DownloadProgress::new(self.downloaded, self.total, self.started.elapsed())
    }

    fn persist(self) -> Result<(PathBuf, u64)> {
        let size = self.downloaded;
        let (file, path) = self.file.keep().map_err(|e| UpdateError::Io(e.error))?;
        drop(file);
        Ok((path, size))
    }
}

/// Downloads update artifacts
pub struct ArtifactFetcher {
    client: reqwest::Client,
    config: DownloadConfig,
}

impl ArtifactFetcher {
    /// Create a fetcher using the network and download settings
    pub fn new(network: &NetworkConfig, download: &DownloadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&network.user_agent)
            .timeout(Duration::from_secs(network.download_timeout_secs))
            .connect_timeout(Duration::from_secs(network.connect_timeout_secs))
            .build()
            .map_err(|e| UpdateError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: download.clone(),
        })
    }

    /// Directory where artifacts are staged
    pub fn staging_dir(&self) -> PathBuf {
        self.config.staging_dir()
    }

    /// Download `uri` and verify it against `expected_hash`
    ///
    /// `on_progress` is called after every received chunk. Cancelling the
    /// token stops the transfer at the next chunk boundary and reports
    /// [`UpdateError::Cancelled`].
    pub async fn download(
        &self,
        uri: &Url,
        expected_hash: &str,
        on_progress: &(dyn Fn(&DownloadProgress) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<DownloadResult> {
        if cancel.is_cancelled() {
            return Err(UpdateError::Cancelled);
        }

        let mut session = DownloadSession::create(
            &self.config.staging_dir(),
            &self.config.file_prefix,
            &artifact_suffix(uri),
        )?;

        info!("Downloading {}", uri);

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            response = self.client.get(uri.clone()).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::network(format!(
                "download of {} returned {}",
                uri, status
            )));
        }

        session.total = response.content_length();
        on_progress(&session.progress());

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Download cancelled after {} bytes", session.downloaded);
                    return Err(UpdateError::Cancelled);
                }
                next = stream.next() => next,
            };

            match next {
                Some(chunk) => {
                    let chunk: bytes::Bytes = chunk?;
                    session.write(&chunk)?;
                    on_progress(&session.progress());
                }
                None => break,
            }
        }

        session.file.flush()?;
        let elapsed = session.started.elapsed();

        if let Some(total) = session.total {
            if session.downloaded != total {
                return Err(UpdateError::network(format!(
                    "connection closed after {} of {} bytes",
                    session.downloaded, total
                )));
            }
        }

        debug!("Calculating MD5 checksum...");
        let hash_path = session.path().to_path_buf();
        let chunk_size = self.config.chunk_size;
        let checksum =
            tokio::task::spawn_blocking(move || calculate_md5_with_buffer(&hash_path, chunk_size))
                .await
                .map_err(|e| UpdateError::fatal(format!("checksum task failed: {}", e)))??;
        if !checksum.eq_ignore_ascii_case(expected_hash.trim()) {
            warn!(
                "Checksum mismatch for {}: expected {}, got {}",
                uri, expected_hash, checksum
            );
            return Err(UpdateError::HashMismatch {
                expected: expected_hash.trim().to_ascii_lowercase(),
                actual: checksum,
            });
        }

        let (file_path, file_size) = session.persist()?;
        info!(
            "Downloaded {} in {:.1}s",
            format_bytes(file_size),
            elapsed.as_secs_f64()
        );

        Ok(DownloadResult {
            file_path,
            file_size,
            checksum,
            elapsed,
        })
    }
}

/// Extension of the last URL path segment, including the dot
fn artifact_suffix(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".tmp".to_string())
}

fn calculate_md5_with_buffer(path: &Path, buffer_size: usize) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; buffer_size.max(1)];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Calculate the lowercase hex MD5 digest of a file
pub fn calculate_md5(path: &Path) -> Result<String> {
    calculate_md5_with_buffer(path, HASH_BUFFER_SIZE)
}

/// Verify a file against an expected MD5 digest (case-insensitive)
pub fn verify_checksum(path: &Path, expected: &str) -> Result<bool> {
    let actual = calculate_md5(path)?;
    Ok(actual.eq_ignore_ascii_case(expected.trim()))
}

/// Convert bytes to a human readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size < KB {
        format!("{} B", bytes)
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.1} GB", size / GB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_download_progress() {
        let progress = DownloadProgress::new(500, Some(1000), Duration::from_secs(2));
        assert_eq!(progress.percentage(), Some(50.0));
        assert_eq!(progress.speed_bps, Some(250.0));
        assert_eq!(progress.eta(), Some(Duration::from_secs(2)));
        assert!(!progress.is_complete());

        let done = DownloadProgress::new(1000, Some(1000), Duration::from_secs(4));
        assert_eq!(done.percentage(), Some(100.0));
        assert_eq!(done.eta(), Some(Duration::ZERO));
        assert!(done.is_complete());
    }

    #[test]
    fn test_progress_at_zero_elapsed_is_unknown() {
        let progress = DownloadProgress::new(4096, Some(8192), Duration::ZERO);
        assert_eq!(progress.speed_bps, None);
        assert_eq!(progress.eta(), None);
        assert_eq!(progress.percentage(), Some(50.0));
    }

    #[test]
    fn test_progress_without_total() {
        let progress = DownloadProgress::new(10, None, Duration::from_secs(1));
        assert_eq!(progress.percentage(), None);
        assert_eq!(progress.eta(), None);
        assert!(!progress.is_complete());

        let empty = DownloadProgress::new(0, Some(0), Duration::from_secs(1));
        assert_eq!(empty.percentage(), None);
    }

    #[test]
    fn test_progress_summary() {
        let progress = DownloadProgress::new(1024 * 1024, Some(4 * 1024 * 1024), Duration::from_secs(4));
        assert_eq!(
            progress.summary(),
            "Downloaded 1.0 MB of 4.0 MB at 256.0 KB/s, ~12 sec remaining"
        );

        let early = DownloadProgress::new(0, None, Duration::ZERO);
        assert_eq!(early.summary(), "Downloaded 0 B");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_calculate_md5() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"The quick brown fox jumps over the lazy dog")
            .unwrap();
        file.flush().unwrap();

        let digest = calculate_md5(file.path()).unwrap();
        assert_eq!(digest, "9e107d9d372bb6826bd81d3542a419d6");

        let small_buffer = calculate_md5_with_buffer(file.path(), 3).unwrap();
        assert_eq!(small_buffer, digest);
    }

    #[test]
    fn test_verify_checksum_case_insensitive() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"").unwrap();
        file.flush().unwrap();

        assert!(verify_checksum(file.path(), "d41d8cd98f00b204e9800998ecf8427e").unwrap());
        assert!(verify_checksum(file.path(), "D41D8CD98F00B204E9800998ECF8427E").unwrap());
        assert!(!verify_checksum(file.path(), "00000000000000000000000000000000").unwrap());
    }

    #[test]
    fn test_artifact_suffix() {
        let url = |s: &str| Url::parse(s).unwrap();
        assert_eq!(artifact_suffix(&url("https://example.com/setup.exe")), ".exe");
        assert_eq!(artifact_suffix(&url("https://example.com/a/b/pkg.msi?x=1")), ".msi");
        assert_eq!(artifact_suffix(&url("https://example.com/download")), ".tmp");
        assert_eq!(artifact_suffix(&url("https://example.com/")), ".tmp");
    }

    #[test]
    fn test_session_drop_removes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = DownloadSession::create(dir.path(), "updraft-", ".tmp").unwrap();
        session.write(b"partial").unwrap();
        let path = session.path().to_path_buf();
        assert!(path.exists());

        drop(session);
        assert!(!path.exists());
    }

    #[test]
    fn test_session_persist_keeps_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut session = DownloadSession::create(dir.path(), "updraft-", ".bin").unwrap();
        session.write(b"payload").unwrap();

        let (path, size) = session.persist().unwrap();
        assert_eq!(size, 7);
        assert_eq!(fs::read(&path).unwrap(), b"payload");
        assert!(path.file_name().unwrap().to_str().unwrap().starts_with("updraft-"));
        assert_eq!(path.extension().unwrap(), "bin");
    }
}
