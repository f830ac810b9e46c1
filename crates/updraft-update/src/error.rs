//! Error types for the update engine

use thiserror::Error;

/// Result type alias using the engine's error type
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Failures that can end an update attempt
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Manifest or artifact unreachable
    #[error("Network error: {message}")]
    Network { message: String },

    /// No network path to the manifest host at all
    #[error("Network error: no internet connection")]
    Offline,

    /// Malformed manifest document or version string
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Downloaded artifact does not match the published digest
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// A background attempt is already in flight
    #[error("An update check is already running")]
    Busy,

    /// The host declined the offered update
    #[error("Update declined")]
    Declined,

    /// The attempt was cancelled before completing
    #[error("Update cancelled")]
    Cancelled,

    /// The replacement helper could not be started
    #[error("Fatal update error: {message}")]
    Fatal { message: String },

    /// Local filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] updraft_core::Error),
}

impl UpdateError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create the error raised when no network path is available
    pub fn offline() -> Self {
        Self::Offline
    }

    /// Whether this is the "no network path" error
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline)
    }

    /// Whether this is any network failure, including being offline
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Offline)
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a fatal error
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    /// Whether this error represents a cancelled attempt rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network(format!("request timed out: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}
