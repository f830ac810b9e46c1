//! Self-update engine for desktop applications
//!
//! Provides:
//! - Manifest discovery and parsing (XML update descriptors keyed by application id)
//! - Four-component version comparison
//! - Streaming artifact download with MD5 verification and cooperative cancellation
//! - Detached replacement helper (standalone binary swap or installer handoff)
//! - A session coordinator with synchronous and single-flight background entry points

pub mod download;
pub mod error;
pub mod host;
pub mod manifest;
pub mod network;
pub mod replace;
pub mod session;
pub mod strings;
pub mod version;

pub use download::{
    calculate_md5, format_bytes, verify_checksum, ArtifactFetcher, DownloadProgress,
    DownloadResult,
};
pub use error::{Result, UpdateError};
pub use host::{was_just_updated, Updatable};
pub use manifest::{parse_manifest, ManifestClient, UpdateDescriptor};
pub use network::{AlwaysOnline, NetworkProbe, TcpProbe};
pub use replace::{Handoff, HandoffPlan, ReplacementOrchestrator, ReplacementStrategy, ScriptFlavor};
pub use session::{BackgroundUpdate, UpdateOutcome, UpdateSession};
pub use strings::{BuiltinStrings, Locale, StringKey, StringTable};
pub use version::{AppVersion, Comparison, VersionComparator};

pub use tokio_util::sync::CancellationToken;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable carrying the host PID to the replacement helper
pub const PARENT_PID_ENV: &str = "UPDRAFT_PARENT_PID";
