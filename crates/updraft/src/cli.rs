//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use url::Url;

/// Updraft - self-update engine for desktop applications
#[derive(Parser, Debug)]
#[command(name = "updraft")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding updraft-runtime.yaml (defaults to ~/.updraft)
    #[arg(long, global = true, env = "UPDRAFT_CONFIG_DIR")]
    pub config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version(VersionArgs),

    /// Check for an update and install it
    Check(CheckArgs),

    /// Fetch and show the published update entry
    Manifest(ManifestArgs),

    /// Compare two application versions
    Compare(CompareArgs),

    /// Print the MD5 digest of a file, as published in manifests
    Hash(HashArgs),
}

// Version command
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Manifest location shared by commands that talk to a server
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// URL of the update manifest
    #[arg(long, env = "UPDRAFT_MANIFEST")]
    pub manifest: Url,

    /// Application id to look up in the manifest
    #[arg(long)]
    pub app_id: String,
}

// Check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Installed version (defaults to this binary's version)
    #[arg(long)]
    pub installed: Option<String>,

    /// Install without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Run the check as a background attempt
    #[arg(long)]
    pub background: bool,

    /// Say nothing when already up to date
    #[arg(long)]
    pub quiet_if_current: bool,

    /// Language for messages (e.g. en, fr, fr-CA)
    #[arg(long, env = "UPDRAFT_LANG")]
    pub lang: Option<String>,
}

// Manifest command
#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Compare command
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Published version
    pub published: String,

    /// Installed version
    pub installed: String,
}

// Hash command
#[derive(Args, Debug)]
pub struct HashArgs {
    /// File to digest
    pub file: Utf8PathBuf,
}
