//! Application versions and comparison
//!
//! Versions follow the `major.minor[.build[.revision]]` layout used by
//! desktop installers. Components left out compare as zero, so `2.0` and
//! `2.0.0.0` are the same version.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::UpdateError;

/// A two to four component application version
#[derive(Debug, Clone, Copy)]
pub struct AppVersion {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl AppVersion {
    /// Create a full four-component version
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    /// Parse `major.minor[.build[.revision]]`
    ///
    /// Every component must be a non-negative decimal integer. Whitespace,
    /// prefixes such as `v`, and pre-release suffixes are rejected.
    pub fn parse(text: &str) -> Result<Self, UpdateError> {
        let invalid = || UpdateError::parse(format!("invalid version '{}'", text));

        let parts: Vec<&str> = text.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(invalid());
        }

        let mut components = [None; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            *slot = Some(part.parse::<u32>().map_err(|_| invalid())?);
        }

        Ok(Self {
            major: components[0].ok_or_else(invalid)?,
            minor: components[1].ok_or_else(invalid)?,
            build: components[2],
            revision: components[3],
        })
    }

    /// All four components with missing ones as zero
    pub fn components(&self) -> [u32; 4] {
        [
            self.major,
            self.minor,
            self.build.unwrap_or(0),
            self.revision.unwrap_or(0),
        ]
    }
}

impl FromStr for AppVersion {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
            if let Some(revision) = self.revision {
                write!(f, ".{}", revision)?;
            }
        }
        Ok(())
    }
}

impl PartialEq for AppVersion {
    fn eq(&self, other: &Self) -> bool {
        self.components() == other.components()
    }
}

impl Eq for AppVersion {}

impl Hash for AppVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components().hash(state);
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }
}

impl Serialize for AppVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&semver::Version> for AppVersion {
    fn from(version: &semver::Version) -> Self {
        let clamp = |n: u64| u32::try_from(n).unwrap_or(u32::MAX);
        Self {
            major: clamp(version.major),
            minor: clamp(version.minor),
            build: Some(clamp(version.patch)),
            revision: None,
        }
    }
}

/// Result of comparing a published version against the installed one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Comparison {
    /// The published version is strictly greater
    Newer,
    /// The published version is equal or lower
    SameOrOlder,
}

/// Pure version comparison
pub struct VersionComparator;

impl VersionComparator {
    /// Compare a published version against the installed version
    pub fn compare(published: &AppVersion, installed: &AppVersion) -> Comparison {
        if published > installed {
            Comparison::Newer
        } else {
            Comparison::SameOrOlder
        }
    }
}
