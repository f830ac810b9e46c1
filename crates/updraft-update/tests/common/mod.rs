//! Common test infrastructure for updraft-update tests
//!
//! # Usage
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Modules
//!
//! - `constants`: Application ids, versions, payloads
//! - `builders`: Fluent builder for manifest documents
//! - `mock_server`: Wiremock setup helpers for manifests and artifacts, plus a stalling raw server
//! - `hosts`: Recording `Updatable` host and probes
//! - `fs_helpers`: Staging directory and script helpers

// Each test binary uses a different subset of the helpers
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod constants;
pub mod fs_helpers;
pub mod hosts;
pub mod mock_server;

pub use builders::*;
pub use constants::*;
pub use fs_helpers::*;
pub use hosts::*;
pub use mock_server::*;
