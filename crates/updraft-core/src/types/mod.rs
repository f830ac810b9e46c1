//! Type definitions for Updraft runtime configuration

mod runtime_config;

pub use runtime_config::*;
