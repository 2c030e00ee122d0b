//! Configuration module
//!
//! This module handles the proxy options that steer layer selection: loading
//! them from files and environment variables, validating them, and compiling
//! them into the policy snapshot every connection reads.

pub mod defaults;
pub mod error;
mod loader;
mod policy;
mod types;
mod validator;

pub use self::error::ConfigError;
pub use self::loader::ConfigLoader;
pub use self::policy::{FilterPolicy, PolicyStore};
pub use self::types::{Mode, ProxyOptions};
pub use self::validator::{check_warnings, validate_options};
pub use self::defaults::{DEFAULT_CONFIG_FILE, ENV_PREFIX};

use std::sync::Arc;

use log::info;
use once_cell::sync::Lazy;

use self::error::Result;

// Process-wide policy, starting from defaults
static POLICY: Lazy<PolicyStore> = Lazy::new(PolicyStore::default);

/// Apply options to the process-wide store
pub fn apply(options: &ProxyOptions) -> Result<Arc<FilterPolicy>> {
    POLICY.apply(options)
}

/// The current process-wide policy snapshot
pub fn current() -> Arc<FilterPolicy> {
    POLICY.load()
}

/// Log the effective options
pub fn log_options(options: &ProxyOptions) {
    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    info!("=== Effective Options ===");
    info!("  Mode: {}", options.mode);
    info!("  Ignore hosts: {:?}", options.ignore_hosts);
    info!("  Allow hosts: {:?}", options.allow_hosts);
    info!("  TCP hosts: {:?}", options.tcp_hosts);
    info!("  Raw TCP heuristics: {}", options.rawtcp);
    info!("  Log level: {}", options.log_level);
    info!("=========================");
}
