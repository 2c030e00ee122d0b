//! Configuration validator
//!
//! Hard errors stop a configuration from being applied; warnings are only logged.

use log::warn;

use super::defaults::LOG_LEVELS;
use super::error::{ConfigError, Result};
use super::types::{Mode, ProxyOptions};

/// Validate options before they are compiled
pub fn validate_options(options: &ProxyOptions) -> Result<()> {
    validate_host_filters(options)?;

    for warning in check_warnings(options) {
        warn!("{}", warning);
    }

    Ok(())
}

/// `allow_hosts` and `ignore_hosts` cannot both be set
fn validate_host_filters(options: &ProxyOptions) -> Result<()> {
    if !options.allow_hosts.is_empty() && !options.ignore_hosts.is_empty() {
        return Err(ConfigError::InvalidCombination(
            "The allow_hosts and ignore_hosts options are mutually exclusive".to_string(),
        ));
    }

    Ok(())
}

/// Check options for potential issues that do not prevent applying them
pub fn check_warnings(options: &ProxyOptions) -> Vec<String> {
    let mut warnings = Vec::new();

    if !LOG_LEVELS.contains(&options.log_level.as_str()) {
        warnings.push(format!("Invalid log level '{}', using default 'info'", options.log_level));
    }

    if options.mode == Mode::Socks5 {
        warnings.push("Mode 'socks5' is not implemented; every connection will be rejected".to_string());
    }

    let lists = [
        ("ignore_hosts", &options.ignore_hosts),
        ("allow_hosts", &options.allow_hosts),
        ("tcp_hosts", &options.tcp_hosts),
    ];
    for (name, patterns) in lists {
        if patterns.iter().any(String::is_empty) {
            warnings.push(format!("Empty pattern in '{}' matches every host", name));
        }
    }

    warnings
}
