//! Default configuration values
//!
//! This module is the single source of truth for defaults.

use super::types::Mode;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "INTERCEPT_LAYERS";

/// Separator for list values given through environment variables
pub const ENV_LIST_SEPARATOR: &str = ",";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Accepted log levels
pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Default operating mode
pub fn mode() -> Mode {
    Mode::Regular
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}

/// Heuristic raw TCP detection is off unless asked for
pub fn rawtcp() -> bool {
    false
}
