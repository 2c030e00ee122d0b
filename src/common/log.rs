//! Logging helpers
//!
//! `RUST_LOG` always wins over the configured level.

/// Initialize the global logger
///
/// # Parameters
///
/// * `level` - Fallback log level when `RUST_LOG` is not set
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    // Another logger may already be installed (tests, embedding applications)
    if let Err(e) = env_logger::Builder::from_env(env).try_init() {
        log::debug!("Logger not initialized: {}", e);
    }
}
