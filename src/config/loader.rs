//! Configuration loader
//!
//! Sources are layered from lowest to highest priority:
//! 1. Default values (serde defaults)
//! 2. Configuration file (JSON)
//! 3. Environment variables with the `INTERCEPT_LAYERS_` prefix
//!
//! Command line overrides are applied on top by the binary.

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat};
use log::debug;

use super::defaults::{ENV_LIST_SEPARATOR, ENV_PREFIX};
use super::error::{ConfigError, Result};
use super::types::ProxyOptions;

const LIST_OPTIONS: &[&str] = &["ignore_hosts", "allow_hosts", "tcp_hosts"];

/// Builder over the configuration sources
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Create a loader that only yields defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a JSON configuration file; it must exist
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref();
        debug!("Adding file configuration source: {}", path.display());
        self.file = Some(path.to_path_buf());
        self
    }

    /// Add environment variables with the given prefix
    pub fn with_env(mut self, prefix: &str) -> Self {
        debug!("Adding environment configuration source with prefix: {}", prefix);
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Load and deserialize the layered options
    pub fn load(self) -> Result<ProxyOptions> {
        let mut builder = Config::builder();

        if let Some(path) = &self.file {
            if !path.is_file() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Json));
        }

        if let Some(prefix) = &self.env_prefix {
            let mut env = Environment::with_prefix(prefix)
                .try_parsing(true)
                .list_separator(ENV_LIST_SEPARATOR);
            for key in LIST_OPTIONS {
                env = env.with_list_parse_key(key);
            }
            builder = builder.add_source(env);
        }

        let options: ProxyOptions = builder.build()?.try_deserialize()?;
        debug!("Loaded options: {:?}", options);
        Ok(options)
    }
}

impl ProxyOptions {
    /// Load options from a JSON file, on top of defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        ConfigLoader::new().with_file(path).load()
    }

    /// Load options from the default sources
    ///
    /// Uses `path` if given, otherwise `config.json` when it exists, then the
    /// environment.
    pub fn auto_load(path: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new();

        match path {
            Some(path) => loader = loader.with_file(path),
            None => {
                let default_file = Path::new(super::defaults::DEFAULT_CONFIG_FILE);
                if default_file.is_file() {
                    loader = loader.with_file(default_file);
                }
            }
        }

        loader.with_env(ENV_PREFIX).load()
    }
}
