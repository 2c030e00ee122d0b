//! Configuration types
//!
//! Raw, user-facing options. They are compiled into a
//! [`FilterPolicy`](super::FilterPolicy) before any connection uses them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::defaults;
use super::error::ConfigError;

/// Proxy operating mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Explicit HTTP(S) proxy
    Regular,
    /// Transparent proxy, destination taken from the intercepted connection
    Transparent,
    /// Explicit proxy chaining to an upstream proxy
    Upstream(String),
    /// Reverse proxy in front of a fixed server
    Reverse(String),
    /// SOCKS5 proxy; accepted by the parser but has no top layer
    Socks5,
}

impl Mode {
    /// True for the modes whose top layer is the HTTP proxy layer
    pub fn is_http_proxy(&self) -> bool {
        matches!(self, Self::Regular | Self::Upstream(_))
    }
}

impl Default for Mode {
    fn default() -> Self {
        defaults::mode()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Transparent => write!(f, "transparent"),
            Self::Upstream(spec) => write!(f, "upstream:{}", spec),
            Self::Reverse(spec) => write!(f, "reverse:{}", spec),
            Self::Socks5 => write!(f, "socks5"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |msg: String| ConfigError::InvalidValue("mode".to_string(), msg);

        match s {
            "regular" => return Ok(Self::Regular),
            "transparent" => return Ok(Self::Transparent),
            "socks5" => return Ok(Self::Socks5),
            _ => {}
        }

        let (kind, spec) = s.split_once(':').ok_or_else(|| invalid(format!(
            "Invalid mode: {}. Valid values are: regular, transparent, upstream:<addr>, reverse:<addr>, socks5",
            s
        )))?;
        if spec.is_empty() {
            return Err(invalid(format!("Mode '{}' requires an address", kind)));
        }
        match kind {
            "upstream" => Ok(Self::Upstream(spec.to_string())),
            "reverse" => Ok(Self::Reverse(spec.to_string())),
            _ => Err(invalid(format!("Unknown mode: {}", s))),
        }
    }
}

// Modes travel as their string form in files and environment variables
impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Mode::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Mode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Options that drive next-layer decisions
///
/// Applied as a whole on every change; see [`PolicyStore`](super::PolicyStore).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyOptions {
    /// Operating mode
    pub mode: Mode,

    /// Hosts that bypass all classification (raw passthrough)
    pub ignore_hosts: Vec<String>,

    /// Hosts that are intercepted; everything else is ignored
    pub allow_hosts: Vec<String>,

    /// Hosts that always get an opaque TCP layer
    pub tcp_hosts: Vec<String>,

    /// Treat traffic that does not look like HTTP as raw TCP
    pub rawtcp: bool,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            mode: defaults::mode(),
            ignore_hosts: Vec::new(),
            allow_hosts: Vec::new(),
            tcp_hosts: Vec::new(),
            rawtcp: defaults::rawtcp(),
            log_level: defaults::log_level(),
        }
    }
}
