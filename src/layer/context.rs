//! Connection context
//!
//! One [`Context`] exists per client connection. The layer stack only grows
//! while the connection lives; the resolver reads it and never mutates it.

use std::fmt;
use std::str::FromStr;

use crate::common::ProxyError;
use super::kind::Layer;

/// A host and port pair; the host may be a name or an IP literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Address {
    type Err = ProxyError;

    /// Parse `host:port` or `[v6]:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ProxyError::Config(format!("Address '{}' has no port", s)))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| ProxyError::Config(format!("Invalid port in address '{}': {}", s, e)))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(ProxyError::Config(format!("Address '{}' has no host", s)));
        }
        Ok(Self::new(host, port))
    }
}

/// Client side of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    /// Peer address
    pub address: Address,
    /// ALPN protocol negotiated by a client TLS layer
    pub alpn: Option<String>,
    /// SNI seen by a client TLS layer
    pub sni: Option<String>,
}

impl Client {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            alpn: None,
            sni: None,
        }
    }
}

/// Server side of a connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Server {
    /// Intended destination, if already known
    pub address: Option<Address>,
}

/// Per-connection state consulted by the resolver
#[derive(Debug, Clone)]
pub struct Context {
    layers: Vec<Layer>,
    pub client: Client,
    pub server: Server,
}

impl Context {
    /// Create a context with an empty layer stack
    pub fn new(client: Client) -> Self {
        Self {
            layers: Vec::new(),
            client,
            server: Server::default(),
        }
    }

    /// Set the intended destination
    pub fn with_server(mut self, address: Address) -> Self {
        self.server.address = Some(address);
        self
    }

    /// Active layers, outermost first
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Innermost layer
    pub fn top_layer(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Append a layer; called by the layer execution side only
    pub fn push_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }
}
