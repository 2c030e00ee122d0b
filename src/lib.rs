//! Intercept Layers: protocol detection and layer composition for an intercepting proxy
//!
//! Given a connection's layer stack and the bytes its client has sent so far,
//! this library decides which protocol layer should handle the traffic next:
//! TLS (server or client side), HTTP (regular, upstream or transparent), or
//! opaque TCP. Host filters can exempt connections from interception entirely,
//! and may need to wait for a complete TLS ClientHello before deciding.
//!
//! # Main Features
//!
//! - Non-blocking classification of partially buffered client streams
//! - `ignore_hosts` / `allow_hosts` / `tcp_hosts` policies matched on server address and SNI
//! - Operating modes: regular, transparent, upstream and reverse proxy
//! - Policy snapshots swapped atomically on configuration change
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use intercept_layers::{Address, Client, Context, Decision, FilterPolicy, NextLayerResolver, ProxyOptions};
//!
//! # fn main() -> intercept_layers::Result<()> {
//! let options = ProxyOptions {
//!     ignore_hosts: vec![r"\.bank\.example$".to_string()],
//!     ..Default::default()
//! };
//! let policy = Arc::new(FilterPolicy::compile(&options)?);
//! let resolver = NextLayerResolver::new();
//!
//! let mut context = Context::new(Client::new(Address::new("10.0.0.2", 50123)));
//! let data = b"GET http://example.com/ HTTP/1.1\r\n";
//!
//! while let Decision::Push(layer) = resolver.resolve(&policy, &context, data)? {
//!     context.push_layer(layer);
//!     if layer.takes_over_stream() {
//!         break;
//!     }
//! }
//! println!("{:?}", context.layers());
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod filter;
pub mod layer;
pub mod protocol;
pub mod proxy;
pub mod resolver;

// Re-export commonly used structures and functions for convenience
pub use common::{ProxyError, Result};
pub use config::{FilterPolicy, Mode, PolicyStore, ProxyOptions};
pub use filter::{ConnectionFilter, FilterDecision, HostMatcher};
pub use layer::{Address, Client, Context, HttpMode, Layer, LayerKind, LayerPattern};
pub use proxy::{LayerSession, Progress};
pub use resolver::{Decision, NextLayerResolver, ResolveError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
