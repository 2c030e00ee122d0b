//! Proxy session module
//!
//! The glue between byte delivery and next-layer resolution. The actual
//! forwarding, TLS handshakes and HTTP handling live with the layers
//! themselves; a [`LayerSession`] only decides which of them to stack.

mod session;

pub use session::{LayerSession, Progress};
