//! Protocol detection module
//!
//! This module classifies the first bytes of a client connection: TLS record
//! magic, an HTTP-looking method token, and the SNI/ALPN carried by a TLS
//! ClientHello. Every check is non-blocking and safe to repeat on a growing
//! buffer, similar to how NGINX and HAProxy peek at a connection.

mod client_hello;
mod detector;

pub use client_hello::{ClientHelloInfo, ClientHelloSniffer, SniffResult, TlsClientHelloSniffer};
#[cfg(test)]
pub use client_hello::MockClientHelloSniffer;
pub use detector::{
    is_http_alpn, is_tls_record_magic, looks_like_http_method, tls_record_version, HTTP_ALPNS,
    MIN_CLASSIFY_BYTES, TLS_HANDSHAKE_RECORD,
};
