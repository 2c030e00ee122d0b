//! Byte-level protocol heuristics
//!
//! These checks look only at the first few bytes a client sent. They never
//! block and never consume data, so they can be re-run on a growing buffer.

use log::trace;

/// TLS record content type for handshake messages
pub const TLS_HANDSHAKE_RECORD: u8 = 0x16;

/// Bytes needed before any classification is attempted
pub const MIN_CLASSIFY_BYTES: usize = 3;

/// ALPN identifiers that negotiate HTTP
pub const HTTP_ALPNS: &[&str] = &["h2", "http/1.1", "http/1.0", "http/0.9"];

/// Check if data starts with a TLS handshake record header
///
/// Accepts record versions SSL 3.0 through TLS 1.2 (`0x16 0x03 0x00..=0x03`);
/// TLS 1.3 still uses `0x0303` on the record layer.
pub fn is_tls_record_magic(data: &[u8]) -> bool {
    data.len() >= MIN_CLASSIFY_BYTES
        && data[0] == TLS_HANDSHAKE_RECORD
        && data[1] == 0x03
        && data[2] <= 0x03
}

/// Check if the first three bytes could be the start of an HTTP method
///
/// This is deliberately coarse: any three ASCII letters pass, which also
/// admits plenty of other line-based protocols.
pub fn looks_like_http_method(data: &[u8]) -> bool {
    let looks_alpha = data.len() >= MIN_CLASSIFY_BYTES
        && data[..MIN_CLASSIFY_BYTES].iter().all(u8::is_ascii_alphabetic);
    if !looks_alpha {
        trace!("First bytes {:02X?} do not look like an HTTP method", &data[..data.len().min(MIN_CLASSIFY_BYTES)]);
    }
    looks_alpha
}

/// Check if a negotiated ALPN protocol is an HTTP one
pub fn is_http_alpn(alpn: &str) -> bool {
    HTTP_ALPNS.contains(&alpn)
}

/// Name of the record-layer version in a TLS record header
pub fn tls_record_version(data: &[u8]) -> Option<&'static str> {
    if !is_tls_record_magic(data) {
        return None;
    }

    match data[2] {
        0x00 => Some("SSLv3"),
        0x01 => Some("TLSv1.0"),
        0x02 => Some("TLSv1.1"),
        0x03 => Some("TLSv1.2+"),
        _ => None,
    }
}
