//! TLS ClientHello sniffing
//!
//! The resolver only needs two facts from a ClientHello: the SNI host name and
//! the offered ALPN protocols. [`ClientHelloSniffer`] is the seam; the default
//! [`TlsClientHelloSniffer`] reads them straight from the record bytes.
//!
//! ClientHello layout after the handshake header:
//! - 2 bytes: legacy version
//! - 32 bytes: random
//! - 1 byte + variable: session id
//! - 2 bytes + variable: cipher suites
//! - 1 byte + variable: compression methods
//! - 2 bytes + variable: extensions (optional)

use log::{debug, trace};

use super::detector::{is_tls_record_magic, TLS_HANDSHAKE_RECORD};

const RECORD_HEADER_LEN: usize = 5;
const HANDSHAKE_HEADER_LEN: usize = 4;
const HANDSHAKE_CLIENT_HELLO: u8 = 0x01;
const RANDOM_LEN: usize = 32;

/// Largest ClientHello body accepted; real ones stay well below this
const MAX_HANDSHAKE_LEN: usize = 64 * 1024;
/// Upper bound on record bytes examined while reassembling a ClientHello
const MAX_SNIFF_BYTES: usize = MAX_HANDSHAKE_LEN + 16 * 1024;

const EXT_SERVER_NAME: u16 = 0;
const EXT_ALPN: u16 = 16;
const SERVER_NAME_TYPE_HOST: u8 = 0;

/// Fields extracted from a complete ClientHello
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHelloInfo {
    /// Server name, converted from IDNA to Unicode
    pub sni: Option<String>,
    /// Offered ALPN protocols, in client preference order
    pub alpn_protocols: Vec<String>,
}

/// Outcome of looking for a ClientHello in the client's first bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SniffResult {
    /// Data does not start with a TLS handshake record
    NotTls,
    /// Record header is present but the ClientHello is still incomplete
    NeedsMoreBytes,
    /// The bytes can never become a valid ClientHello
    Malformed,
    /// A complete ClientHello was read
    Parsed(ClientHelloInfo),
}

/// Extracts ClientHello details from a byte prefix
///
/// Implementations must not block and must give consistent answers when called
/// again with a longer prefix of the same stream.
#[cfg_attr(test, mockall::automock)]
pub trait ClientHelloSniffer: Send + Sync {
    fn sniff(&self, data: &[u8]) -> SniffResult;
}

/// Default sniffer working on raw TLS records
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsClientHelloSniffer;

impl ClientHelloSniffer for TlsClientHelloSniffer {
    fn sniff(&self, data: &[u8]) -> SniffResult {
        if !is_tls_record_magic(data) {
            return SniffResult::NotTls;
        }

        let message = match reassemble_handshake(data) {
            Ok(message) => message,
            Err(result) => return result,
        };

        match parse_client_hello(&message) {
            Some(info) => {
                trace!("Parsed ClientHello: sni={:?} alpn={:?}", info.sni, info.alpn_protocols);
                SniffResult::Parsed(info)
            }
            None => {
                debug!("Malformed ClientHello ({} handshake bytes)", message.len());
                SniffResult::Malformed
            }
        }
    }
}

/// Collect the ClientHello handshake message, which may span several records
fn reassemble_handshake(data: &[u8]) -> Result<Vec<u8>, SniffResult> {
    let mut message = Vec::new();
    let mut offset = 0;

    loop {
        if message.len() >= HANDSHAKE_HEADER_LEN {
            if message[0] != HANDSHAKE_CLIENT_HELLO {
                return Err(SniffResult::Malformed);
            }
            let body_len = read_u24(&message[1..4]);
            if body_len > MAX_HANDSHAKE_LEN {
                debug!("ClientHello claims {} bytes, limit is {}", body_len, MAX_HANDSHAKE_LEN);
                return Err(SniffResult::Malformed);
            }
            let total = HANDSHAKE_HEADER_LEN + body_len;
            if message.len() >= total {
                message.truncate(total);
                return Ok(message);
            }
        }

        if offset >= MAX_SNIFF_BYTES {
            debug!("No complete ClientHello within {} bytes", MAX_SNIFF_BYTES);
            return Err(SniffResult::Malformed);
        }

        let Some(header) = data.get(offset..offset + RECORD_HEADER_LEN) else {
            return Err(SniffResult::NeedsMoreBytes);
        };
        if header[0] != TLS_HANDSHAKE_RECORD || header[1] != 0x03 {
            return Err(SniffResult::Malformed);
        }
        let fragment_len = u16::from_be_bytes([header[3], header[4]]) as usize;
        if fragment_len == 0 {
            return Err(SniffResult::Malformed);
        }

        let start = offset + RECORD_HEADER_LEN;
        let Some(fragment) = data.get(start..start + fragment_len) else {
            return Err(SniffResult::NeedsMoreBytes);
        };
        message.extend_from_slice(fragment);
        offset = start + fragment_len;
    }
}

/// Cursor over a byte slice; every read is bounds-checked
struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.data.len() < len {
            return None;
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    }

    fn vec_u8(&mut self) -> Option<&'a [u8]> {
        let len = self.u8()? as usize;
        self.take(len)
    }

    fn vec_u16(&mut self) -> Option<&'a [u8]> {
        let len = self.u16()? as usize;
        self.take(len)
    }
}

fn read_u24(b: &[u8]) -> usize {
    ((b[0] as usize) << 16) | ((b[1] as usize) << 8) | b[2] as usize
}

fn parse_client_hello(message: &[u8]) -> Option<ClientHelloInfo> {
    let mut r = Reader::new(message.get(HANDSHAKE_HEADER_LEN..)?);

    r.take(2)?; // legacy version
    r.take(RANDOM_LEN)?;
    r.vec_u8()?; // session id
    r.vec_u16()?; // cipher suites
    r.vec_u8()?; // compression methods

    let mut info = ClientHelloInfo::default();
    if r.is_empty() {
        return Some(info);
    }

    let mut extensions = Reader::new(r.vec_u16()?);
    if !r.is_empty() {
        return None;
    }

    while !extensions.is_empty() {
        let ext_type = extensions.u16()?;
        let ext_data = extensions.vec_u16()?;
        match ext_type {
            EXT_SERVER_NAME => info.sni = parse_server_name(ext_data)?,
            EXT_ALPN => info.alpn_protocols = parse_alpn(ext_data)?,
            _ => {}
        }
    }

    Some(info)
}

/// Outer `None` is a malformed extension, inner `None` an unusable name
fn parse_server_name(data: &[u8]) -> Option<Option<String>> {
    let mut list = Reader::new(Reader::new(data).vec_u16()?);
    while !list.is_empty() {
        let name_type = list.u8()?;
        let name = list.vec_u16()?;
        if name_type == SERVER_NAME_TYPE_HOST {
            return Some(decode_host_name(name));
        }
    }
    Some(None)
}

fn decode_host_name(raw: &[u8]) -> Option<String> {
    let ascii = match std::str::from_utf8(raw) {
        Ok(s) if !s.is_empty() => s,
        _ => {
            debug!("SNI is not a valid host name: {:02X?}", raw);
            return None;
        }
    };

    let (host, result) = idna::domain_to_unicode(ascii);
    match result {
        Ok(()) => Some(host),
        Err(e) => {
            debug!("SNI '{}' failed IDNA decoding: {:?}", ascii, e);
            None
        }
    }
}

fn parse_alpn(data: &[u8]) -> Option<Vec<String>> {
    let mut list = Reader::new(Reader::new(data).vec_u16()?);
    let mut protocols = Vec::new();
    while !list.is_empty() {
        let proto = list.vec_u8()?;
        protocols.push(String::from_utf8_lossy(proto).into_owned());
    }
    Some(protocols)
}
