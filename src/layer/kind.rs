//! Layer descriptors
//!
//! The set of layers is closed: top layers are chosen by the operating mode,
//! protocol layers by inspecting client bytes.

use std::fmt;

/// How an HTTP layer treats requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMode {
    /// Explicit proxy, absolute-form requests
    Regular,
    /// Requests are forwarded to an upstream proxy
    Upstream,
    /// Origin-form requests, destination taken from the connection
    Transparent,
}

impl fmt::Display for HttpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Upstream => write!(f, "upstream"),
            Self::Transparent => write!(f, "transparent"),
        }
    }
}

/// One entry of a connection's layer stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Top layer for `regular` and `upstream:` modes
    HttpProxy,
    /// Top layer for `transparent` mode
    TransparentProxy,
    /// Top layer for `reverse:` mode
    ReverseProxy,
    /// TLS towards the client
    ClientTls,
    /// TLS towards the server
    ServerTls,
    /// HTTP processing
    Http(HttpMode),
    /// Opaque TCP forwarding; `ignore` marks a filtered passthrough
    Tcp {
        /// Whether the connection was ignored by host filters
        ignore: bool,
    },
}

/// Variant tag of a [`Layer`], without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    HttpProxy,
    TransparentProxy,
    ReverseProxy,
    ClientTls,
    ServerTls,
    Http,
    Tcp,
}

impl Layer {
    /// The variant tag of this layer
    pub fn kind(&self) -> LayerKind {
        match self {
            Self::HttpProxy => LayerKind::HttpProxy,
            Self::TransparentProxy => LayerKind::TransparentProxy,
            Self::ReverseProxy => LayerKind::ReverseProxy,
            Self::ClientTls => LayerKind::ClientTls,
            Self::ServerTls => LayerKind::ServerTls,
            Self::Http(_) => LayerKind::Http,
            Self::Tcp { .. } => LayerKind::Tcp,
        }
    }

    /// True if this layer consumes the client byte stream itself,
    /// so no further layer is resolved from the current bytes.
    pub fn takes_over_stream(&self) -> bool {
        matches!(self, Self::ClientTls | Self::Http(_) | Self::Tcp { .. })
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpProxy => write!(f, "HttpProxy"),
            Self::TransparentProxy => write!(f, "TransparentProxy"),
            Self::ReverseProxy => write!(f, "ReverseProxy"),
            Self::ClientTls => write!(f, "ClientTLSLayer"),
            Self::ServerTls => write!(f, "ServerTLSLayer"),
            Self::Http(mode) => write!(f, "HttpLayer({})", mode),
            Self::Tcp { ignore: true } => write!(f, "TCPLayer(ignore)"),
            Self::Tcp { ignore: false } => write!(f, "TCPLayer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ignores_payload() {
        assert_eq!(Layer::Http(HttpMode::Regular).kind(), LayerKind::Http);
        assert_eq!(Layer::Http(HttpMode::Transparent).kind(), LayerKind::Http);
        assert_eq!(Layer::Tcp { ignore: true }.kind(), Layer::Tcp { ignore: false }.kind());
    }

    #[test]
    fn test_layer_roles() {
        assert!(Layer::ClientTls.takes_over_stream());
        assert!(!Layer::ServerTls.takes_over_stream());
        assert!(!Layer::HttpProxy.takes_over_stream());
    }

    #[test]
    fn test_display() {
        assert_eq!(Layer::Http(HttpMode::Upstream).to_string(), "HttpLayer(upstream)");
        assert_eq!(Layer::Tcp { ignore: true }.to_string(), "TCPLayer(ignore)");
    }
}
