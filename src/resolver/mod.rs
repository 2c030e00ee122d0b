//! Next-layer resolution
//!
//! Given a connection's layer stack and the client bytes buffered so far, the
//! [`NextLayerResolver`] picks the layer to push next, or defers until more
//! bytes arrive. Checks run in a fixed priority order:
//!
//! 1. empty stack: top layer from the operating mode, no bytes inspected
//! 2. fewer than three bytes: defer
//! 3. `ignore_hosts` / `allow_hosts`: ignored TCP passthrough, or defer
//! 4. TLS record magic: server or client TLS layer
//! 5. HTTP proxy stacks: regular or upstream HTTP
//! 6. `tcp_hosts`: TCP layer
//! 7. `rawtcp` heuristics: TCP layer
//! 8. transparent HTTP

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use thiserror::Error;

use crate::common::ProxyError;
use crate::config::{FilterPolicy, Mode};
use crate::filter::FilterDecision;
use crate::layer::{stack_matches, Context, HttpMode, Layer, LayerKind, LayerPattern};
use crate::protocol::{
    is_http_alpn, is_tls_record_magic, looks_like_http_method, tls_record_version,
    ClientHelloSniffer, TlsClientHelloSniffer, MIN_CLASSIFY_BYTES,
};

const HTTP_PROXY: &[LayerPattern] = &[LayerPattern::Kind(LayerKind::HttpProxy)];
const REVERSE_PROXY: &[LayerPattern] = &[LayerPattern::Kind(LayerKind::ReverseProxy)];
// "Secure Web Proxy": TLS between client and proxy, no server-side TLS layer.
const SECURE_WEB_PROXY: &[LayerPattern] = &[
    LayerPattern::Kind(LayerKind::HttpProxy),
    LayerPattern::Kind(LayerKind::ClientTls),
];

/// Fatal conditions met while resolving
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The mode parses but has no top layer
    #[error("Mode not implemented: {0}")]
    UnimplementedMode(Mode),
}

impl From<ResolveError> for ProxyError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnimplementedMode(mode) => ProxyError::ModeNotImplemented(mode.to_string()),
        }
    }
}

/// What to do with the connection next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Push this layer onto the stack
    Push(Layer),
    /// Not enough bytes yet; call again once more data arrived
    Defer,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(layer) => write!(f, "push {}", layer),
            Self::Defer => write!(f, "defer"),
        }
    }
}

/// Pure function of (policy snapshot, context, byte prefix)
#[derive(Clone)]
pub struct NextLayerResolver {
    sniffer: Arc<dyn ClientHelloSniffer>,
}

impl Default for NextLayerResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NextLayerResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextLayerResolver").finish_non_exhaustive()
    }
}

impl NextLayerResolver {
    /// Resolver using the built-in ClientHello sniffer
    pub fn new() -> Self {
        Self::with_sniffer(TlsClientHelloSniffer)
    }

    /// Resolver using a custom ClientHello sniffer
    pub fn with_sniffer<S>(sniffer: S) -> Self
    where
        S: ClientHelloSniffer + 'static,
    {
        Self {
            sniffer: Arc::new(sniffer),
        }
    }

    /// Decide the next layer for `context`
    ///
    /// # Parameters
    ///
    /// * `policy` - Policy snapshot for this connection
    /// * `context` - Connection context with the current layer stack
    /// * `data` - All client bytes buffered for the layer being resolved
    ///
    /// # Returns
    ///
    /// The decision, or an error if the operating mode cannot start a stack
    pub fn resolve(
        &self,
        policy: &FilterPolicy,
        context: &Context,
        data: &[u8],
    ) -> Result<Decision, ResolveError> {
        if context.layers().is_empty() {
            let layer = make_top_layer(policy.mode())?;
            debug!("Top layer for mode {}: {}", policy.mode(), layer);
            return Ok(Decision::Push(layer));
        }

        if data.len() < MIN_CLASSIFY_BYTES {
            trace!("Only {} client bytes, deferring", data.len());
            return Ok(Decision::Defer);
        }

        let decision = self.classify(policy, context, data);
        match decision {
            Decision::Push(layer) => debug!("Next layer on {:?}: {}", context.layers(), layer),
            Decision::Defer => trace!("Deferring next layer on {:?}", context.layers()),
        }
        Ok(decision)
    }

    fn classify(&self, policy: &FilterPolicy, context: &Context, data: &[u8]) -> Decision {
        match policy.filter().decide(context, data, self.sniffer.as_ref()) {
            FilterDecision::Ignore => return Decision::Push(Layer::Tcp { ignore: true }),
            FilterDecision::Defer => return Decision::Defer,
            FilterDecision::Allow => {}
        }

        if is_tls_record_magic(data) {
            trace!("TLS record detected ({:?})", tls_record_version(data));
            // Reverse and HTTP proxy modes handle the server side themselves.
            let server_tls_ready = context.top_layer() == Some(&Layer::ServerTls)
                || stack_matches(context, REVERSE_PROXY)
                || stack_matches(context, HTTP_PROXY);
            return if server_tls_ready {
                Decision::Push(Layer::ClientTls)
            } else {
                Decision::Push(Layer::ServerTls)
            };
        }

        if stack_matches(context, HTTP_PROXY) || stack_matches(context, SECURE_WEB_PROXY) {
            let mode = match policy.mode() {
                Mode::Regular => HttpMode::Regular,
                _ => HttpMode::Upstream,
            };
            return Decision::Push(Layer::Http(mode));
        }

        if is_tcp_host(policy, context) {
            return Decision::Push(Layer::Tcp { ignore: false });
        }

        if policy.rawtcp() {
            let alpn_indicates_non_http = context
                .client
                .alpn
                .as_deref()
                .is_some_and(|alpn| !alpn.is_empty() && !is_http_alpn(alpn));
            if alpn_indicates_non_http || !looks_like_http_method(data) {
                return Decision::Push(Layer::Tcp { ignore: false });
            }
        }

        Decision::Push(Layer::Http(HttpMode::Transparent))
    }
}

/// Top layer for an operating mode
pub fn make_top_layer(mode: &Mode) -> Result<Layer, ResolveError> {
    if mode.is_http_proxy() {
        return Ok(Layer::HttpProxy);
    }
    match mode {
        Mode::Transparent => Ok(Layer::TransparentProxy),
        Mode::Reverse(_) => Ok(Layer::ReverseProxy),
        _ => Err(ResolveError::UnimplementedMode(mode.clone())),
    }
}

fn is_tcp_host(policy: &FilterPolicy, context: &Context) -> bool {
    let tcp_hosts = policy.tcp_hosts();
    if tcp_hosts.is_empty() {
        return false;
    }

    let server_host = context.server.address.as_ref().map(|addr| addr.host.as_str());
    let sni = context.client.sni.as_deref();
    match server_host.into_iter().chain(sni).find_map(|host| tcp_hosts.find(host)) {
        Some(pattern) => {
            debug!("Host matches tcp_hosts pattern '{}'", pattern);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyOptions;
    use crate::layer::{Address, Client};
    use crate::protocol::{MockClientHelloSniffer, SniffResult};

    const TLS_PREFIX: &[u8] = &[0x16, 0x03, 0x01, 0x00, 0x40, 0x01];

    fn policy(options: ProxyOptions) -> FilterPolicy {
        FilterPolicy::compile(&options).unwrap()
    }

    fn context(layers: &[Layer]) -> Context {
        let mut ctx = Context::new(Client::new(Address::new("192.0.2.1", 40000)))
            .with_server(Address::new("example.com", 443));
        for layer in layers {
            ctx.push_layer(*layer);
        }
        ctx
    }

    #[test]
    fn test_top_layers() {
        assert_eq!(make_top_layer(&Mode::Regular), Ok(Layer::HttpProxy));
        assert_eq!(make_top_layer(&Mode::Upstream("http://up:8080".into())), Ok(Layer::HttpProxy));
        assert_eq!(make_top_layer(&Mode::Transparent), Ok(Layer::TransparentProxy));
        assert_eq!(make_top_layer(&Mode::Reverse("http://origin".into())), Ok(Layer::ReverseProxy));
        assert_eq!(
            make_top_layer(&Mode::Socks5),
            Err(ResolveError::UnimplementedMode(Mode::Socks5))
        );
    }

    #[test]
    fn test_unimplemented_mode_converts_to_proxy_error() {
        let err: ProxyError = ResolveError::UnimplementedMode(Mode::Socks5).into();
        assert!(matches!(err, ProxyError::ModeNotImplemented(ref m) if m == "socks5"));
    }

    #[test]
    fn test_sniffer_not_consulted_without_filters() {
        let mut sniffer = MockClientHelloSniffer::new();
        sniffer.expect_sniff().never();
        let resolver = NextLayerResolver::with_sniffer(sniffer);

        let decision = resolver
            .resolve(&policy(ProxyOptions::default()), &context(&[Layer::TransparentProxy]), TLS_PREFIX)
            .unwrap();
        assert_eq!(decision, Decision::Push(Layer::ServerTls));
    }

    #[test]
    fn test_filter_defer_propagates() {
        let mut sniffer = MockClientHelloSniffer::new();
        sniffer.expect_sniff().times(1).return_const(SniffResult::NeedsMoreBytes);
        let resolver = NextLayerResolver::with_sniffer(sniffer);
        let options = ProxyOptions {
            ignore_hosts: vec!["nomatch".to_string()],
            ..Default::default()
        };

        let decision = resolver
            .resolve(&policy(options), &context(&[Layer::TransparentProxy]), TLS_PREFIX)
            .unwrap();
        assert_eq!(decision, Decision::Defer);
    }

    #[test]
    fn test_tcp_hosts_match_sni() {
        let options = ProxyOptions {
            mode: Mode::Transparent,
            tcp_hosts: vec![r"^imap\.".to_string()],
            ..Default::default()
        };
        let mut ctx = context(&[Layer::TransparentProxy, Layer::ServerTls, Layer::ClientTls]);
        ctx.server.address = None;
        ctx.client.sni = Some("imap.example.com".to_string());

        let decision = NextLayerResolver::new()
            .resolve(&policy(options), &ctx, b"a001 LOGIN")
            .unwrap();
        assert_eq!(decision, Decision::Push(Layer::Tcp { ignore: false }));
    }

    #[test]
    fn test_rawtcp_alpn() {
        let options = ProxyOptions {
            mode: Mode::Transparent,
            rawtcp: true,
            ..Default::default()
        };
        let policy = policy(options);
        let mut ctx = context(&[Layer::TransparentProxy, Layer::ServerTls, Layer::ClientTls]);

        ctx.client.alpn = Some("imap".to_string());
        let decision = NextLayerResolver::new().resolve(&policy, &ctx, b"GET / HTTP/1.1").unwrap();
        assert_eq!(decision, Decision::Push(Layer::Tcp { ignore: false }));

        ctx.client.alpn = Some("http/1.1".to_string());
        let decision = NextLayerResolver::new().resolve(&policy, &ctx, b"GET / HTTP/1.1").unwrap();
        assert_eq!(decision, Decision::Push(Layer::Http(HttpMode::Transparent)));
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Push(Layer::ClientTls).to_string(), "push ClientTLSLayer");
        assert_eq!(Decision::Defer.to_string(), "defer");
    }
}
