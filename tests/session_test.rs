//! Layer session tests
//!
//! Whole connections fed through a session, including the hand-off around the
//! client TLS handshake.

mod common;

use std::io::Write;
use std::sync::Arc;

use intercept_layers::{
    Address, Client, Context, FilterPolicy, HttpMode, Layer, LayerSession, Mode, Progress,
    ProxyOptions,
};
use tempfile::NamedTempFile;

use common::client_hello;

fn session(options: ProxyOptions, server: Option<&str>) -> LayerSession {
    let policy = Arc::new(FilterPolicy::compile(&options).unwrap());
    let mut context = Context::new(Client::new(Address::new("192.0.2.50", 51000)));
    if let Some(host) = server {
        context = context.with_server(Address::new(host, 443));
    }
    LayerSession::new(context, policy)
}

#[test]
fn test_transparent_https() {
    let mut session = session(
        ProxyOptions {
            mode: Mode::Transparent,
            ..Default::default()
        },
        Some("93.184.215.14"),
    );

    let progress = session.feed(&client_hello(Some("example.com"), &["h2", "http/1.1"])).unwrap();
    assert_eq!(progress, Progress::Established(Layer::ClientTls));
    assert_eq!(
        session.layers(),
        &[Layer::TransparentProxy, Layer::ServerTls, Layer::ClientTls]
    );

    session
        .tls_established(Some("example.com".to_string()), Some("h2".to_string()))
        .unwrap();
    assert!(session.buffered().is_empty());
    assert_eq!(session.context().client.alpn.as_deref(), Some("h2"));

    let progress = session.feed(b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n").unwrap();
    assert_eq!(progress, Progress::Established(Layer::Http(HttpMode::Transparent)));
}

#[test]
fn test_regular_proxy_connect() {
    let mut session = session(ProxyOptions::default(), None);

    assert_eq!(
        session.feed(b"CONNECT example.com:443 HTTP/1.1\r\n\r\n").unwrap(),
        Progress::Established(Layer::Http(HttpMode::Regular))
    );
    assert_eq!(session.layers(), &[Layer::HttpProxy, Layer::Http(HttpMode::Regular)]);
}

#[test]
fn test_secure_web_proxy() {
    let mut session = session(ProxyOptions::default(), None);

    assert_eq!(
        session.feed(&client_hello(Some("proxy.internal"), &["http/1.1"])).unwrap(),
        Progress::Established(Layer::ClientTls)
    );
    session
        .tls_established(Some("proxy.internal".to_string()), Some("http/1.1".to_string()))
        .unwrap();

    assert_eq!(
        session.feed(b"GET http://example.com/ HTTP/1.1\r\n").unwrap(),
        Progress::Established(Layer::Http(HttpMode::Regular))
    );
    assert_eq!(
        session.layers(),
        &[Layer::HttpProxy, Layer::ClientTls, Layer::Http(HttpMode::Regular)]
    );
}

#[test]
fn test_reverse_proxy_tls() {
    let mut session = session(
        ProxyOptions {
            mode: Mode::Reverse("https://origin.internal".to_string()),
            ..Default::default()
        },
        None,
    );

    assert_eq!(
        session.feed(&client_hello(Some("www.example.com"), &[])).unwrap(),
        Progress::Established(Layer::ClientTls)
    );
    session.tls_established(None, None).unwrap();

    // Only HTTP proxy stacks get a regular or upstream HTTP layer
    assert_eq!(
        session.feed(b"GET / HTTP/1.1\r\n").unwrap(),
        Progress::Established(Layer::Http(HttpMode::Transparent))
    );
}

#[test]
fn test_ignored_host_with_fragmented_client_hello() {
    let mut session = session(
        ProxyOptions {
            mode: Mode::Transparent,
            ignore_hosts: vec![r"\.bank\.example$".to_string()],
            ..Default::default()
        },
        Some("198.51.100.77"),
    );
    let hello = client_hello(Some("online.bank.example"), &["h2"]);

    for chunk in hello[..hello.len() - 1].chunks(7) {
        assert_eq!(session.feed(chunk).unwrap(), Progress::NeedMoreData);
    }
    assert_eq!(session.layers(), &[Layer::TransparentProxy]);

    assert_eq!(
        session.feed(&hello[hello.len() - 1..]).unwrap(),
        Progress::Established(Layer::Tcp { ignore: true })
    );
    assert_eq!(session.buffered().len(), hello.len());
}

#[test]
fn test_rawtcp_uses_negotiated_alpn() {
    let mut session = session(
        ProxyOptions {
            mode: Mode::Transparent,
            rawtcp: true,
            ..Default::default()
        },
        Some("mail.example.com"),
    );

    session.feed(&client_hello(Some("mail.example.com"), &["imap"])).unwrap();
    session
        .tls_established(Some("mail.example.com".to_string()), Some("imap".to_string()))
        .unwrap();

    assert_eq!(
        session.feed(b"a001 CAPABILITY\r\n").unwrap(),
        Progress::Established(Layer::Tcp { ignore: false })
    );
}

#[test]
fn test_tls_established_twice_fails() {
    let mut session = session(ProxyOptions::default(), None);
    session.feed(&client_hello(None, &[])).unwrap();

    assert!(session.tls_established(None, None).is_ok());
    assert!(session.tls_established(None, None).is_err());
}

#[tokio::test]
async fn test_run_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&client_hello(Some("example.com"), &["h2"])).unwrap();
    file.flush().unwrap();

    let mut reader = tokio::fs::File::open(file.path()).await.unwrap();
    let mut session = session(
        ProxyOptions {
            mode: Mode::Transparent,
            ..Default::default()
        },
        Some("example.com"),
    );

    let progress = session.run(&mut reader).await.unwrap();
    assert_eq!(progress, Progress::Established(Layer::ClientTls));
}

#[test]
fn test_oversized_client_hello_stops_buffering() {
    let mut session = session(
        ProxyOptions {
            mode: Mode::Transparent,
            ignore_hosts: vec!["evil".to_string()],
            ..Default::default()
        },
        Some("198.51.100.5"),
    );

    // One full record whose handshake header claims a 16 MiB body
    let mut record = vec![0x16, 0x03, 0x01, 0x40, 0x00, 0x01, 0xff, 0xff, 0xff];
    record.resize(5 + 0x4000, 0);

    assert_eq!(session.feed(&record[..8192]).unwrap(), Progress::NeedMoreData);
    assert_eq!(
        session.feed(&record[8192..]).unwrap(),
        Progress::Established(Layer::ClientTls)
    );
    assert_eq!(
        session.layers(),
        &[Layer::TransparentProxy, Layer::ServerTls, Layer::ClientTls]
    );
    assert_eq!(session.buffered().len(), record.len());

    // The stream now belongs to client TLS and is no longer buffered
    session.feed(&[0u8; 0x4000]).unwrap();
    assert_eq!(session.buffered().len(), record.len());
}
