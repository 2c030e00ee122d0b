//! Shared helpers for integration tests

#![allow(dead_code)]

use intercept_layers::{Address, Client, Context, FilterPolicy, Layer, ProxyOptions};

/// Build a TLS ClientHello record carrying the given SNI and ALPN offers
pub fn client_hello(sni: Option<&str>, alpn: &[&str]) -> Vec<u8> {
    let mut body = vec![0x03, 0x03];
    body.extend_from_slice(&[0x5a; 32]);
    body.push(0);
    body.extend_from_slice(&[0x00, 0x04, 0x13, 0x01, 0x13, 0x02]);
    body.extend_from_slice(&[0x01, 0x00]);

    let mut extensions = Vec::new();
    if let Some(name) = sni {
        let mut list = vec![0u8];
        list.extend_from_slice(&(name.len() as u16).to_be_bytes());
        list.extend_from_slice(name.as_bytes());
        push_extension(&mut extensions, 0, &with_u16_len(&list));
    }
    if !alpn.is_empty() {
        let mut list = Vec::new();
        for proto in alpn {
            list.push(proto.len() as u8);
            list.extend_from_slice(proto.as_bytes());
        }
        push_extension(&mut extensions, 16, &with_u16_len(&list));
    }
    body.extend_from_slice(&with_u16_len(&extensions));

    let mut handshake = vec![0x01];
    handshake.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
    handshake.extend_from_slice(&body);

    let mut record = vec![0x16, 0x03, 0x01];
    record.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
    record.extend_from_slice(&handshake);
    record
}

fn with_u16_len(data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(data);
    out
}

fn push_extension(out: &mut Vec<u8>, ext_type: u16, data: &[u8]) {
    out.extend_from_slice(&ext_type.to_be_bytes());
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
}

/// Compile options, panicking on invalid test input
pub fn policy(options: ProxyOptions) -> FilterPolicy {
    FilterPolicy::compile(&options).expect("test options should compile")
}

/// A context with the given stack and optional destination host
pub fn context(server: Option<&str>, layers: &[Layer]) -> Context {
    let mut ctx = Context::new(Client::new(Address::new("198.51.100.20", 45000)));
    if let Some(host) = server {
        ctx = ctx.with_server(Address::new(host, 443));
    }
    for layer in layers {
        ctx.push_layer(*layer);
    }
    ctx
}
