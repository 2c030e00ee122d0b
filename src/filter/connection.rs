//! Connection filter
//!
//! Decides whether a connection is exempt from interception, based on the
//! `ignore_hosts` or `allow_hosts` patterns and the host names known so far.

use log::{debug, trace};

use crate::config::error::ConfigError;
use crate::layer::Context;
use crate::protocol::{is_tls_record_magic, ClientHelloSniffer, SniffResult};
use super::host_matcher::HostMatcher;

/// Outcome of a filter check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Forward the connection without inspecting it
    Ignore,
    /// Continue with protocol classification
    Allow,
    /// Host names may still be incomplete; ask again with more bytes
    Defer,
}

/// Ignore-list or allow-list policy; never both
#[derive(Debug, Clone, Default)]
pub struct ConnectionFilter {
    ignore_hosts: HostMatcher,
    allow_hosts: HostMatcher,
}

impl ConnectionFilter {
    /// Build a filter, rejecting a configuration that sets both lists
    pub fn new(ignore_hosts: HostMatcher, allow_hosts: HostMatcher) -> Result<Self, ConfigError> {
        if !ignore_hosts.is_empty() && !allow_hosts.is_empty() {
            return Err(ConfigError::InvalidCombination(
                "The allow_hosts and ignore_hosts options are mutually exclusive".to_string(),
            ));
        }

        Ok(Self {
            ignore_hosts,
            allow_hosts,
        })
    }

    /// True if either list is configured
    pub fn is_active(&self) -> bool {
        !self.ignore_hosts.is_empty() || !self.allow_hosts.is_empty()
    }

    pub fn ignore_hosts(&self) -> &HostMatcher {
        &self.ignore_hosts
    }

    pub fn allow_hosts(&self) -> &HostMatcher {
        &self.allow_hosts
    }

    /// Decide for a connection given the client bytes seen so far
    pub fn decide(
        &self,
        context: &Context,
        data: &[u8],
        sniffer: &dyn ClientHelloSniffer,
    ) -> FilterDecision {
        if !self.is_active() {
            return FilterDecision::Allow;
        }

        let sniffed;
        let mut hostnames: Vec<&str> = Vec::with_capacity(2);
        if let Some(address) = &context.server.address {
            hostnames.push(&address.host);
        }

        if is_tls_record_magic(data) {
            sniffed = sniffer.sniff(data);
            match &sniffed {
                SniffResult::NeedsMoreBytes => {
                    trace!("ClientHello incomplete after {} bytes, deferring filter decision", data.len());
                    return FilterDecision::Defer;
                }
                SniffResult::Parsed(info) => {
                    if let Some(sni) = &info.sni {
                        hostnames.push(sni);
                    }
                }
                SniffResult::Malformed | SniffResult::NotTls => {
                    debug!("No SNI available for filtering");
                }
            }
        }

        if hostnames.is_empty() {
            return FilterDecision::Allow;
        }

        if !self.ignore_hosts.is_empty() {
            match first_match(&self.ignore_hosts, &hostnames) {
                Some((host, pattern)) => {
                    debug!("Ignoring connection: host '{}' matches ignore pattern '{}'", host, pattern);
                    FilterDecision::Ignore
                }
                None => FilterDecision::Allow,
            }
        } else {
            match first_match(&self.allow_hosts, &hostnames) {
                Some(_) => FilterDecision::Allow,
                None => {
                    debug!("Ignoring connection: no allow pattern matches {:?}", hostnames);
                    FilterDecision::Ignore
                }
            }
        }
    }
}

fn first_match<'a, 'm>(matcher: &'m HostMatcher, hosts: &[&'a str]) -> Option<(&'a str, &'m str)> {
    hosts
        .iter()
        .find_map(|host| matcher.find(host).map(|pattern| (*host, pattern)))
}
