//! Compiled filter policy
//!
//! A [`FilterPolicy`] is the immutable, validated form of [`ProxyOptions`].
//! [`PolicyStore`] swaps whole snapshots, so a connection reading the policy
//! never observes a half-applied update.

use std::sync::Arc;

use arc_swap::ArcSwap;
use log::info;

use crate::filter::{ConnectionFilter, HostMatcher};
use super::error::{ConfigError, Result};
use super::types::{Mode, ProxyOptions};
use super::validator::validate_options;

/// Everything the resolver needs from configuration
#[derive(Debug, Clone, Default)]
pub struct FilterPolicy {
    mode: Mode,
    filter: ConnectionFilter,
    tcp_hosts: HostMatcher,
    rawtcp: bool,
}

impl FilterPolicy {
    /// Validate options and compile every pattern list
    pub fn compile(options: &ProxyOptions) -> Result<Self> {
        validate_options(options)?;

        let ignore_hosts = compile_patterns("ignore_hosts", &options.ignore_hosts)?;
        let allow_hosts = compile_patterns("allow_hosts", &options.allow_hosts)?;
        let tcp_hosts = compile_patterns("tcp_hosts", &options.tcp_hosts)?;

        Ok(Self {
            mode: options.mode.clone(),
            filter: ConnectionFilter::new(ignore_hosts, allow_hosts)?,
            tcp_hosts,
            rawtcp: options.rawtcp,
        })
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn filter(&self) -> &ConnectionFilter {
        &self.filter
    }

    pub fn tcp_hosts(&self) -> &HostMatcher {
        &self.tcp_hosts
    }

    pub fn rawtcp(&self) -> bool {
        self.rawtcp
    }
}

fn compile_patterns(option: &'static str, patterns: &[String]) -> Result<HostMatcher> {
    HostMatcher::new(patterns).map_err(|source| ConfigError::InvalidPattern { option, source })
}

/// Holder of the active policy snapshot
#[derive(Debug, Default)]
pub struct PolicyStore {
    current: ArcSwap<FilterPolicy>,
}

impl PolicyStore {
    pub fn new(policy: FilterPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(policy),
        }
    }

    /// Compile `options` into a fresh store
    pub fn from_options(options: &ProxyOptions) -> Result<Self> {
        Ok(Self::new(FilterPolicy::compile(options)?))
    }

    /// The active snapshot
    pub fn load(&self) -> Arc<FilterPolicy> {
        self.current.load_full()
    }

    /// Replace the active snapshot with one compiled from `options`
    ///
    /// On error the previous snapshot stays active.
    pub fn apply(&self, options: &ProxyOptions) -> Result<Arc<FilterPolicy>> {
        let policy = Arc::new(FilterPolicy::compile(options)?);
        self.current.store(Arc::clone(&policy));
        info!(
            "Applied policy: mode={} ignore_hosts={} allow_hosts={} tcp_hosts={} rawtcp={}",
            policy.mode,
            policy.filter.ignore_hosts().len(),
            policy.filter.allow_hosts().len(),
            policy.tcp_hosts.len(),
            policy.rawtcp
        );
        Ok(policy)
    }
}
