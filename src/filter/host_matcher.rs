//! Host pattern matching
//!
//! A [`HostMatcher`] is an immutable, compiled set of case-insensitive regular
//! expressions. Patterns are searched, not anchored, so `example\.com` also
//! matches `www.example.com:443`.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::layer::Address;

/// A host pattern that failed to compile
#[derive(Error, Debug)]
#[error("invalid host pattern '{pattern}': {source}")]
pub struct PatternError {
    /// The offending pattern as configured
    pub pattern: String,
    /// The underlying regex error
    #[source]
    pub source: regex::Error,
}

/// Compiled set of case-insensitive host patterns
#[derive(Debug, Clone, Default)]
pub struct HostMatcher {
    regexes: Vec<Regex>,
}

impl HostMatcher {
    /// Compile a sequence of patterns
    ///
    /// Fails on the first pattern that is not a valid regular expression, so an
    /// invalid configuration never reaches match time.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let regexes = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| PatternError {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { regexes })
    }

    /// True when no pattern is configured
    pub fn is_empty(&self) -> bool {
        self.regexes.is_empty()
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.regexes.len()
    }

    /// Return the first pattern found anywhere in `host`
    pub fn find(&self, host: &str) -> Option<&str> {
        self.regexes
            .iter()
            .find(|rex| rex.is_match(host))
            .map(Regex::as_str)
    }

    /// Test a bare hostname
    pub fn matches_host(&self, host: &str) -> bool {
        self.find(host).is_some()
    }

    /// Test an address in its `host:port` form
    pub fn matches_address(&self, address: Option<&Address>) -> bool {
        match address {
            Some(address) if !self.is_empty() => self.matches_host(&address.to_string()),
            _ => false,
        }
    }
}
