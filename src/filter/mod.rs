//! Host filter module
//!
//! Compiled host pattern sets and the allow/ignore connection filter built on them.

mod connection;
mod host_matcher;

pub use connection::{ConnectionFilter, FilterDecision};
pub use host_matcher::{HostMatcher, PatternError};
