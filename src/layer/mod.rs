//! Layer module
//!
//! Layer descriptors, the per-connection context that carries the layer stack,
//! and structural matching of stack shapes.

mod context;
mod kind;
mod stack;

pub use context::{Address, Client, Context, Server};
pub use kind::{HttpMode, Layer, LayerKind};
pub use stack::{stack_matches, LayerPattern};
