//! Structural matching of layer stacks

use super::context::Context;
use super::kind::{Layer, LayerKind};

/// Predicate for one position of an expected stack shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPattern {
    /// Exactly this kind
    Kind(LayerKind),
    /// Any of these kinds
    AnyOf(&'static [LayerKind]),
    /// Any layer at all
    Any,
}

impl LayerPattern {
    pub fn matches(&self, layer: &Layer) -> bool {
        match self {
            Self::Kind(kind) => layer.kind() == *kind,
            Self::AnyOf(kinds) => kinds.contains(&layer.kind()),
            Self::Any => true,
        }
    }
}

impl From<LayerKind> for LayerPattern {
    fn from(kind: LayerKind) -> Self {
        Self::Kind(kind)
    }
}

/// Compare the context's whole stack against `expected`, position by position
pub fn stack_matches(context: &Context, expected: &[LayerPattern]) -> bool {
    let layers = context.layers();
    if layers.len() != expected.len() {
        return false;
    }
    layers
        .iter()
        .zip(expected)
        .all(|(actual, pattern)| pattern.matches(actual))
}
