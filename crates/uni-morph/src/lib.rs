//! uni-morph - pluggable DOM reconciliation
//!
//! One uniform contract (`morph(target, source_html)`) over swappable
//! diffing strategies. The runtime never sees which adapter is active;
//! adapters differ only in how they resolve node identity when pairing
//! old and new children.

mod adapters;
mod engine;

pub use adapters::{AlpineMorpher, IdiomorphMorpher, MorphdomMorpher};
pub use engine::Reconciler;

use uni_dom::{Document, NodeId};

/// In-place DOM reconciliation.
///
/// Mutates `target`'s subtree to match `source_html` while preserving
/// the identity (NodeId, live form state, focus) of unchanged nodes.
pub trait Morpher {
    /// Adapter name as selected by configuration.
    fn name(&self) -> &'static str;

    /// Reconcile `target` against the (single-rooted) `source_html`.
    fn morph(&self, doc: &mut Document, target: NodeId, source_html: &str)
    -> Result<(), MorphError>;
}

/// Morpher selection and behavior knobs.
#[derive(Debug, Clone)]
pub struct MorphOptions {
    /// Adapter name: "morphdom", "idiomorph" or "alpine".
    pub name: String,
    /// Attributes treated as explicit stable keys, in priority order.
    pub key_attrs: Vec<String>,
}

impl Default for MorphOptions {
    fn default() -> Self {
        Self {
            name: "morphdom".to_string(),
            key_attrs: vec!["unicorn:key".to_string(), "u:key".to_string()],
        }
    }
}

/// Reconciliation errors.
#[derive(Debug, thiserror::Error)]
pub enum MorphError {
    #[error("unknown morpher \"{0}\"")]
    UnknownAdapter(String),

    #[error("morph source contains no root element")]
    EmptySource,

    #[error("morph target {0:?} is not an element")]
    InvalidTarget(NodeId),
}

/// Build the adapter named by `options`.
pub fn create_morpher(options: &MorphOptions) -> Result<Box<dyn Morpher>, MorphError> {
    match options.name.as_str() {
        "morphdom" => Ok(Box::new(MorphdomMorpher::new(options))),
        "idiomorph" => Ok(Box::new(IdiomorphMorpher::new(options))),
        "alpine" => Ok(Box::new(AlpineMorpher::new(options))),
        other => Err(MorphError::UnknownAdapter(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_resolves_known_adapters() {
        for name in ["morphdom", "idiomorph", "alpine"] {
            let opts = MorphOptions {
                name: name.to_string(),
                ..Default::default()
            };
            assert_eq!(create_morpher(&opts).unwrap().name(), name);
        }
    }

    #[test]
    fn factory_rejects_unknown_adapter() {
        let opts = MorphOptions {
            name: "magic".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_morpher(&opts),
            Err(MorphError::UnknownAdapter(_))
        ));
    }
}
