//! Morpher adapters.
//!
//! Each adapter mirrors the identity-resolution behavior of the diffing
//! library it is named after; calling code only ever sees the
//! [`Morpher`] contract.

use uni_dom::{Document, NodeId};

use crate::{MorphError, MorphOptions, Morpher, Reconciler};

/// morphdom-style: explicit key attribute first, id attribute second,
/// positional fallback.
pub struct MorphdomMorpher {
    engine: Reconciler,
}

impl MorphdomMorpher {
    pub fn new(options: &MorphOptions) -> Self {
        Self {
            engine: Reconciler::new(options.key_attrs.clone(), true, false),
        }
    }
}

impl Morpher for MorphdomMorpher {
    fn name(&self) -> &'static str {
        "morphdom"
    }

    fn morph(
        &self,
        doc: &mut Document,
        target: NodeId,
        source_html: &str,
    ) -> Result<(), MorphError> {
        self.engine.run(doc, target, source_html)
    }
}

/// idiomorph-style: like morphdom, plus unkeyed subtrees attract their
/// old counterpart by descendant-id-set overlap.
pub struct IdiomorphMorpher {
    engine: Reconciler,
}

impl IdiomorphMorpher {
    pub fn new(options: &MorphOptions) -> Self {
        Self {
            engine: Reconciler::new(options.key_attrs.clone(), true, true),
        }
    }
}

impl Morpher for IdiomorphMorpher {
    fn name(&self) -> &'static str {
        "idiomorph"
    }

    fn morph(
        &self,
        doc: &mut Document,
        target: NodeId,
        source_html: &str,
    ) -> Result<(), MorphError> {
        self.engine.run(doc, target, source_html)
    }
}

/// Alpine-morph-style: only the explicit key attribute establishes
/// identity; bare id attributes do not.
pub struct AlpineMorpher {
    engine: Reconciler,
}

impl AlpineMorpher {
    pub fn new(options: &MorphOptions) -> Self {
        Self {
            engine: Reconciler::new(options.key_attrs.clone(), false, false),
        }
    }
}

impl Morpher for AlpineMorpher {
    fn name(&self) -> &'static str {
        "alpine"
    }

    fn morph(
        &self,
        doc: &mut Document,
        target: NodeId,
        source_html: &str,
    ) -> Result<(), MorphError> {
        self.engine.run(doc, target, source_html)
    }
}
