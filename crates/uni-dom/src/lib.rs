//! uni-dom - Headless Document Object Model
//!
//! Arena-based DOM tree used by the component runtime. The tree is owned
//! by a [`Document`]; nodes are addressed by [`NodeId`] handles so that
//! views over elements never dangle when subtrees are replaced.

mod document;
mod events;
mod geometry;
mod node;
mod tree;

pub use document::Document;
pub use events::UiEvent;
pub use geometry::DomRect;
pub use node::{Attribute, ElementData, FileHandle, Node, NodeData};
pub use tree::DomTree;

/// Node identifier (index into the arena).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel for "no node".
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Whether this id refers to a real node.
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::NONE
    }
}

/// DOM-level errors.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not in the document")]
    Detached(NodeId),
}
