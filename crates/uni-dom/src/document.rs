//! Document - high-level document API.

use crate::{DomError, DomRect, DomTree, Node, NodeId};

/// A document: one DOM tree plus the page-level state the runtime needs
/// (focus, page visibility, URL).
#[derive(Debug, Clone)]
pub struct Document {
    tree: DomTree,
    root: NodeId,
    url: String,
    focused: NodeId,
    hidden: bool,
}

impl Document {
    /// Create a new document with an empty root.
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let root = tree.create_document();
        Self {
            tree,
            root,
            url: url.to_string(),
            focused: NodeId::NONE,
            hidden: false,
        }
    }

    /// Wrap an already-built tree (used by the parser).
    pub fn from_tree(tree: DomTree, root: NodeId, url: &str) -> Self {
        Self {
            tree,
            root,
            url: url.to_string(),
            focused: NodeId::NONE,
            hidden: false,
        }
    }

    /// Document URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow the tree.
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Mutably borrow the tree.
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Page-visibility analogue of `document.hidden`.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Flip page visibility (the embedder's `visibilitychange`).
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// The currently focused node, if any.
    pub fn focused(&self) -> Option<NodeId> {
        if self.focused.is_valid() { Some(self.focused) } else { None }
    }

    /// Focus an element.
    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        match self.tree.get(id) {
            Some(node) if node.is_element() => {
                self.focused = id;
                Ok(())
            }
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::Detached(id)),
        }
    }

    /// Clear focus.
    pub fn blur(&mut self) {
        self.focused = NodeId::NONE;
    }

    /// Attribute shorthand.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.tree.elem(id).and_then(|e| e.get_attr(name))
    }

    /// Set an attribute on an element (no-op on non-elements).
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(elem) = self.tree.elem_mut(id) {
            elem.set_attr(name, value);
        }
    }

    /// Remove an attribute from an element (no-op on non-elements).
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(elem) = self.tree.elem_mut(id) {
            elem.remove_attr(name);
        }
    }

    /// Record the embedder-supplied layout rect for an element.
    pub fn set_rect(&mut self, id: NodeId, rect: DomRect) {
        if let Some(elem) = self.tree.elem_mut(id) {
            elem.rect = Some(rect);
        }
    }

    /// Get element by its `id` attribute, searching the whole document.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_in(self.root, |node| {
            node.as_element().is_some_and(|e| e.id.as_deref() == Some(id))
        })
    }

    /// First element under `scope` (inclusive) matching the predicate.
    pub fn find_in<F>(&self, scope: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(&Node) -> bool,
    {
        self.tree
            .descendants(scope)
            .into_iter()
            .find(|&id| self.tree.get(id).is_some_and(|n| pred(n)))
    }

    /// All elements under `scope` (inclusive) matching the predicate.
    pub fn find_all_in<F>(&self, scope: NodeId, mut pred: F) -> Vec<NodeId>
    where
        F: FnMut(&Node) -> bool,
    {
        self.tree
            .descendants(scope)
            .into_iter()
            .filter(|&id| self.tree.get(id).is_some_and(|n| pred(n)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new("about:blank");
        let div = doc.tree_mut().create_element("div");
        let root = doc.root();
        doc.tree_mut().append_child(root, div);
        doc.set_attr(div, "id", "panel");
        doc
    }

    #[test]
    fn get_element_by_id_finds_nested() {
        let doc = sample();
        let found = doc.get_element_by_id("panel").unwrap();
        assert_eq!(doc.attr(found, "id"), Some("panel"));
        assert!(doc.get_element_by_id("missing").is_none());
    }

    #[test]
    fn focus_rejects_non_elements() {
        let mut doc = sample();
        let text = doc.tree_mut().create_text("hi");
        assert!(doc.focus(text).is_err());

        let div = doc.get_element_by_id("panel").unwrap();
        doc.focus(div).unwrap();
        assert_eq!(doc.focused(), Some(div));
        doc.blur();
        assert_eq!(doc.focused(), None);
    }
}
