//! DOM tree (arena-based allocation).

use crate::{ElementData, Node, NodeData, NodeId};

/// Arena-based DOM tree.
///
/// Nodes are never freed individually; detached subtrees simply become
/// unreachable. Documents are short-lived enough (one per page or per
/// parsed fragment) that compaction is not worth the bookkeeping.
#[derive(Debug, Default, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new empty DOM tree.
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Get a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Element data for `id`, if it is an element.
    pub fn elem(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data for `id`, if it is an element.
    pub fn elem_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Number of allocated nodes (including detached ones).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    /// Allocate a document node.
    pub fn create_document(&mut self) -> NodeId {
        self.push(NodeData::Document)
    }

    /// Allocate an element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    /// Allocate a text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Text(content.to_string()))
    }

    /// Allocate a comment node.
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Comment(content.to_string()))
    }

    /// Append `child` as the last child of `parent`. Detaches `child`
    /// from any previous position first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let prev_last = self.get(parent).map(|p| p.last_child).unwrap_or(NodeId::NONE);
        if let Some(c) = self.get_mut(child) {
            c.parent = parent;
            c.prev_sibling = prev_last;
        }
        if prev_last.is_valid() {
            if let Some(last) = self.get_mut(prev_last) {
                last.next_sibling = child;
            }
        }
        if let Some(p) = self.get_mut(parent) {
            if !p.first_child.is_valid() {
                p.first_child = child;
            }
            p.last_child = child;
        }
    }

    /// Insert `node` immediately before `reference` (which must be a
    /// child of `parent`).
    pub fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId) {
        if !reference.is_valid() {
            self.append_child(parent, node);
            return;
        }
        self.detach(node);
        let prev = self.get(reference).map(|r| r.prev_sibling).unwrap_or(NodeId::NONE);
        if let Some(n) = self.get_mut(node) {
            n.parent = parent;
            n.prev_sibling = prev;
            n.next_sibling = reference;
        }
        if let Some(r) = self.get_mut(reference) {
            r.prev_sibling = node;
        }
        if prev.is_valid() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = node;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = node;
        }
    }

    /// Unlink `id` from its parent and siblings. The node (and its
    /// subtree) stays allocated but becomes unreachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else { return };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        if !parent.is_valid() && !prev.is_valid() && !next.is_valid() {
            return;
        }
        if prev.is_valid() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = next;
            }
        }
        if next.is_valid() {
            if let Some(n) = self.get_mut(next) {
                n.prev_sibling = prev;
            }
        }
        if parent.is_valid() {
            if let Some(par) = self.get_mut(parent) {
                if par.first_child == id {
                    par.first_child = next;
                }
                if par.last_child == id {
                    par.last_child = prev;
                }
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Child node ids of `parent`, in order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.get(parent).map(|p| p.first_child).unwrap_or(NodeId::NONE);
        while cur.is_valid() {
            out.push(cur);
            cur = self.get(cur).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        }
        out
    }

    /// Pre-order traversal of the subtree rooted at `root` (inclusive).
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !id.is_valid() || self.get(id).is_none() {
                continue;
            }
            out.push(id);
            // Push children in reverse so traversal stays document-order.
            let kids = self.children(id);
            for child in kids.into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Walk up from `id` (inclusive) returning the first node matching
    /// the predicate, like `Element.closest`.
    pub fn closest<F>(&self, id: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(&Node) -> bool,
    {
        let mut cur = id;
        while cur.is_valid() {
            let node = self.get(cur)?;
            if pred(node) {
                return Some(cur);
            }
            cur = node.parent;
        }
        None
    }

    /// Whether `ancestor` contains `id` (inclusive).
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut cur = id;
        while cur.is_valid() {
            if cur == ancestor {
                return true;
            }
            cur = self.get(cur).map(|n| n.parent).unwrap_or(NodeId::NONE);
        }
        false
    }

    /// Concatenated text of all text nodes under `root`.
    pub fn text_content(&self, root: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(root) {
            if let Some(text) = self.get(id).and_then(Node::as_text) {
                out.push_str(text);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_children_order() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        let a = tree.create_element("span");
        let b = tree.create_text("hello");
        tree.append_child(root, a);
        tree.append_child(root, b);

        assert_eq!(tree.children(root), vec![a, b]);
        assert_eq!(tree.get(a).unwrap().parent, root);
        assert_eq!(tree.get(a).unwrap().next_sibling, b);
        assert_eq!(tree.get(b).unwrap().prev_sibling, a);
    }

    #[test]
    fn insert_before_links_siblings() {
        let mut tree = DomTree::new();
        let root = tree.create_element("ul");
        let a = tree.create_element("li");
        let c = tree.create_element("li");
        tree.append_child(root, a);
        tree.append_child(root, c);

        let b = tree.create_element("li");
        tree.insert_before(root, b, c);
        assert_eq!(tree.children(root), vec![a, b, c]);
    }

    #[test]
    fn detach_unlinks_subtree() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        let a = tree.create_element("p");
        let b = tree.create_element("p");
        tree.append_child(root, a);
        tree.append_child(root, b);

        tree.detach(a);
        assert_eq!(tree.children(root), vec![b]);
        assert!(!tree.get(a).unwrap().parent.is_valid());
        assert_eq!(tree.get(root).unwrap().first_child, b);
    }

    #[test]
    fn text_content_concatenates() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div");
        let a = tree.create_element("b");
        let t1 = tree.create_text("Hello ");
        let t2 = tree.create_text("world");
        tree.append_child(root, a);
        tree.append_child(a, t1);
        tree.append_child(root, t2);
        assert_eq!(tree.text_content(root), "Hello world");
    }
}
