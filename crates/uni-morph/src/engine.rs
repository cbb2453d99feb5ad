//! Keyed reconciliation engine.
//!
//! All three adapters share this walk; they differ only in the identity
//! sources enabled (explicit key attribute, id attribute, id-set
//! affinity for unkeyed subtrees).
//!
//! Node equality is *deep value equality* over tag, attributes and
//! children - never NodeId equality. Two distinct nodes with identical
//! structure are "equal" and must not be touched, so matched-and-equal
//! subtrees are skipped wholesale, which is what preserves focus, live
//! form state and third-party widget state inside them.

use std::collections::HashSet;

use uni_dom::{Document, DomTree, NodeData, NodeId};

use crate::MorphError;

/// Shared reconciliation walk, parameterized by identity resolution.
#[derive(Debug, Clone)]
pub struct Reconciler {
    key_attrs: Vec<String>,
    match_by_id: bool,
    id_set_affinity: bool,
}

impl Reconciler {
    pub fn new(key_attrs: Vec<String>, match_by_id: bool, id_set_affinity: bool) -> Self {
        Self {
            key_attrs,
            match_by_id,
            id_set_affinity,
        }
    }

    /// Reconcile `target` against the single root element of
    /// `source_html`.
    pub fn run(
        &self,
        doc: &mut Document,
        target: NodeId,
        source_html: &str,
    ) -> Result<(), MorphError> {
        if doc.tree().elem(target).is_none() {
            return Err(MorphError::InvalidTarget(target));
        }
        let src_doc = uni_html::parse_fragment(source_html);
        let src_root = src_doc
            .tree()
            .children(src_doc.root())
            .into_iter()
            .find(|&id| src_doc.tree().elem(id).is_some())
            .ok_or(MorphError::EmptySource)?;

        tracing::debug!(?target, "morphing subtree");
        self.reconcile(doc, target, &src_doc, src_root);
        Ok(())
    }

    /// Reconcile one node pair. Returns the id of the node now standing
    /// where `dst` stood (a fresh id when `dst` had to be replaced).
    fn reconcile(&self, doc: &mut Document, dst: NodeId, src_doc: &Document, src: NodeId) -> NodeId {
        if deep_equal(doc.tree(), dst, src_doc.tree(), src) {
            return dst;
        }
        if !same_shape(doc.tree(), dst, src_doc.tree(), src) {
            return self.replace(doc, dst, src_doc, src);
        }

        let src_data = src_doc.tree().get(src).map(|n| n.data.clone());
        match src_data {
            Some(NodeData::Text(text)) => {
                if let Some(node) = doc.tree_mut().get_mut(dst) {
                    node.data = NodeData::Text(text);
                }
                dst
            }
            Some(NodeData::Comment(text)) => {
                if let Some(node) = doc.tree_mut().get_mut(dst) {
                    node.data = NodeData::Comment(text);
                }
                dst
            }
            Some(NodeData::Element(_)) => {
                self.sync_attrs(doc, dst, src_doc, src);
                self.reconcile_children(doc, dst, src_doc, src);
                dst
            }
            _ => dst,
        }
    }

    /// Swap `dst` out for an imported copy of `src`.
    fn replace(&self, doc: &mut Document, dst: NodeId, src_doc: &Document, src: NodeId) -> NodeId {
        if let Some(focused) = doc.focused() {
            if doc.tree().contains(dst, focused) {
                doc.blur();
            }
        }
        let parent = doc.tree().get(dst).map(|n| n.parent).unwrap_or(NodeId::NONE);
        let imported = import(doc.tree_mut(), src_doc.tree(), src);
        if parent.is_valid() {
            doc.tree_mut().insert_before(parent, imported, dst);
        }
        doc.tree_mut().detach(dst);
        imported
    }

    fn sync_attrs(&self, doc: &mut Document, dst: NodeId, src_doc: &Document, src: NodeId) {
        let Some(src_elem) = src_doc.tree().elem(src) else { return };
        let src_attrs: Vec<(String, String)> = src_elem
            .attrs
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();

        let stale: Vec<String> = doc
            .tree()
            .elem(dst)
            .map(|e| {
                e.attrs
                    .iter()
                    .filter(|a| !src_attrs.iter().any(|(n, _)| *n == a.name))
                    .map(|a| a.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        for name in stale {
            doc.remove_attr(dst, &name);
        }
        for (name, value) in src_attrs {
            if doc.attr(dst, &name) != Some(value.as_str()) {
                doc.set_attr(dst, &name, &value);
            }
        }
    }

    fn reconcile_children(&self, doc: &mut Document, dst: NodeId, src_doc: &Document, src: NodeId) {
        let src_kids = src_doc.tree().children(src);
        let mut unmatched = doc.tree().children(dst);
        let mut ordered = Vec::with_capacity(src_kids.len());

        for src_kid in src_kids {
            let taken = self
                .take_by_identity(doc, &mut unmatched, src_doc, src_kid)
                .or_else(|| self.take_by_affinity(doc, &mut unmatched, src_doc, src_kid))
                .or_else(|| self.take_positional(doc, &mut unmatched, src_doc, src_kid));

            let node = match taken {
                Some(old) => self.reconcile(doc, old, src_doc, src_kid),
                None => import(doc.tree_mut(), src_doc.tree(), src_kid),
            };
            ordered.push(node);
        }

        for leftover in unmatched {
            if let Some(focused) = doc.focused() {
                if doc.tree().contains(leftover, focused) {
                    doc.blur();
                }
            }
            doc.tree_mut().detach(leftover);
        }

        // Re-appending in order is a detach+append per child, which
        // realizes any reordering without touching node contents.
        for node in ordered {
            doc.tree_mut().append_child(dst, node);
        }
    }

    /// Explicit identity match: key attribute first, id second.
    fn take_by_identity(
        &self,
        doc: &Document,
        unmatched: &mut Vec<NodeId>,
        src_doc: &Document,
        src: NodeId,
    ) -> Option<NodeId> {
        let want = self.identity(src_doc.tree(), src)?;
        let src_tag = src_doc.tree().elem(src).map(|e| e.tag.clone())?;
        let pos = unmatched.iter().position(|&d| {
            self.identity(doc.tree(), d).as_deref() == Some(want.as_str())
                && doc.tree().elem(d).is_some_and(|e| e.tag == src_tag)
        })?;
        Some(unmatched.remove(pos))
    }

    /// Unkeyed subtree affinity: prefer the old child whose descendant
    /// id set overlaps the new child's (idiomorph-style matching).
    fn take_by_affinity(
        &self,
        doc: &Document,
        unmatched: &mut Vec<NodeId>,
        src_doc: &Document,
        src: NodeId,
    ) -> Option<NodeId> {
        if !self.id_set_affinity {
            return None;
        }
        let src_ids = id_set(src_doc.tree(), src);
        if src_ids.is_empty() {
            return None;
        }
        let src_tag = src_doc.tree().elem(src).map(|e| e.tag.clone())?;
        let pos = unmatched.iter().position(|&d| {
            doc.tree().elem(d).is_some_and(|e| e.tag == src_tag)
                && !id_set(doc.tree(), d).is_disjoint(&src_ids)
        })?;
        Some(unmatched.remove(pos))
    }

    /// Positional fallback: first remaining old child of the same shape
    /// that carries no conflicting explicit identity.
    fn take_positional(
        &self,
        doc: &Document,
        unmatched: &mut Vec<NodeId>,
        src_doc: &Document,
        src: NodeId,
    ) -> Option<NodeId> {
        let src_identity = self.identity(src_doc.tree(), src);
        let pos = unmatched.iter().position(|&d| {
            same_shape(doc.tree(), d, src_doc.tree(), src)
                && match (self.identity(doc.tree(), d), &src_identity) {
                    (Some(a), Some(b)) => a == *b,
                    (Some(_), None) | (None, Some(_)) => false,
                    (None, None) => true,
                }
        })?;
        Some(unmatched.remove(pos))
    }

    /// Resolve a node's stable identity: explicit key attribute in
    /// configured priority order, then the id attribute, then none.
    fn identity(&self, tree: &DomTree, id: NodeId) -> Option<String> {
        let elem = tree.elem(id)?;
        for key_attr in &self.key_attrs {
            if let Some(v) = elem.get_attr(key_attr) {
                return Some(v.to_string());
            }
        }
        if self.match_by_id {
            return elem.id.clone();
        }
        None
    }
}

/// Same node kind, and same tag for elements.
fn same_shape(a_tree: &DomTree, a: NodeId, b_tree: &DomTree, b: NodeId) -> bool {
    match (a_tree.get(a).map(|n| &n.data), b_tree.get(b).map(|n| &n.data)) {
        (Some(NodeData::Element(ea)), Some(NodeData::Element(eb))) => ea.tag == eb.tag,
        (Some(NodeData::Text(_)), Some(NodeData::Text(_))) => true,
        (Some(NodeData::Comment(_)), Some(NodeData::Comment(_))) => true,
        (Some(NodeData::Document), Some(NodeData::Document)) => true,
        _ => false,
    }
}

/// Deep value equality over content (tag, attributes, text, children).
/// Ignores live form state and layout rects, which only the old tree
/// carries.
pub fn deep_equal(a_tree: &DomTree, a: NodeId, b_tree: &DomTree, b: NodeId) -> bool {
    match (a_tree.get(a).map(|n| &n.data), b_tree.get(b).map(|n| &n.data)) {
        (Some(NodeData::Element(ea)), Some(NodeData::Element(eb))) => {
            if ea.tag != eb.tag || ea.attrs.len() != eb.attrs.len() {
                return false;
            }
            for attr in &ea.attrs {
                if eb.get_attr(&attr.name) != Some(attr.value.as_str()) {
                    return false;
                }
            }
            let a_kids = a_tree.children(a);
            let b_kids = b_tree.children(b);
            a_kids.len() == b_kids.len()
                && a_kids
                    .iter()
                    .zip(b_kids.iter())
                    .all(|(&x, &y)| deep_equal(a_tree, x, b_tree, y))
        }
        (Some(NodeData::Text(ta)), Some(NodeData::Text(tb))) => ta == tb,
        (Some(NodeData::Comment(ca)), Some(NodeData::Comment(cb))) => ca == cb,
        _ => false,
    }
}

/// All id attributes under `root` (inclusive).
fn id_set(tree: &DomTree, root: NodeId) -> HashSet<String> {
    tree.descendants(root)
        .into_iter()
        .filter_map(|id| tree.elem(id).and_then(|e| e.id.clone()))
        .collect()
}

/// Deep-copy a foreign subtree into `tree`, returning the new root id.
fn import(tree: &mut DomTree, src_tree: &DomTree, src: NodeId) -> NodeId {
    let id = match src_tree.get(src).map(|n| &n.data) {
        Some(NodeData::Element(elem)) => {
            let new = tree.create_element(&elem.tag);
            let attrs: Vec<(String, String)> = elem
                .attrs
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect();
            for (name, value) in attrs {
                if let Some(e) = tree.elem_mut(new) {
                    e.set_attr(&name, &value);
                }
            }
            new
        }
        Some(NodeData::Text(text)) => tree.create_text(text),
        Some(NodeData::Comment(text)) => tree.create_comment(text),
        _ => tree.create_comment(""),
    };
    for child in src_tree.children(src) {
        let imported = import(tree, src_tree, child);
        tree.append_child(id, imported);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use uni_html::parse_fragment;

    fn reconciler() -> Reconciler {
        Reconciler::new(vec!["unicorn:key".into(), "u:key".into()], true, false)
    }

    fn fragment_root(doc: &Document) -> NodeId {
        doc.tree().children(doc.root())[0]
    }

    #[test]
    fn equal_subtree_is_untouched() {
        let mut doc = parse_fragment("<div id=\"a\"><span>x</span></div>");
        let root = fragment_root(&doc);
        let span_before = doc.tree().children(root)[0];

        reconciler()
            .run(&mut doc, root, "<div id=\"a\"><span>x</span></div>")
            .unwrap();

        // Same NodeId: the subtree was never rebuilt.
        assert_eq!(doc.tree().children(root)[0], span_before);
    }

    #[test]
    fn attribute_sync_adds_changes_and_removes() {
        let mut doc = parse_fragment("<div class=\"old\" data-x=\"1\"></div>");
        let root = fragment_root(&doc);

        reconciler()
            .run(&mut doc, root, "<div class=\"new\" title=\"t\"></div>")
            .unwrap();

        assert_eq!(doc.attr(root, "class"), Some("new"));
        assert_eq!(doc.attr(root, "title"), Some("t"));
        assert_eq!(doc.attr(root, "data-x"), None);
    }

    #[test]
    fn keyed_children_are_reordered_not_rebuilt() {
        let mut doc = parse_fragment(
            "<ul><li unicorn:key=\"a\">A</li><li unicorn:key=\"b\">B</li></ul>",
        );
        let root = fragment_root(&doc);
        let kids = doc.tree().children(root);
        let (a, b) = (kids[0], kids[1]);

        // Simulate live state the morph must not destroy.
        doc.tree_mut().elem_mut(a).unwrap().value = Some("typed".into());

        reconciler()
            .run(
                &mut doc,
                root,
                "<ul><li unicorn:key=\"b\">B</li><li unicorn:key=\"a\">A</li></ul>",
            )
            .unwrap();

        let kids = doc.tree().children(root);
        assert_eq!(kids, vec![b, a]);
        assert_eq!(doc.tree().elem(a).unwrap().value.as_deref(), Some("typed"));
    }

    #[test]
    fn id_matching_preserves_node_across_sibling_insertion() {
        let mut doc = parse_fragment("<div><p id=\"keep\">old</p></div>");
        let root = fragment_root(&doc);
        let keep = doc.tree().children(root)[0];

        reconciler()
            .run(
                &mut doc,
                root,
                "<div><span>new</span><p id=\"keep\">old</p></div>",
            )
            .unwrap();

        let kids = doc.tree().children(root);
        assert_eq!(kids.len(), 2);
        assert_eq!(kids[1], keep);
        assert_eq!(doc.tree().elem(kids[0]).unwrap().tag, "span");
    }

    #[test]
    fn tag_change_replaces_node() {
        let mut doc = parse_fragment("<div><p>x</p></div>");
        let root = fragment_root(&doc);
        let old = doc.tree().children(root)[0];

        reconciler().run(&mut doc, root, "<div><h1>x</h1></div>").unwrap();

        let kids = doc.tree().children(root);
        assert_ne!(kids[0], old);
        assert_eq!(doc.tree().elem(kids[0]).unwrap().tag, "h1");
    }

    #[test]
    fn removed_focused_subtree_clears_focus() {
        let mut doc = parse_fragment("<div><input id=\"f\"></div>");
        let root = fragment_root(&doc);
        let input = doc.tree().children(root)[0];
        doc.focus(input).unwrap();

        reconciler().run(&mut doc, root, "<div></div>").unwrap();
        assert_eq!(doc.focused(), None);
    }
}
