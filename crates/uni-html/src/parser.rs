//! HTML5 parser implementation.
//!
//! Uses html5ever's built-in RcDom and converts to the arena DOM. This
//! is simpler and more reliable than implementing TreeSink directly.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use uni_dom::{Document, DomTree, NodeId};

/// HTML5 parser.
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a full HTML string into a [`Document`].
    pub fn parse_document(&self, html: &str, url: &str) -> Document {
        tracing::debug!(url, "parsing HTML document");
        let (tree, root) = self.parse_to_tree(html);
        let doc = Document::from_tree(tree, root, url);
        tracing::debug!(nodes = doc.tree().len(), "parsed document");
        doc
    }

    /// Parse an HTML fragment.
    ///
    /// html5ever wraps fragments in html/head/body; the returned
    /// document is rooted at the synthesized `<body>`, so its root's
    /// children are exactly the fragment's top-level nodes.
    pub fn parse_fragment(&self, html: &str) -> Document {
        let (tree, root) = self.parse_to_tree(html);
        let body = Self::find_tag(&tree, root, "body").unwrap_or(root);
        Document::from_tree(tree, body, "about:blank")
    }

    fn parse_to_tree(&self, html: &str) -> (DomTree, NodeId) {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .expect("reading from an in-memory buffer cannot fail");

        let mut tree = DomTree::new();
        let root = tree.create_document();
        convert_children(&dom.document, &mut tree, root);
        (tree, root)
    }

    fn find_tag(tree: &DomTree, root: NodeId, tag: &str) -> Option<NodeId> {
        tree.descendants(root)
            .into_iter()
            .find(|&id| tree.elem(id).is_some_and(|e| e.tag == tag))
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_children(handle: &Handle, tree: &mut DomTree, parent: NodeId) {
    for child in handle.children.borrow().iter() {
        convert_node(child, tree, parent);
    }
}

/// Convert one RcDom node (and its subtree) into the arena.
fn convert_node(handle: &Handle, tree: &mut DomTree, parent: NodeId) {
    match &handle.data {
        RcNodeData::Document => {
            convert_children(handle, tree, parent);
        }
        RcNodeData::Doctype { .. } => {
            // Doctype carries nothing the runtime consumes.
        }
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            // Inter-element whitespace is noise for reconciliation.
            if !text.trim().is_empty() {
                let id = tree.create_text(&text);
                tree.append_child(parent, id);
            }
        }
        RcNodeData::Comment { contents } => {
            let id = tree.create_comment(&contents.to_string());
            tree.append_child(parent, id);
        }
        RcNodeData::Element { name, attrs, .. } => {
            let id = tree.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                let local = attr.name.local.as_ref();
                // HTML attribute parsing keeps prefixed names (e.g.
                // "unicorn:model") whole in the local name.
                let name = match attr.name.prefix.as_deref() {
                    Some(prefix) => format!("{prefix}:{local}"),
                    None => local.to_string(),
                };
                if let Some(elem) = tree.elem_mut(id) {
                    elem.set_attr(&name, &attr.value);
                }
            }
            tree.append_child(parent, id);
            convert_children(handle, tree, id);
        }
        RcNodeData::ProcessingInstruction { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_document() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let doc = HtmlParser::new().parse_document(html, "about:blank");
        assert!(doc.tree().len() > 1);

        let body = doc.find_in(doc.root(), |n| {
            n.as_element().is_some_and(|e| e.tag == "body")
        });
        assert!(body.is_some());
    }

    #[test]
    fn parse_fragment_roots_at_body() {
        let doc = HtmlParser::new().parse_fragment("<div id='a'>x</div><span>y</span>");
        let kids = doc.tree().children(doc.root());
        assert_eq!(kids.len(), 2);
        assert_eq!(doc.tree().elem(kids[0]).unwrap().tag, "div");
        assert_eq!(doc.tree().elem(kids[1]).unwrap().tag, "span");
    }

    #[test]
    fn namespaced_attributes_survive() {
        let doc = HtmlParser::new().parse_fragment("<input unicorn:model=\"name\">");
        let kids = doc.tree().children(doc.root());
        let input = doc.tree().elem(kids[0]).unwrap();
        assert_eq!(input.get_attr("unicorn:model"), Some("name"));
    }
}
