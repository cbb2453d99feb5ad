//! HTML serializer.
//!
//! Walks the arena back out to markup. Live form state is not
//! serialized; only content attributes appear in the output.

use uni_dom::{Document, NodeData, NodeId};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serialize a node including its own tag.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

/// Serialize a node's children only.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.tree().children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(node) = doc.tree().get(id) else { return };
    match &node.data {
        NodeData::Document => {
            for child in doc.tree().children(id) {
                write_node(doc, child, out);
            }
        }
        NodeData::Doctype { name } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Element(elem) => {
            out.push('<');
            out.push_str(&elem.tag);
            for attr in &elem.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_attr(&attr.value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&elem.tag.as_str()) {
                return;
            }
            for child in doc.tree().children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(&elem.tag);
            out.push('>');
        }
        NodeData::Text(text) => escape_text(text, out),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HtmlParser;

    #[test]
    fn round_trips_simple_fragment() {
        let doc = HtmlParser::new().parse_fragment("<div id=\"a\"><b>x</b></div>");
        let kids = doc.tree().children(doc.root());
        assert_eq!(outer_html(&doc, kids[0]), "<div id=\"a\"><b>x</b></div>");
    }

    #[test]
    fn void_elements_have_no_close_tag() {
        let doc = HtmlParser::new().parse_fragment("<input type=\"text\">");
        let kids = doc.tree().children(doc.root());
        assert_eq!(outer_html(&doc, kids[0]), "<input type=\"text\">");
    }

    #[test]
    fn escapes_text_and_attributes() {
        let mut doc = uni_dom::Document::new("about:blank");
        let root = doc.root();
        let div = doc.tree_mut().create_element("div");
        let text = doc.tree_mut().create_text("a < b & c");
        doc.tree_mut().append_child(root, div);
        doc.tree_mut().append_child(div, text);
        doc.set_attr(div, "title", "say \"hi\"");
        assert_eq!(
            outer_html(&doc, div),
            "<div title=\"say &quot;hi&quot;\">a &lt; b &amp; c</div>"
        );
    }
}
