//! DOM node representation.
//!
//! Nodes carry sibling/child links as [`NodeId`]s instead of pointers so
//! the whole tree lives in one arena and subtree replacement never
//! invalidates references held elsewhere.

use crate::{DomRect, NodeId};

/// A single DOM node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Parent node (NONE if root or detached).
    pub parent: NodeId,
    /// First child.
    pub first_child: NodeId,
    /// Last child (for O(1) append).
    pub last_child: NodeId,
    /// Previous sibling.
    pub prev_sibling: NodeId,
    /// Next sibling.
    pub next_sibling: NodeId,
    /// Node-specific data.
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        }
    }

    /// Check if this is an element.
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element.
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data.
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }
}

/// Node-specific data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// Document root.
    Document,
    /// DOCTYPE.
    Doctype { name: String },
    /// Element.
    Element(ElementData),
    /// Text content.
    Text(String),
    /// Comment.
    Comment(String),
}

/// Element-specific data.
///
/// Besides parsed attributes this carries the *live* form state
/// (`value`, `checked`, `selected`, `files`) that user interaction
/// mutates without touching attributes, mirroring how browsers separate
/// content attributes from IDL state. `None` means "never touched, fall
/// back to the content attribute".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementData {
    /// Tag name, lowercase.
    pub tag: String,
    /// Attributes, in document order.
    pub attrs: Vec<Attribute>,
    /// Cached id attribute (very common lookup).
    pub id: Option<String>,
    /// Live input/textarea/select value.
    pub value: Option<String>,
    /// Live checked state (checkbox/radio).
    pub checked: Option<bool>,
    /// Live selected state (option).
    pub selected: Option<bool>,
    /// Attached files (file input); passed through untouched.
    pub files: Vec<FileHandle>,
    /// Layout rect supplied by the embedder, consumed by visibility
    /// triggers. Headless documents have no layout of their own.
    pub rect: Option<DomRect>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    /// Get an attribute value.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether the attribute is present (any value).
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if name == "id" {
            self.id = Some(value.to_string());
        }
        for attr in self.attrs.iter_mut() {
            if attr.name == name {
                attr.value = value.to_string();
                return;
            }
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, name: &str) {
        if name == "id" {
            self.id = None;
        }
        self.attrs.retain(|a| a.name != name);
    }

    /// The value a form control currently holds: live state if the user
    /// (or runtime) touched it, the content attribute otherwise.
    pub fn effective_value(&self) -> &str {
        match &self.value {
            Some(v) => v,
            None => self.get_attr("value").unwrap_or(""),
        }
    }

    /// Current checked state, falling back to the `checked` attribute.
    pub fn effective_checked(&self) -> bool {
        match self.checked {
            Some(c) => c,
            None => self.has_attr("checked"),
        }
    }

    /// Current selected state (for `<option>`).
    pub fn effective_selected(&self) -> bool {
        match self.selected {
            Some(s) => s,
            None => self.has_attr("selected"),
        }
    }

    /// The `type` attribute, lowercased ("" when absent).
    pub fn input_type(&self) -> String {
        self.get_attr("type").unwrap_or("").to_ascii_lowercase()
    }
}

/// A single attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An opaque file handle attached to a file input.
///
/// The runtime never inspects the bytes; they are forwarded to the
/// transport as-is when the action queue is flushed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_attr_replaces_and_caches_id() {
        let mut elem = ElementData::new("DIV");
        assert_eq!(elem.tag, "div");

        elem.set_attr("id", "panel");
        assert_eq!(elem.id.as_deref(), Some("panel"));
        assert_eq!(elem.get_attr("id"), Some("panel"));

        elem.set_attr("id", "other");
        assert_eq!(elem.id.as_deref(), Some("other"));
        assert_eq!(elem.attrs.len(), 1);

        elem.remove_attr("id");
        assert!(elem.id.is_none());
        assert!(!elem.has_attr("id"));
    }

    #[test]
    fn effective_value_prefers_live_state() {
        let mut elem = ElementData::new("input");
        elem.set_attr("value", "initial");
        assert_eq!(elem.effective_value(), "initial");

        elem.value = Some("typed".into());
        assert_eq!(elem.effective_value(), "typed");
    }

    #[test]
    fn effective_checked_falls_back_to_attribute() {
        let mut elem = ElementData::new("input");
        elem.set_attr("type", "checkbox");
        elem.set_attr("checked", "");
        assert!(elem.effective_checked());

        elem.checked = Some(false);
        assert!(!elem.effective_checked());
    }
}
