//! Component state.
//!
//! One `Component` per root-identity-bearing DOM subtree. The root node
//! and every derived element list are rebuilt after each reconciliation;
//! nothing here survives a morph except ids, the data mirror and the
//! queue/epoch bookkeeping.

use std::collections::HashSet;

use serde_json::{Map, Value};
use uni_dom::{Document, NodeId};

use crate::attribute::NAMESPACES;
use crate::element::{ElementModel, PollFacet};
use crate::errors::Error;
use crate::message::ReturnFrame;
use crate::queue::{Action, ActionQueue};
use crate::scheduler::TimerId;

/// The batch currently on the wire.
#[derive(Debug, Clone)]
pub struct InFlight {
    pub actions: Vec<Action>,
    /// Queue generation at snapshot time; used to refuse re-submitting
    /// the identical batch.
    pub generation: u64,
    pub epoch: u64,
}

/// Runtime state for one server-driven component.
#[derive(Debug)]
pub struct Component {
    /// Server-assigned stable id.
    pub id: String,
    /// Component name (also the message endpoint path segment).
    pub name: String,
    /// Optional alias used by the public lookup API.
    pub key: Option<String>,
    /// Root node; refreshed after every morph.
    pub root: NodeId,
    /// Server-owned state mirror. Mutated only by response merges and
    /// explicit set-value calls.
    pub data: Map<String, Value>,
    /// Opaque integrity token over `data`.
    pub checksum: String,
    /// Opaque request-ordering token.
    pub hash: String,
    pub queue: ActionQueue,
    pub in_flight: Option<InFlight>,
    pub next_epoch: u64,
    pub last_applied_epoch: u64,
    /// Validation errors by model name, as last reported by the server.
    pub errors: Map<String, Value>,
    pub last_return: Option<ReturnFrame>,
    /// Elements that caused the pending flush.
    pub triggering: Vec<NodeId>,
    pub flush_timer: Option<TimerId>,
    pub poll: Option<PollFacet>,
    pub poll_timer: Option<TimerId>,
    /// Poll fired while the document was hidden; fire or reschedule on
    /// resume.
    pub poll_paused: bool,
    // Derived element lists, rebuilt on refresh.
    pub model_els: Vec<ElementModel>,
    pub action_els: Vec<ElementModel>,
    pub loading_els: Vec<ElementModel>,
    pub key_els: Vec<ElementModel>,
    pub visibility_els: Vec<ElementModel>,
    /// Event types with a (conceptual) document-level listener
    /// attached: one per distinct type, not one per element.
    pub attached_events: HashSet<String>,
    /// Visibility elements currently armed to fire.
    pub visibility_armed: HashSet<NodeId>,
    /// Most recent return value asked us not to re-arm visibility.
    pub visibility_suppressed: bool,
    /// Loading indicators currently applied optimistically.
    pub loading_applied: Vec<NodeId>,
}

impl Component {
    /// Construct from a root node bearing the identity attributes.
    pub fn from_root(doc: &Document, root: NodeId) -> Result<Self, Error> {
        let id = ns_attr(doc, root, "id")
            .ok_or_else(|| Error::Configuration("component root has no id attribute".into()))?;
        let name = ns_attr(doc, root, "name").unwrap_or_else(|| id.clone());
        let checksum = ns_attr(doc, root, "checksum").unwrap_or_default();
        let key = ns_attr(doc, root, "key");

        let mut component = Self {
            id,
            name,
            key,
            root,
            data: Map::new(),
            checksum,
            hash: String::new(),
            queue: ActionQueue::new(),
            in_flight: None,
            next_epoch: 1,
            last_applied_epoch: 0,
            errors: Map::new(),
            last_return: None,
            triggering: Vec::new(),
            flush_timer: None,
            poll: None,
            poll_timer: None,
            poll_paused: false,
            model_els: Vec::new(),
            action_els: Vec::new(),
            loading_els: Vec::new(),
            key_els: Vec::new(),
            visibility_els: Vec::new(),
            attached_events: HashSet::new(),
            visibility_armed: HashSet::new(),
            visibility_suppressed: false,
            loading_applied: Vec::new(),
        };
        component.refresh(doc);
        Ok(component)
    }

    /// Re-resolve the root by id and rebuild every derived list.
    ///
    /// Called after each reconciliation: the old root NodeId may have
    /// been replaced wholesale, and any subset of elements may be new.
    /// Per-node failures are skipped, never propagated - one malformed
    /// element must not abort the walk.
    pub fn refresh(&mut self, doc: &Document) {
        if let Some(root) = find_component_root(doc, &self.id) {
            self.root = root;
        }
        if let Some(checksum) = ns_attr(doc, self.root, "checksum") {
            self.checksum = checksum;
        }

        self.model_els.clear();
        self.action_els.clear();
        self.loading_els.clear();
        self.key_els.clear();
        self.visibility_els.clear();
        self.attached_events.clear();
        self.poll = None;
        self.visibility_armed.clear();

        // Nested component roots and everything under them belong to
        // the child, never to this component's derived lists.
        let mut nested_roots: Vec<NodeId> = Vec::new();
        for node in doc.tree().descendants(self.root) {
            if doc.tree().elem(node).is_none() {
                continue;
            }
            if node != self.root && ns_attr(doc, node, "id").is_some() {
                nested_roots.push(node);
                continue;
            }
            if nested_roots.iter().any(|&r| doc.tree().contains(r, node)) {
                continue;
            }
            let el = ElementModel::build(doc, node);
            if !el.is_unicorn {
                continue;
            }
            if node == self.root {
                self.poll = el.poll.clone();
            }
            if el.model.is_some() {
                self.model_els.push(el.clone());
            }
            if !el.actions.is_empty() {
                for action in &el.actions {
                    self.attached_events.insert(action.event_type.clone());
                }
                self.action_els.push(el.clone());
            }
            if el.loading.is_some() {
                self.loading_els.push(el.clone());
            }
            if el.key.is_some() {
                self.key_els.push(el.clone());
            }
            if el.visibility.is_some() {
                self.visibility_armed.insert(node);
                self.visibility_els.push(el);
            }
        }
        tracing::debug!(
            component = %self.id,
            models = self.model_els.len(),
            actions = self.action_els.len(),
            "refreshed element lists"
        );
    }

    /// Last server-confirmed value for a binding.
    pub fn confirmed_value(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Allocate the epoch for the next flush.
    pub fn take_epoch(&mut self) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }
}

/// Read a namespaced attribute, trying both prefix spellings.
pub fn ns_attr(doc: &Document, node: NodeId, suffix: &str) -> Option<String> {
    let elem = doc.tree().elem(node)?;
    NAMESPACES
        .iter()
        .find_map(|ns| elem.get_attr(&format!("{ns}{suffix}")))
        .map(str::to_string)
}

/// Find the root element carrying the given component id.
pub fn find_component_root(doc: &Document, component_id: &str) -> Option<NodeId> {
    doc.tree()
        .descendants(doc.root())
        .into_iter()
        .find(|&node| ns_attr(doc, node, "id").as_deref() == Some(component_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uni_html::parse_fragment;

    #[test]
    fn builds_from_root_and_collects_elements() {
        let doc = parse_fragment(
            "<div unicorn:id=\"c1\" unicorn:name=\"counter\" unicorn:checksum=\"C\">\
             <input unicorn:model=\"name\">\
             <button unicorn:click=\"save()\" unicorn:loading.attr=\"disabled\"></button>\
             </div>",
        );
        let root = doc.tree().children(doc.root())[0];
        let comp = Component::from_root(&doc, root).unwrap();

        assert_eq!(comp.id, "c1");
        assert_eq!(comp.name, "counter");
        assert_eq!(comp.checksum, "C");
        assert_eq!(comp.model_els.len(), 1);
        assert_eq!(comp.action_els.len(), 1);
        assert_eq!(comp.loading_els.len(), 1);
        assert!(comp.attached_events.contains("click"));
    }

    #[test]
    fn nested_component_subtrees_are_excluded() {
        let doc = parse_fragment(
            "<div unicorn:id=\"outer\">\
             <input unicorn:model=\"a\">\
             <div unicorn:id=\"inner\">\
             <p><input unicorn:model=\"b\"></p>\
             <button unicorn:click=\"go()\"></button>\
             </div>\
             </div>",
        );
        let root = doc.tree().children(doc.root())[0];
        let comp = Component::from_root(&doc, root).unwrap();

        // The inner component owns everything under its root, however
        // deeply wrapped.
        assert_eq!(comp.model_els.len(), 1);
        assert!(comp.action_els.is_empty());
        assert!(!comp.attached_events.contains("click"));
    }

    #[test]
    fn poll_facet_comes_from_the_root() {
        let doc = parse_fragment("<div unicorn:id=\"c\" unicorn:poll-1000=\"tick\"></div>");
        let root = doc.tree().children(doc.root())[0];
        let comp = Component::from_root(&doc, root).unwrap();
        let poll = comp.poll.unwrap();
        assert_eq!(poll.method, "tick");
        assert_eq!(poll.timing_ms, 1000);
    }

    #[test]
    fn missing_id_is_a_configuration_error() {
        let doc = parse_fragment("<div unicorn:name=\"x\"></div>");
        let root = doc.tree().children(doc.root())[0];
        assert!(matches!(
            Component::from_root(&doc, root),
            Err(Error::Configuration(_))
        ));
    }
}
