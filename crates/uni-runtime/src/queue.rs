//! Action queue.
//!
//! Per-component ordered list of pending server-bound mutations.
//! `callMethod` records are never merged; deferred model syncs coalesce
//! last-write-wins per binding name, and a clean (non-dirty) deferred
//! binding removes its record so a defer never sends a no-op.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Wire name of each action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "syncInput")]
    SyncInput,
    #[serde(rename = "dbInput")]
    DbInput,
    #[serde(rename = "callMethod")]
    CallMethod,
}

/// A partial-update target attached to an action. At most one of the
/// three fields is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// One queued mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partials: Vec<PartialTarget>,
}

impl Action {
    /// A method-call action (`payload.name` holds the call expression).
    pub fn call_method(expression: &str, partials: Vec<PartialTarget>) -> Self {
        Self {
            kind: ActionKind::CallMethod,
            payload: json!({ "name": expression }),
            partials,
        }
    }

    /// A model sync action.
    pub fn sync_input(name: &str, value: Value) -> Self {
        Self {
            kind: ActionKind::SyncInput,
            payload: json!({ "name": name, "value": value }),
            partials: Vec::new(),
        }
    }

    fn binding_name(&self) -> Option<&str> {
        self.payload.get("name").and_then(Value::as_str)
    }

    /// Whether this action carries a method call (server-side calls may
    /// mutate state unrelated to the triggering element).
    pub fn is_call(&self) -> bool {
        self.kind == ActionKind::CallMethod
    }
}

/// Ordered queue of pending actions for one component.
///
/// `generation` increments on every mutation; the flush guard compares
/// generations to detect "same batch already in flight" without
/// comparing payloads.
#[derive(Debug, Default, Clone)]
pub struct ActionQueue {
    items: Vec<Action>,
    generation: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn items(&self) -> &[Action] {
        &self.items
    }

    /// Append an action unconditionally. `callMethod` always goes
    /// through here - method calls are never merged.
    pub fn push(&mut self, action: Action) {
        self.generation += 1;
        self.items.push(action);
    }

    /// Remove every pending action (the `.discard` modifier).
    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            self.generation += 1;
        }
        self.items.clear();
    }

    /// Take the current batch, leaving the queue empty but keeping the
    /// generation, which now names the in-flight snapshot.
    pub fn take(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.items)
    }

    /// Enqueue a model sync with defer semantics: coalesce into an
    /// existing record for the same binding (last write wins), add only
    /// when dirty, and drop the record when the binding went clean.
    pub fn defer_sync_input(&mut self, name: &str, value: Value, dirty: bool) {
        let existing = self.items.iter().position(|a| {
            a.kind == ActionKind::SyncInput && a.binding_name() == Some(name)
        });
        match (existing, dirty) {
            (Some(i), true) => {
                self.generation += 1;
                self.items[i].payload["value"] = value;
            }
            (Some(i), false) => {
                self.generation += 1;
                self.items.remove(i);
            }
            (None, true) => self.push(Action::sync_input(name, value)),
            (None, false) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defer_coalesces_last_write_wins() {
        let mut q = ActionQueue::new();
        q.defer_sync_input("name", json!("A"), true);
        q.defer_sync_input("name", json!("Ada"), true);

        assert_eq!(q.len(), 1);
        assert_eq!(q.items()[0].payload["value"], json!("Ada"));
    }

    #[test]
    fn defer_removes_record_when_clean() {
        let mut q = ActionQueue::new();
        q.defer_sync_input("name", json!("A"), true);
        q.defer_sync_input("name", json!(""), false);
        assert!(q.is_empty());
    }

    #[test]
    fn clean_defer_never_enqueues() {
        let mut q = ActionQueue::new();
        q.defer_sync_input("name", json!(""), false);
        assert!(q.is_empty());
    }

    #[test]
    fn call_methods_are_never_merged() {
        let mut q = ActionQueue::new();
        q.push(Action::call_method("save()", Vec::new()));
        q.push(Action::call_method("save()", Vec::new()));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn generation_tracks_every_mutation() {
        let mut q = ActionQueue::new();
        let g0 = q.generation();
        q.push(Action::sync_input("a", json!(1)));
        assert!(q.generation() > g0);

        let g1 = q.generation();
        q.clear();
        assert!(q.generation() > g1);
    }

    #[test]
    fn wire_round_trip_preserves_order_and_shape() {
        let mut q = ActionQueue::new();
        q.push(Action::sync_input("name", json!("Ada")));
        q.push(Action::call_method(
            "save(1)",
            vec![PartialTarget { id: Some("panel".into()), ..Default::default() }],
        ));
        q.push(Action::sync_input("email", json!("a@b.c")));

        let wire = serde_json::to_string(q.items()).unwrap();
        assert!(wire.contains("\"type\":\"syncInput\""));
        assert!(wire.contains("\"type\":\"callMethod\""));

        let back: Vec<Action> = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, q.items());
    }
}
