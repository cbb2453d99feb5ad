//! Synthetic UI events.
//!
//! The runtime has no browser event loop; embedders (and tests) hand it
//! [`UiEvent`] records and the wiring layer does its own target
//! resolution and bubbling. Prevent/stop flags are recorded on the event
//! so the embedder can honor them after dispatch.

use crate::NodeId;

/// A user-interface event delivered to the runtime.
#[derive(Debug, Clone)]
pub struct UiEvent {
    /// Event type ("click", "input", "blur", "keydown", ...).
    pub event_type: String,
    /// The node the event originated on.
    pub target: NodeId,
    /// Key name for keyboard events (already layout-resolved, e.g.
    /// "Enter", "ArrowUp").
    pub key: Option<String>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl UiEvent {
    /// Create an event of `event_type` targeting `target`.
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            key: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Attach a key name (keyboard events).
    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// Mark the default action as prevented.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Stop propagation to outer handlers.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}
