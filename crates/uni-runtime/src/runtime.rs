//! Component runtime.
//!
//! Owns the document, the registry, the scheduler and the adapter
//! boundaries (transport, morpher). Everything is single-threaded and
//! cooperative: embedders feed it [`UiEvent`]s and drive time with
//! [`Runtime::advance`]; outward-facing actions (navigation, host
//! function calls) come back out as drainable [`Effect`]s.

use serde_json::{Value, json};
use uni_dom::{Document, DomRect, NodeId, UiEvent};
use uni_morph::{MorphError, Morpher, create_morpher};

use crate::component::{Component, find_component_root, ns_attr};
use crate::config::RuntimeConfig;
use crate::element::{ActionFacet, ElementModel, PartialFacet};
use crate::errors::Error;
use crate::expr;
use crate::queue::{Action, PartialTarget};
use crate::registry::Registry;
use crate::scheduler::{Scheduler, TimerTask};
use crate::transport::{HttpTransport, Transport};

/// Outward-facing side effects the headless runtime cannot perform
/// itself. Embedders drain and execute them.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Full navigation (`location.href`).
    Navigate { url: String },
    /// History push without navigating, optionally retitling.
    PushState { url: String, title: Option<String> },
    /// Fragment-only update (`location.hash`).
    SetHash { hash: String },
    /// Host-environment function call requested by the server
    /// (dotted-path module resolution is the embedder's job).
    HostCall { function: String, args: Vec<Value> },
}

/// Lifecycle callbacks. Network and protocol errors always arrive here,
/// never as unhandled failures from timer-driven flushes.
pub trait RuntimeHooks {
    fn updated(&mut self, _component_id: &str) {}
    fn error(&mut self, _component_id: &str, _error: &Error) {}
}

/// The component runtime.
pub struct Runtime {
    pub(crate) doc: Document,
    pub(crate) registry: Registry,
    pub(crate) scheduler: Scheduler,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) morpher: Box<dyn Morpher>,
    pub(crate) config: RuntimeConfig,
    pub(crate) effects: Vec<Effect>,
    pub(crate) hooks: Option<Box<dyn RuntimeHooks>>,
    viewport: DomRect,
}

impl Runtime {
    /// Initialize with the default HTTP transport.
    pub fn new(doc: Document, config: RuntimeConfig) -> Result<Self, Error> {
        Self::with_transport(doc, config, Box::new(HttpTransport::new()))
    }

    /// Initialize with a custom transport (tests, alternative stacks).
    pub fn with_transport(
        doc: Document,
        config: RuntimeConfig,
        transport: Box<dyn Transport>,
    ) -> Result<Self, Error> {
        if let Some(csrf) = &config.csrf {
            if csrf.token.is_empty() {
                return Err(Error::Configuration(format!(
                    "CSRF header {} configured without a token",
                    csrf.header_name
                )));
            }
        }
        let morpher = create_morpher(&config.morpher).map_err(|e| match e {
            MorphError::UnknownAdapter(name) => {
                Error::Configuration(format!("unknown morpher \"{name}\""))
            }
            other => Error::Morph(other),
        })?;

        let mut runtime = Self {
            doc,
            registry: Registry::new(),
            scheduler: Scheduler::new(),
            transport,
            morpher,
            config,
            effects: Vec::new(),
            hooks: None,
            viewport: DomRect::from_xywh(0.0, 0.0, 1024.0, 768.0),
        };
        runtime.discover();
        Ok(runtime)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn RuntimeHooks>) {
        self.hooks = Some(hooks);
    }

    pub fn set_viewport(&mut self, viewport: DomRect) {
        self.viewport = viewport;
    }

    /// Accumulated outward effects, in occurrence order.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Component by id.
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.registry.get(id)
    }

    /// Public lookup: key first, then name.
    pub fn get_component(&self, name_or_key: &str) -> Result<&Component, Error> {
        self.registry
            .resolve(name_or_key)
            .and_then(|id| self.registry.get(id))
            .ok_or_else(|| Error::ComponentNotFound(name_or_key.to_string()))
    }

    /// Bootstrap or overwrite a component's data mirror (the server
    /// normally seeds this into the initial page).
    pub fn set_component_data(&mut self, id: &str, data: Value) -> Result<(), Error> {
        let comp = self
            .registry
            .get_mut(id)
            .ok_or_else(|| Error::ComponentNotFound(id.to_string()))?;
        if let Value::Object(map) = data {
            comp.data = map;
        }
        Ok(())
    }

    /// Scan the document for unregistered component roots and register
    /// them; drop components whose root left the document. Safe to call
    /// at any time; the runtime calls it itself after every morph.
    pub fn discover(&mut self) {
        let mut present: Vec<String> = Vec::new();
        let roots: Vec<NodeId> = self
            .doc
            .tree()
            .descendants(self.doc.root())
            .into_iter()
            .filter(|&n| ns_attr(&self.doc, n, "id").is_some())
            .collect();

        for root in roots {
            let Some(id) = ns_attr(&self.doc, root, "id") else { continue };
            present.push(id.clone());
            if self.registry.contains(&id) {
                continue;
            }
            match Component::from_root(&self.doc, root) {
                Ok(component) => {
                    self.registry.register(component);
                    self.schedule_poll(&id);
                }
                Err(e) => {
                    // One malformed root must not abort discovery.
                    tracing::warn!(component = %id, error = %e, "skipping component root");
                }
            }
        }

        for id in self.registry.ids() {
            if !present.contains(&id) {
                if let Some(removed) = self.registry.unregister(&id) {
                    if let Some(t) = removed.flush_timer {
                        self.scheduler.cancel(t);
                    }
                    if let Some(t) = removed.poll_timer {
                        self.scheduler.cancel(t);
                    }
                }
            }
        }
    }

    /// Deliver one UI event. Model listeners run first (element-scoped),
    /// then action dispatch (component-scoped, one conceptual listener
    /// per event type).
    pub fn handle_event(&mut self, event: &mut UiEvent) {
        self.handle_model_event(event);
        self.handle_action_event(event);
    }

    /// Public call API: route a method call through the same path as a
    /// DOM-sourced action.
    pub fn call(&mut self, name_or_key: &str, method: &str, args: &[Value]) -> Result<(), Error> {
        let id = self
            .registry
            .resolve(name_or_key)
            .ok_or_else(|| Error::ComponentNotFound(name_or_key.to_string()))?
            .to_string();

        let rendered: Vec<String> = args
            .iter()
            .map(|a| serde_json::to_string(a).unwrap_or_default())
            .collect();
        let expression = format!("{method}({})", rendered.join(", "));

        if let Some(comp) = self.registry.get_mut(&id) {
            comp.queue.push(Action::call_method(&expression, Vec::new()));
        }
        self.flush_now(&id)
    }

    /// Fire the action bound to the element with the given key or id,
    /// as if its DOM event had occurred.
    pub fn trigger(&mut self, name_or_key: &str, element_key: &str) -> Result<(), Error> {
        let id = self
            .registry
            .resolve(name_or_key)
            .ok_or_else(|| Error::ComponentNotFound(name_or_key.to_string()))?
            .to_string();

        let target = self.registry.get(&id).and_then(|comp| {
            comp.action_els.iter().find_map(|el| {
                let key_match = el.key.as_deref() == Some(element_key)
                    || self.doc.attr(el.node, "id") == Some(element_key);
                if key_match && !el.actions.is_empty() {
                    Some((el.node, el.actions[0].event_type.clone()))
                } else {
                    None
                }
            })
        });

        let Some((node, event_type)) = target else {
            return Err(Error::ElementNotFound(element_key.to_string()));
        };
        let mut event = UiEvent::new(&event_type, node);
        self.handle_event(&mut event);
        Ok(())
    }

    /// Advance virtual time, firing due debounce, poll and visibility
    /// timers in deadline order.
    pub fn advance(&mut self, ms: u64) {
        for task in self.scheduler.advance(ms) {
            match task {
                TimerTask::Flush { component_id } => {
                    if let Some(comp) = self.registry.get_mut(&component_id) {
                        comp.flush_timer = None;
                    }
                    self.flush_reporting(&component_id);
                }
                TimerTask::Poll { component_id } => {
                    if let Some(comp) = self.registry.get_mut(&component_id) {
                        comp.poll_timer = None;
                    }
                    self.poll_tick(&component_id);
                }
                TimerTask::Visibility { component_id, node } => {
                    self.fire_visibility(&component_id, node);
                }
            }
        }
    }

    /// Page-visibility change. Hiding pauses polling; showing resumes
    /// it, optionally firing immediately.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.doc.set_hidden(hidden);
        if hidden {
            return;
        }
        for id in self.registry.ids() {
            let paused = self
                .registry
                .get_mut(&id)
                .map(|c| std::mem::take(&mut c.poll_paused))
                .unwrap_or(false);
            if !paused {
                continue;
            }
            if self.config.poll_fire_on_resume {
                self.poll_tick(&id);
            } else {
                self.schedule_poll(&id);
            }
        }
    }

    /// Evaluate visibility triggers against the current viewport
    /// (IntersectionObserver analogue; embedders call this after layout
    /// or scroll changes).
    pub fn check_visibility(&mut self) {
        for id in self.registry.ids() {
            let Some(comp) = self.registry.get(&id) else { continue };
            let suppressed = comp.visibility_suppressed;
            let els: Vec<(NodeId, f64, u64)> = comp
                .visibility_els
                .iter()
                .filter_map(|el| {
                    let vis = el.visibility.as_ref()?;
                    Some((el.node, vis.threshold, vis.debounce_ms))
                })
                .collect();

            for (node, threshold, debounce_ms) in els {
                let Some(rect) = self.doc.tree().elem(node).and_then(|e| e.rect) else {
                    continue;
                };
                let ratio = rect.intersection_ratio(&self.viewport);
                let Some(comp) = self.registry.get_mut(&id) else { continue };
                // Threshold 0 still requires an actual intersection.
                if ratio > 0.0 && ratio >= threshold {
                    if comp.visibility_armed.remove(&node) {
                        self.scheduler.schedule(
                            debounce_ms,
                            TimerTask::Visibility { component_id: id.clone(), node },
                        );
                    }
                } else if !suppressed {
                    // Element left the viewport: arm for the next entry.
                    comp.visibility_armed.insert(node);
                }
            }
        }
    }

    fn fire_visibility(&mut self, component_id: &str, node: NodeId) {
        let method = self.registry.get(component_id).and_then(|comp| {
            comp.visibility_els
                .iter()
                .find(|el| el.node == node)
                .and_then(|el| el.visibility.as_ref())
                .map(|v| v.method.clone())
        });
        let Some(method) = method else { return };
        if let Some(comp) = self.registry.get_mut(component_id) {
            comp.triggering.push(node);
            comp.queue
                .push(Action::call_method(&ensure_call_expr(&method), Vec::new()));
        }
        self.flush_reporting(component_id);
    }

    fn poll_tick(&mut self, component_id: &str) {
        if self.doc.hidden() {
            if let Some(comp) = self.registry.get_mut(component_id) {
                comp.poll_paused = true;
            }
            return;
        }
        let decision = self.registry.get(component_id).and_then(|comp| {
            let poll = comp.poll.as_ref()?;
            if poll.disable {
                return None;
            }
            let enabled = match &poll.disable_data_key {
                Some(key) => {
                    let (negate, field) = match key.strip_prefix('!') {
                        Some(rest) => (true, rest),
                        None => (false, key.as_str()),
                    };
                    let raw = comp.data.get(field).and_then(Value::as_bool).unwrap_or(false);
                    // The field names a *disable* flag; `!` flips it.
                    if negate { raw } else { !raw }
                }
                None => true,
            };
            Some((poll.method.clone(), enabled))
        });

        if let Some((method, enabled)) = decision {
            if enabled {
                if let Some(comp) = self.registry.get_mut(component_id) {
                    comp.queue
                        .push(Action::call_method(&ensure_call_expr(&method), Vec::new()));
                }
                self.flush_reporting(component_id);
            }
            self.schedule_poll(component_id);
        }
    }

    pub(crate) fn schedule_poll(&mut self, component_id: &str) {
        let timing = match self.registry.get(component_id).and_then(|c| c.poll.as_ref()) {
            Some(poll) if !poll.disable => poll.timing_ms,
            _ => return,
        };
        let task = TimerTask::Poll { component_id: component_id.to_string() };
        let timer = self.scheduler.schedule(timing, task);
        if let Some(comp) = self.registry.get_mut(component_id) {
            if let Some(old) = comp.poll_timer.replace(timer) {
                self.scheduler.cancel(old);
            }
        }
    }

    fn handle_model_event(&mut self, event: &UiEvent) {
        let Some(comp_id) = self.component_of(event.target) else { return };
        let Some(comp) = self.registry.get(&comp_id) else { return };
        let Some(el) = comp
            .model_els
            .iter()
            .find(|el| el.node == event.target)
            .cloned()
        else {
            return;
        };
        let Some(model) = el.model.clone() else { return };
        let confirmed = comp.confirmed_value(&model.name).cloned();

        let dirty = el.is_dirty(&self.doc, confirmed.as_ref());
        el.apply_dirty(&mut self.doc, !dirty);

        // Lazy models use `input` purely for the dirty indicator; only
        // `blur` enqueues.
        if model.is_lazy && event.event_type == "input" {
            return;
        }
        if event.event_type != model.event_type {
            return;
        }

        let value = el.get_value(&self.doc);
        let Some(comp) = self.registry.get_mut(&comp_id) else { return };
        if !comp.triggering.contains(&el.node) {
            comp.triggering.push(el.node);
        }

        if model.is_defer {
            comp.queue.defer_sync_input(&model.name, value, dirty);
            return;
        }
        comp.queue.push(Action::sync_input(&model.name, value));
        let debounce = if model.is_lazy { 0 } else { model.debounce_ms };
        self.schedule_flush(&comp_id, debounce);
    }

    fn handle_action_event(&mut self, event: &mut UiEvent) {
        let Some(comp_id) = self.component_of(event.target) else { return };
        let bound = {
            let Some(comp) = self.registry.get(&comp_id) else { return };
            if !comp.attached_events.contains(&event.event_type) {
                return;
            }
            self.find_bound_action(comp, event)
        };
        let Some((node, actions, partials)) = bound else { return };

        // A button click must capture unsaved lazy fields in its
        // subtree in the same batch.
        let lazy: Vec<(String, Value)> = {
            let Some(comp) = self.registry.get(&comp_id) else { return };
            comp.model_els
                .iter()
                .filter_map(|el| {
                    let model = el.model.as_ref()?;
                    if !model.is_lazy || !self.doc.tree().contains(node, el.node) {
                        return None;
                    }
                    if !el.is_dirty(&self.doc, comp.confirmed_value(&model.name)) {
                        return None;
                    }
                    Some((model.name.clone(), el.get_value(&self.doc)))
                })
                .collect()
        };
        if let Some(comp) = self.registry.get_mut(&comp_id) {
            for (name, value) in lazy {
                comp.queue.push(Action::sync_input(&name, value));
            }
        }

        let snapshot = self.event_snapshot(event);
        let return_value = self
            .registry
            .get(&comp_id)
            .and_then(|c| c.last_return.as_ref())
            .map(|r| r.value.clone())
            .unwrap_or(Value::Null);

        for action in actions {
            if action.is_prevent {
                event.prevent_default();
            }
            if action.is_stop {
                event.stop_propagation();
            }
            if action.is_discard {
                if let Some(comp) = self.registry.get_mut(&comp_id) {
                    comp.queue.clear();
                }
            }

            let expression = expr::substitute_args(&action.name, &snapshot, &return_value);

            // Keycode filter gates the invocation itself.
            if let Some(wanted) = &action.key {
                let pressed = event.key.as_deref().map(normalize_key);
                if pressed.as_deref() != Some(wanted.as_str()) {
                    continue;
                }
            }

            let wire_partials: Vec<PartialTarget> = partials
                .iter()
                .map(|p: &PartialFacet| PartialTarget {
                    id: p.id.clone(),
                    key: p.key.clone(),
                    target: p.target.clone(),
                })
                .collect();

            if let Some(comp) = self.registry.get_mut(&comp_id) {
                if !comp.triggering.contains(&node) {
                    comp.triggering.push(node);
                }
                comp.queue
                    .push(Action::call_method(&expression, wire_partials));
            }
            self.schedule_flush(&comp_id, action.debounce_ms);
        }
    }

    /// Nearest ancestor of the event target that carries a matching
    /// action for this event type. Supports nested markup inside a
    /// clickable container.
    fn find_bound_action(
        &self,
        comp: &Component,
        event: &UiEvent,
    ) -> Option<(NodeId, Vec<ActionFacet>, Vec<PartialFacet>)> {
        let mut cur = event.target;
        while cur.is_valid() {
            if let Some(el) = comp.action_els.iter().find(|el| el.node == cur) {
                let matching: Vec<ActionFacet> = el
                    .actions
                    .iter()
                    .filter(|a| a.event_type == event.event_type)
                    .cloned()
                    .collect();
                if !matching.is_empty() {
                    return Some((cur, matching, el.partials.clone()));
                }
            }
            if cur == comp.root {
                break;
            }
            cur = self.doc.tree().get(cur).map(|n| n.parent)?;
        }
        None
    }

    /// JSON snapshot of the event for `$event.*` argument resolution.
    fn event_snapshot(&self, event: &UiEvent) -> Value {
        let el = ElementModel::build(&self.doc, event.target);
        let elem = self.doc.tree().elem(event.target);
        json!({
            "type": event.event_type,
            "key": event.key,
            "target": {
                "tag": elem.map(|e| e.tag.clone()),
                "id": elem.and_then(|e| e.id.clone()),
                "name": elem.and_then(|e| e.get_attr("name").map(str::to_string)),
                "value": el.get_value(&self.doc),
                "checked": elem.map(|e| e.effective_checked()),
            }
        })
    }

    /// Nearest registered component containing `node`.
    pub(crate) fn component_of(&self, node: NodeId) -> Option<String> {
        let mut cur = node;
        while cur.is_valid() {
            if let Some(id) = ns_attr(&self.doc, cur, "id") {
                if self.registry.contains(&id) {
                    return Some(id);
                }
            }
            cur = self.doc.tree().get(cur)?.parent;
        }
        None
    }

    /// Schedule (or immediately run) a queue flush. Trailing-edge
    /// debounce: rescheduling cancels any pending flush timer.
    pub(crate) fn schedule_flush(&mut self, component_id: &str, debounce_ms: i64) {
        if debounce_ms == 0 {
            self.flush_reporting(component_id);
            return;
        }
        let wait = if debounce_ms < 0 {
            self.config.default_debounce_ms
        } else {
            debounce_ms as u64
        };
        let task = TimerTask::Flush { component_id: component_id.to_string() };
        let timer = self.scheduler.schedule(wait, task);
        if let Some(comp) = self.registry.get_mut(component_id) {
            if let Some(old) = comp.flush_timer.replace(timer) {
                self.scheduler.cancel(old);
            }
        }
    }

    /// Flush immediately (public call API path).
    fn flush_now(&mut self, component_id: &str) -> Result<(), Error> {
        self.flush_component(component_id)
    }

    /// Flush, routing failures to the error hook instead of the caller
    /// (timer callbacks have no caller to return to).
    pub(crate) fn flush_reporting(&mut self, component_id: &str) {
        if let Err(error) = self.flush_component(component_id) {
            tracing::warn!(component = %component_id, %error, "flush failed");
            if let Some(hooks) = self.hooks.as_mut() {
                hooks.error(component_id, &error);
            }
        }
    }

    /// Re-resolve a component's root after a morph and rebuild derived
    /// state.
    pub(crate) fn refresh_component(&mut self, component_id: &str) {
        // Split borrows: find the root first, then hand the document to
        // the component's refresh.
        if find_component_root(&self.doc, component_id).is_some() {
            if let Some(comp) = self.registry.get_mut(component_id) {
                let doc = &self.doc;
                comp.refresh(doc);
            }
        }
    }
}

/// Normalize a DOM key name to the kebab-case the attribute vocabulary
/// uses ("ArrowUp" -> "arrow-up").
fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Poll/visibility methods may be bare names; the wire always carries a
/// call expression.
fn ensure_call_expr(method: &str) -> String {
    if method.contains('(') {
        method.to_string()
    } else {
        format!("{method}()")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalization_is_kebab_case() {
        assert_eq!(normalize_key("Enter"), "enter");
        assert_eq!(normalize_key("ArrowUp"), "arrow-up");
        assert_eq!(normalize_key("PageDown"), "page-down");
        assert_eq!(normalize_key("a"), "a");
    }

    #[test]
    fn bare_methods_become_call_expressions() {
        assert_eq!(ensure_call_expr("refresh"), "refresh()");
        assert_eq!(ensure_call_expr("load(1)"), "load(1)");
    }
}
