//! Element model.
//!
//! A transient, typed view over one DOM element's framework attributes.
//! Built fresh whenever attributes may have changed - never cached
//! across a morph. Two models are "the same element" iff they wrap the
//! same NodeId; structural equality of facets is a separate question
//! (used for idempotence checks, not for listener dedup).

use serde_json::Value;
use uni_dom::{Document, FileHandle, NodeId};

use crate::attribute::{self, DirectiveKind, NAMESPACES};

/// Model binding facet.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFacet {
    /// Bound data field name.
    pub name: String,
    /// DOM event that drives the binding: "blur" for lazy, "input"
    /// otherwise.
    pub event_type: String,
    pub is_lazy: bool,
    pub is_defer: bool,
    /// -1 = use the runtime default, 0 = immediate.
    pub debounce_ms: i64,
}

/// One action binding (an element may carry several, one per event
/// type).
#[derive(Debug, Clone, PartialEq)]
pub struct ActionFacet {
    /// Method-call expression, e.g. `save($event.target.value)`.
    pub name: String,
    pub event_type: String,
    pub is_prevent: bool,
    pub is_stop: bool,
    pub is_discard: bool,
    /// Keycode filter (kebab-case, e.g. "enter").
    pub key: Option<String>,
    /// 0 = immediate, -1 = runtime default.
    pub debounce_ms: i64,
}

/// Polling facet (component root).
#[derive(Debug, Clone, PartialEq)]
pub struct PollFacet {
    pub method: String,
    pub timing_ms: u64,
    /// Statically disabled.
    pub disable: bool,
    /// Data field consulted at each tick; a leading `!` negates.
    pub disable_data_key: Option<String>,
}

impl Default for PollFacet {
    fn default() -> Self {
        Self {
            method: "refresh".to_string(),
            timing_ms: 2000,
            disable: false,
            disable_data_key: None,
        }
    }
}

/// Shared shape of the loading and dirty indicator facets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterfacerFacet {
    /// Attribute toggled while active (e.g. "disabled").
    pub attr: Option<String>,
    pub classes_to_add: Vec<String>,
    pub classes_to_remove: Vec<String>,
    /// Element is revealed while active.
    pub show: bool,
    /// Element is hidden while active.
    pub hide: bool,
}

/// Visibility trigger facet.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityFacet {
    pub method: String,
    /// Visible-fraction threshold in `0.0..=1.0`.
    pub threshold: f64,
    pub debounce_ms: u64,
}

/// A partial-update target declaration on an action element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialFacet {
    pub id: Option<String>,
    pub key: Option<String>,
    pub target: Option<String>,
}

/// A server-side validation error rendered onto this element.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorMarker {
    pub code: String,
    pub message: String,
}

/// Typed aggregation of one element's framework attributes.
#[derive(Debug, Clone)]
pub struct ElementModel {
    pub node: NodeId,
    pub is_unicorn: bool,
    pub model: Option<ModelFacet>,
    pub actions: Vec<ActionFacet>,
    pub poll: Option<PollFacet>,
    pub loading: Option<InterfacerFacet>,
    pub dirty: Option<InterfacerFacet>,
    pub visibility: Option<VisibilityFacet>,
    pub partials: Vec<PartialFacet>,
    pub errors: Vec<ErrorMarker>,
    pub key: Option<String>,
    /// Scopes loading indicators to actions from a named element.
    pub target: Option<String>,
}

impl ElementModel {
    /// Build a fresh model from the node's current attributes. Pure and
    /// idempotent; malformed attributes merge to nothing rather than
    /// failing, so a DOM walk never aborts on one bad element.
    pub fn build(doc: &Document, node: NodeId) -> Self {
        let mut model = Self {
            node,
            is_unicorn: false,
            model: None,
            actions: Vec::new(),
            poll: None,
            loading: None,
            dirty: None,
            visibility: None,
            partials: Vec::new(),
            errors: Vec::new(),
            key: None,
            target: None,
        };

        let attrs: Vec<(String, String)> = doc
            .tree()
            .elem(node)
            .map(|e| {
                e.attrs
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        for (name, value) in attrs {
            let directive = attribute::parse(&name, &value);
            if !directive.is_unicorn {
                continue;
            }
            model.is_unicorn = true;
            match &directive.kind {
                DirectiveKind::None => {}
                DirectiveKind::Model => {
                    let is_lazy = directive.has_modifier("lazy");
                    model.model = Some(ModelFacet {
                        name: directive.value.clone(),
                        event_type: if is_lazy { "blur" } else { "input" }.to_string(),
                        is_lazy,
                        is_defer: directive.has_modifier("defer"),
                        debounce_ms: match (
                            directive.modifier_int("debounce"),
                            directive.has_modifier("debounce"),
                        ) {
                            (Some(n), _) => n,
                            (None, true) => -1,
                            (None, false) => -1,
                        },
                    });
                }
                DirectiveKind::Action { event_type } => {
                    let key = directive
                        .modifiers
                        .keys()
                        .find(|m| {
                            !matches!(m.as_str(), "prevent" | "stop" | "discard" | "debounce")
                        })
                        .cloned();
                    model.actions.push(ActionFacet {
                        name: directive.value.clone(),
                        event_type: event_type.clone(),
                        is_prevent: directive.has_modifier("prevent"),
                        is_stop: directive.has_modifier("stop"),
                        is_discard: directive.has_modifier("discard"),
                        key,
                        debounce_ms: match (
                            directive.modifier_int("debounce"),
                            directive.has_modifier("debounce"),
                        ) {
                            (Some(n), _) => n,
                            (None, true) => -1,
                            (None, false) => 0,
                        },
                    });
                }
                DirectiveKind::Poll => {
                    let facet = model.poll.get_or_insert_with(PollFacet::default);
                    if !directive.value.is_empty() {
                        facet.method = directive.value.clone();
                    }
                    if let Some(t) = directive.modifier_int("timing") {
                        facet.timing_ms = t.max(0) as u64;
                    }
                }
                DirectiveKind::PollDisable => {
                    // `poll.disable` refines the poll facet rather than
                    // standing alone.
                    let facet = model.poll.get_or_insert_with(PollFacet::default);
                    if let Some(t) = directive.modifier_int("timing") {
                        facet.timing_ms = t.max(0) as u64;
                    }
                    if directive.value.is_empty() {
                        facet.disable = true;
                    } else {
                        facet.disable_data_key = Some(directive.value.clone());
                    }
                }
                DirectiveKind::Loading => {
                    merge_interfacer(
                        model.loading.get_or_insert_with(InterfacerFacet::default),
                        &directive,
                    );
                }
                DirectiveKind::Dirty => {
                    merge_interfacer(
                        model.dirty.get_or_insert_with(InterfacerFacet::default),
                        &directive,
                    );
                }
                DirectiveKind::Target => {
                    model.target = Some(directive.value.clone());
                }
                DirectiveKind::Partial => {
                    let mut partial = PartialFacet::default();
                    if directive.has_modifier("id") {
                        partial.id = Some(directive.value.clone());
                    } else if directive.has_modifier("key") {
                        partial.key = Some(directive.value.clone());
                    } else {
                        partial.target = Some(directive.value.clone());
                    }
                    model.partials.push(partial);
                }
                DirectiveKind::Key => {
                    model.key = Some(directive.value.clone());
                }
                DirectiveKind::Error { code } => {
                    model.errors.push(ErrorMarker {
                        code: code.clone(),
                        message: directive.value.clone(),
                    });
                }
                DirectiveKind::Visible => {
                    model.visibility = Some(VisibilityFacet {
                        method: directive.value.clone(),
                        threshold: directive
                            .modifier_int("threshold")
                            .map(|n| (n as f64 / 100.0).clamp(0.0, 1.0))
                            .unwrap_or(0.0),
                        debounce_ms: directive
                            .modifier_int("debounce")
                            .map(|n| n.max(0) as u64)
                            .unwrap_or(0),
                    });
                }
            }
        }
        model
    }

    /// Node-identity equality ("same element"), as opposed to
    /// structural facet equality.
    pub fn is_same(&self, other: &ElementModel) -> bool {
        self.node == other.node
    }

    /// Read the element's current value the way the server expects it.
    pub fn get_value(&self, doc: &Document) -> Value {
        let Some(elem) = doc.tree().elem(self.node) else {
            return Value::Null;
        };
        match (elem.tag.as_str(), elem.input_type().as_str()) {
            ("input", "checkbox") => Value::Bool(elem.effective_checked()),
            ("input", "radio") => {
                if elem.effective_checked() {
                    Value::String(elem.effective_value().to_string())
                } else {
                    Value::Null
                }
            }
            ("input", "file") => Value::Null,
            ("select", _) if elem.has_attr("multiple") => {
                let selected: Vec<Value> = doc
                    .tree()
                    .descendants(self.node)
                    .into_iter()
                    .filter_map(|id| {
                        let option = doc.tree().elem(id)?;
                        if option.tag != "option" || !option.effective_selected() {
                            return None;
                        }
                        Some(Value::String(option_value(doc, id)))
                    })
                    .collect();
                Value::Array(selected)
            }
            _ => Value::String(elem.effective_value().to_string()),
        }
    }

    /// Files attached to a file input, passed through untouched.
    pub fn files(&self, doc: &Document) -> Vec<FileHandle> {
        doc.tree()
            .elem(self.node)
            .map(|e| e.files.clone())
            .unwrap_or_default()
    }

    /// Write a data value back into the element.
    pub fn set_value(&self, doc: &mut Document, value: &Value) {
        let Some(elem) = doc.tree().elem(self.node) else { return };
        let tag = elem.tag.clone();
        let input_type = elem.input_type();
        let own_value = elem.effective_value().to_string();

        match (tag.as_str(), input_type.as_str()) {
            ("input", "checkbox") => {
                let checked = value.as_bool().unwrap_or(false);
                if let Some(e) = doc.tree_mut().elem_mut(self.node) {
                    e.checked = Some(checked);
                }
            }
            ("input", "radio") => {
                // Checked iff the incoming value matches this radio's
                // own value.
                let matches = value_as_string(value) == own_value;
                if let Some(e) = doc.tree_mut().elem_mut(self.node) {
                    e.checked = Some(matches);
                }
            }
            ("input", "file") => {}
            ("select", _) if doc.tree().elem(self.node).is_some_and(|e| e.has_attr("multiple")) => {
                let wanted: Vec<String> = value
                    .as_array()
                    .map(|a| a.iter().map(value_as_string).collect())
                    .unwrap_or_default();
                for id in doc.tree().descendants(self.node) {
                    let Some(option) = doc.tree().elem(id) else { continue };
                    if option.tag != "option" {
                        continue;
                    }
                    let selected = wanted.contains(&option_value(doc, id));
                    if let Some(e) = doc.tree_mut().elem_mut(id) {
                        e.selected = Some(selected);
                    }
                }
            }
            _ => {
                let text = value_as_string(value);
                if let Some(e) = doc.tree_mut().elem_mut(self.node) {
                    e.value = Some(text);
                }
            }
        }
    }

    /// Whether the element's live value diverges from the component's
    /// last server-confirmed value for its binding.
    pub fn is_dirty(&self, doc: &Document, confirmed: Option<&Value>) -> bool {
        let current = self.get_value(doc);
        match confirmed {
            Some(v) => !values_equal(&current, v),
            None => !matches!(current, Value::Null)
                && current != Value::String(String::new()),
        }
    }

    pub fn focus(&self, doc: &mut Document) {
        let _ = doc.focus(self.node);
    }

    pub fn show(&self, doc: &mut Document) {
        doc.remove_attr(self.node, "hidden");
    }

    pub fn hide(&self, doc: &mut Document) {
        doc.set_attr(self.node, "hidden", "");
    }

    /// Render a validation error onto the element.
    pub fn add_error(&self, doc: &mut Document, code: &str, message: &str) {
        let name = format!("{}error:{}", NAMESPACES[0], code);
        doc.set_attr(self.node, &name, message);
    }

    /// Strip all validation-error markers.
    pub fn remove_errors(&self, doc: &mut Document) {
        let prefixes: Vec<String> = NAMESPACES
            .iter()
            .map(|ns| format!("{ns}error:"))
            .collect();
        let stale: Vec<String> = doc
            .tree()
            .elem(self.node)
            .map(|e| {
                e.attrs
                    .iter()
                    .filter(|a| prefixes.iter().any(|p| a.name.starts_with(p)))
                    .map(|a| a.name.clone())
                    .collect()
            })
            .unwrap_or_default();
        for name in stale {
            doc.remove_attr(self.node, &name);
        }
    }

    /// Toggle the loading indicator; `revert` replays the inverse.
    pub fn apply_loading(&self, doc: &mut Document, revert: bool) {
        if let Some(facet) = self.loading.clone() {
            self.apply_interfacer(doc, &facet, revert);
        }
    }

    /// Toggle the dirty indicator; `revert` replays the inverse.
    pub fn apply_dirty(&self, doc: &mut Document, revert: bool) {
        if let Some(facet) = self.dirty.clone() {
            self.apply_interfacer(doc, &facet, revert);
        }
    }

    fn apply_interfacer(&self, doc: &mut Document, facet: &InterfacerFacet, revert: bool) {
        if facet.show {
            if revert { self.hide(doc) } else { self.show(doc) }
        }
        if facet.hide {
            if revert { self.show(doc) } else { self.hide(doc) }
        }
        if let Some(attr) = &facet.attr {
            if revert {
                doc.remove_attr(self.node, attr);
            } else {
                doc.set_attr(self.node, attr, attr);
            }
        }
        for class in &facet.classes_to_add {
            toggle_class(doc, self.node, class, !revert);
        }
        for class in &facet.classes_to_remove {
            toggle_class(doc, self.node, class, revert);
        }
    }
}

fn merge_interfacer(facet: &mut InterfacerFacet, directive: &crate::attribute::Directive) {
    if directive.has_modifier("attr") {
        facet.attr = Some(directive.value.clone());
    } else if directive.has_modifier("class") {
        let classes: Vec<String> = directive
            .value
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if directive.has_modifier("remove") {
            facet.classes_to_remove = classes;
        } else {
            facet.classes_to_add = classes;
        }
    } else if directive.has_modifier("remove") {
        facet.hide = true;
    } else {
        facet.show = true;
    }
}

/// An option's submit value: its value attribute, else its text.
fn option_value(doc: &Document, id: NodeId) -> String {
    match doc.attr(id, "value") {
        Some(v) => v.to_string(),
        None => doc.tree().text_content(id).trim().to_string(),
    }
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Loose equality between the DOM's string-flavored values and the
/// server's typed ones ("2" counts as equal to 2).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    value_as_string(a) == value_as_string(b)
}

/// Set membership toggle on the class attribute.
fn toggle_class(doc: &mut Document, node: NodeId, class: &str, present: bool) {
    let mut classes: Vec<String> = doc
        .attr(node, "class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let has = classes.iter().any(|c| c == class);
    if present && !has {
        classes.push(class.to_string());
    } else if !present && has {
        classes.retain(|c| c != class);
    }
    if classes.is_empty() {
        doc.remove_attr(node, "class");
    } else {
        doc.set_attr(node, "class", &classes.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uni_html::parse_fragment;

    fn first_element(doc: &Document) -> NodeId {
        doc.tree().children(doc.root())[0]
    }

    #[test]
    fn build_is_idempotent() {
        let doc = parse_fragment(
            "<input unicorn:model.lazy.debounce-300=\"name\" unicorn:key=\"k1\">",
        );
        let node = first_element(&doc);
        let a = ElementModel::build(&doc, node);
        let b = ElementModel::build(&doc, node);
        assert_eq!(a.model, b.model);
        assert_eq!(a.key, b.key);
        assert!(a.is_same(&b));
    }

    #[test]
    fn lazy_model_listens_on_blur() {
        let doc = parse_fragment("<input unicorn:model.lazy=\"name\">");
        let m = ElementModel::build(&doc, first_element(&doc));
        let model = m.model.unwrap();
        assert_eq!(model.event_type, "blur");
        assert!(model.is_lazy);

        let doc = parse_fragment("<input unicorn:model=\"name\">");
        let m = ElementModel::build(&doc, first_element(&doc));
        assert_eq!(m.model.unwrap().event_type, "input");
    }

    #[test]
    fn action_modifiers_parse() {
        let doc = parse_fragment("<button unicorn:click.prevent.stop=\"save()\"></button>");
        let m = ElementModel::build(&doc, first_element(&doc));
        let action = &m.actions[0];
        assert_eq!(action.event_type, "click");
        assert_eq!(action.name, "save()");
        assert!(action.is_prevent);
        assert!(action.is_stop);
        assert_eq!(action.debounce_ms, 0);
    }

    #[test]
    fn action_debounce_argument_and_bare() {
        let doc = parse_fragment("<button unicorn:click.debounce-500=\"go()\"></button>");
        let m = ElementModel::build(&doc, first_element(&doc));
        assert_eq!(m.actions[0].debounce_ms, 500);

        let doc = parse_fragment("<button unicorn:click.debounce=\"go()\"></button>");
        let m = ElementModel::build(&doc, first_element(&doc));
        assert_eq!(m.actions[0].debounce_ms, -1);
    }

    #[test]
    fn keycode_filter_is_extracted() {
        let doc = parse_fragment("<input unicorn:keydown.enter=\"submit()\">");
        let m = ElementModel::build(&doc, first_element(&doc));
        assert_eq!(m.actions[0].key.as_deref(), Some("enter"));
        assert_eq!(m.actions[0].event_type, "keydown");

        // Kebab-case key names keep their dashes.
        let doc = parse_fragment("<input unicorn:keydown.arrow-up=\"up()\">");
        let m = ElementModel::build(&doc, first_element(&doc));
        assert_eq!(m.actions[0].key.as_deref(), Some("arrow-up"));
    }

    #[test]
    fn multiple_actions_per_element() {
        let doc = parse_fragment(
            "<button unicorn:click=\"save()\" unicorn:mouseover=\"peek()\"></button>",
        );
        let m = ElementModel::build(&doc, first_element(&doc));
        assert_eq!(m.actions.len(), 2);
    }

    #[test]
    fn poll_disable_merges_into_poll_facet() {
        let doc = parse_fragment(
            "<div unicorn:poll-5000=\"refresh\" unicorn:poll.disable=\"!polling\"></div>",
        );
        let m = ElementModel::build(&doc, first_element(&doc));
        let poll = m.poll.unwrap();
        assert_eq!(poll.method, "refresh");
        assert_eq!(poll.timing_ms, 5000);
        assert_eq!(poll.disable_data_key.as_deref(), Some("!polling"));
    }

    #[test]
    fn loading_attr_and_class_merge() {
        let doc = parse_fragment(
            "<button unicorn:loading.attr=\"disabled\" unicorn:loading.class=\"busy\"></button>",
        );
        let m = ElementModel::build(&doc, first_element(&doc));
        let loading = m.loading.unwrap();
        assert_eq!(loading.attr.as_deref(), Some("disabled"));
        assert_eq!(loading.classes_to_add, vec!["busy".to_string()]);
    }

    #[test]
    fn checkbox_value_round_trip() {
        let mut doc = parse_fragment("<input type=\"checkbox\" unicorn:model=\"done\">");
        let node = first_element(&doc);
        let m = ElementModel::build(&doc, node);
        assert_eq!(m.get_value(&doc), Value::Bool(false));

        m.set_value(&mut doc, &Value::Bool(true));
        assert_eq!(m.get_value(&doc), Value::Bool(true));
    }

    #[test]
    fn multi_select_values() {
        let mut doc = parse_fragment(
            "<select multiple unicorn:model=\"tags\">\
             <option value=\"a\">A</option><option value=\"b\">B</option></select>",
        );
        let node = first_element(&doc);
        let m = ElementModel::build(&doc, node);

        m.set_value(&mut doc, &serde_json::json!(["b"]));
        assert_eq!(m.get_value(&doc), serde_json::json!(["b"]));
    }

    #[test]
    fn radio_checked_iff_value_matches() {
        let mut doc = parse_fragment("<input type=\"radio\" value=\"red\" unicorn:model=\"color\">");
        let node = first_element(&doc);
        let m = ElementModel::build(&doc, node);

        m.set_value(&mut doc, &Value::String("red".into()));
        assert_eq!(m.get_value(&doc), Value::String("red".into()));

        m.set_value(&mut doc, &Value::String("blue".into()));
        assert_eq!(m.get_value(&doc), Value::Null);
    }

    #[test]
    fn loading_toggle_is_reversible() {
        let mut doc = parse_fragment(
            "<button class=\"base\" unicorn:loading.attr=\"disabled\" \
             unicorn:loading.class=\"busy\"></button>",
        );
        let node = first_element(&doc);
        let m = ElementModel::build(&doc, node);

        m.apply_loading(&mut doc, false);
        assert_eq!(doc.attr(node, "disabled"), Some("disabled"));
        assert_eq!(doc.attr(node, "class"), Some("base busy"));

        m.apply_loading(&mut doc, true);
        assert_eq!(doc.attr(node, "disabled"), None);
        assert_eq!(doc.attr(node, "class"), Some("base"));
    }

    #[test]
    fn error_markers_round_trip() {
        let mut doc = parse_fragment("<input unicorn:model=\"name\">");
        let node = first_element(&doc);
        let m = ElementModel::build(&doc, node);

        m.add_error(&mut doc, "required", "This field is required");
        let rebuilt = ElementModel::build(&doc, node);
        assert_eq!(rebuilt.errors.len(), 1);
        assert_eq!(rebuilt.errors[0].code, "required");

        m.remove_errors(&mut doc);
        let rebuilt = ElementModel::build(&doc, node);
        assert!(rebuilt.errors.is_empty());
    }

    #[test]
    fn dirty_compares_against_confirmed_value() {
        let mut doc = parse_fragment("<input unicorn:model=\"name\" value=\"Ada\">");
        let node = first_element(&doc);
        let m = ElementModel::build(&doc, node);

        let confirmed = Value::String("Ada".into());
        assert!(!m.is_dirty(&doc, Some(&confirmed)));

        doc.tree_mut().elem_mut(node).unwrap().value = Some("Grace".into());
        assert!(m.is_dirty(&doc, Some(&confirmed)));
    }
}
