//! Attribute parser.
//!
//! Turns one raw DOM attribute into a structured [`Directive`]. The
//! framework namespace has two equivalent spellings (`unicorn:` and
//! `u:`); everything outside it parses to a non-directive and is
//! ignored. Directive kinds are resolved in a fixed priority order so
//! that e.g. `poll.disable` wins over `poll` and `key` never turns into
//! a "key" event action.

use std::collections::BTreeMap;

/// Recognized namespace prefixes, checked in order.
pub const NAMESPACES: [&str; 2] = ["unicorn:", "u:"];

/// Suffixes that identify the component itself rather than a behavior.
const RESERVED: [&str; 3] = ["id", "name", "checksum"];

/// What one attribute means.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveKind {
    /// Not in the framework namespace, or a reserved identity suffix.
    None,
    /// `model[.lazy][.defer][.debounce[-N]]`
    Model,
    /// `<eventType>[.prevent][.stop][.discard][.<keycode>]`
    Action { event_type: String },
    /// `poll[-N]`
    Poll,
    /// `poll.disable`
    PollDisable,
    /// `loading[...]`
    Loading,
    /// `dirty[...]`
    Dirty,
    /// `target`
    Target,
    /// `partial[.id|.key]`
    Partial,
    /// `key` (exact match only)
    Key,
    /// `error:<code>`
    Error { code: String },
    /// `visible[.threshold-N][.debounce-N]`
    Visible,
}

/// A parsed attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Whether the raw name carried a recognized namespace prefix.
    pub is_unicorn: bool,
    pub kind: DirectiveKind,
    /// The raw attribute value.
    pub value: String,
    /// Modifiers after the directive-determining portion; `None` means
    /// a bare modifier (`.lazy`), `Some` carries a `-`-delimited
    /// argument (`.debounce-500` -> `debounce: "500"`).
    pub modifiers: BTreeMap<String, Option<String>>,
}

impl Directive {
    fn none(value: &str, is_unicorn: bool) -> Self {
        Self {
            is_unicorn,
            kind: DirectiveKind::None,
            value: value.to_string(),
            modifiers: BTreeMap::new(),
        }
    }

    /// Modifier argument parsed as an integer, if present.
    pub fn modifier_int(&self, name: &str) -> Option<i64> {
        match self.modifiers.get(name)? {
            Some(arg) => arg.parse().ok(),
            None => None,
        }
    }

    /// Whether a modifier is present at all.
    pub fn has_modifier(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }
}

/// Parse one attribute name/value pair.
pub fn parse(raw_name: &str, raw_value: &str) -> Directive {
    let Some(rest) = strip_namespace(raw_name) else {
        return Directive::none(raw_value, false);
    };

    if RESERVED.contains(&rest) {
        return Directive::none(raw_value, true);
    }

    // error:<code> carries the code after the second colon and takes no
    // modifiers ('.' may legitimately appear inside a code).
    if let Some(code) = rest.strip_prefix("error:") {
        return Directive {
            is_unicorn: true,
            kind: DirectiveKind::Error { code: code.to_string() },
            value: raw_value.to_string(),
            modifiers: BTreeMap::new(),
        };
    }

    let (head, modifiers) = split_modifiers(rest);
    let (stem, argument) = split_argument(&head);

    let kind = match stem.as_str() {
        "model" => DirectiveKind::Model,
        // `poll.disable` must be recognized before plain `poll`.
        "poll" if modifiers.contains_key("disable") => DirectiveKind::PollDisable,
        "poll" => DirectiveKind::Poll,
        "loading" => DirectiveKind::Loading,
        "dirty" => DirectiveKind::Dirty,
        "target" => DirectiveKind::Target,
        "partial" => DirectiveKind::Partial,
        "visible" => DirectiveKind::Visible,
        // Exact match only: `key-...` or `key.x` is not an identity key.
        "key" if argument.is_none() && modifiers.is_empty() => DirectiveKind::Key,
        _ => DirectiveKind::Action { event_type: head.clone() },
    };

    let mut modifiers = modifiers;
    // The head's own `-` argument is the timing for poll (`poll-2000`).
    if matches!(kind, DirectiveKind::Poll | DirectiveKind::PollDisable) {
        if let Some(arg) = argument {
            modifiers.insert("timing".to_string(), Some(arg));
        }
    }

    Directive {
        is_unicorn: true,
        kind,
        value: raw_value.to_string(),
        modifiers,
    }
}

fn strip_namespace(name: &str) -> Option<&str> {
    NAMESPACES.iter().find_map(|ns| name.strip_prefix(ns))
}

/// Modifiers whose `-` suffix is an argument. Everything else keeps
/// its dashes whole, so keycode modifiers like `arrow-up` survive.
const ARG_MODIFIERS: [&str; 2] = ["debounce", "threshold"];

/// Split `head.mod1.mod2-arg` into the head and its modifier map. The
/// head keeps nothing past the first `.`, so event types stay clean
/// (`click.prevent` -> head `click`).
fn split_modifiers(rest: &str) -> (String, BTreeMap<String, Option<String>>) {
    let mut parts = rest.split('.');
    let head = parts.next().unwrap_or_default().to_string();
    let mut modifiers = BTreeMap::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        let (name, arg) = split_argument(part);
        if arg.is_some() && !ARG_MODIFIERS.contains(&name.as_str()) {
            modifiers.insert(part.to_string(), None);
        } else {
            modifiers.insert(name, arg);
        }
    }
    (head, modifiers)
}

/// Split a `name-argument` segment. Only splits when the suffix after
/// the last `-` is non-empty; plain names with dashes inside event
/// types survive untouched elsewhere because only known modifier names
/// are consulted by callers.
fn split_argument(segment: &str) -> (String, Option<String>) {
    match segment.split_once('-') {
        Some((name, arg)) if !name.is_empty() && !arg.is_empty() => {
            (name.to_string(), Some(arg.to_string()))
        }
        _ => (segment.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_attributes_are_not_directives() {
        let d = parse("class", "btn");
        assert!(!d.is_unicorn);
        assert_eq!(d.kind, DirectiveKind::None);

        let d = parse("data-unicorn", "x");
        assert!(!d.is_unicorn);
    }

    #[test]
    fn both_namespace_spellings_work() {
        assert_eq!(parse("unicorn:model", "name").kind, DirectiveKind::Model);
        assert_eq!(parse("u:model", "name").kind, DirectiveKind::Model);
    }

    #[test]
    fn reserved_suffixes_are_identity_not_actions() {
        for suffix in ["id", "name", "checksum"] {
            let d = parse(&format!("unicorn:{suffix}"), "x");
            assert!(d.is_unicorn);
            assert_eq!(d.kind, DirectiveKind::None);
        }
    }

    #[test]
    fn model_with_modifiers() {
        let d = parse("unicorn:model.lazy.debounce-500", "name");
        assert_eq!(d.kind, DirectiveKind::Model);
        assert!(d.has_modifier("lazy"));
        assert_eq!(d.modifier_int("debounce"), Some(500));
    }

    #[test]
    fn bare_debounce_has_no_argument() {
        let d = parse("unicorn:model.debounce", "name");
        assert!(d.has_modifier("debounce"));
        assert_eq!(d.modifier_int("debounce"), None);
    }

    #[test]
    fn poll_disable_wins_over_poll() {
        let d = parse("unicorn:poll.disable", "polling_off");
        assert_eq!(d.kind, DirectiveKind::PollDisable);

        let d = parse("unicorn:poll-3000", "refresh");
        assert_eq!(d.kind, DirectiveKind::Poll);
        assert_eq!(d.modifier_int("timing"), Some(3000));
    }

    #[test]
    fn key_is_exact_match_only() {
        assert_eq!(parse("unicorn:key", "row-7").kind, DirectiveKind::Key);
        // `keydown` and friends are actions, not identity keys.
        assert!(matches!(
            parse("unicorn:keydown.enter", "save()").kind,
            DirectiveKind::Action { ref event_type } if event_type == "keydown"
        ));
    }

    #[test]
    fn dashed_keycode_modifiers_stay_whole() {
        let d = parse("unicorn:keydown.arrow-up", "up()");
        assert!(matches!(
            d.kind,
            DirectiveKind::Action { ref event_type } if event_type == "keydown"
        ));
        assert!(d.has_modifier("arrow-up"));
        assert!(!d.has_modifier("arrow"));

        // Argument-bearing modifiers still split.
        let d = parse("unicorn:keydown.page-down.debounce-100", "next()");
        assert!(d.has_modifier("page-down"));
        assert_eq!(d.modifier_int("debounce"), Some(100));
    }

    #[test]
    fn error_code_is_extracted() {
        let d = parse("unicorn:error:required", "This field is required");
        assert_eq!(
            d.kind,
            DirectiveKind::Error { code: "required".to_string() }
        );
        assert_eq!(d.value, "This field is required");
    }

    #[test]
    fn action_modifiers_leave_event_type_clean() {
        let d = parse("unicorn:click.prevent.stop", "save()");
        assert!(matches!(
            d.kind,
            DirectiveKind::Action { ref event_type } if event_type == "click"
        ));
        assert!(d.has_modifier("prevent"));
        assert!(d.has_modifier("stop"));
    }

    #[test]
    fn visible_thresholds_and_debounce() {
        let d = parse("unicorn:visible.threshold-50.debounce-100", "load_more");
        assert_eq!(d.kind, DirectiveKind::Visible);
        assert_eq!(d.modifier_int("threshold"), Some(50));
        assert_eq!(d.modifier_int("debounce"), Some(100));
    }
}
