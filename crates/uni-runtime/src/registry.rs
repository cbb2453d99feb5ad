//! Component registry.
//!
//! Process-scoped `componentId -> Component` store. Reconciliation can
//! insert or remove component roots far from the code that created the
//! original instance, so lookup has to be global; the raw map is never
//! exposed.

use std::collections::HashMap;

use crate::component::Component;

/// Registry of live components.
#[derive(Debug, Default)]
pub struct Registry {
    components: HashMap<String, Component>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: Component) {
        tracing::debug!(component = %component.id, "registering component");
        self.components.insert(component.id.clone(), component);
    }

    pub fn unregister(&mut self, id: &str) -> Option<Component> {
        tracing::debug!(component = %id, "unregistering component");
        self.components.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.get_mut(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.components.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Resolve a public lookup: key first, then name. Comparison is by
    /// string so numeric keys tolerate either representation.
    pub fn resolve(&self, name_or_key: &str) -> Option<&str> {
        if let Some(c) = self
            .components
            .values()
            .find(|c| c.key.as_deref() == Some(name_or_key))
        {
            return Some(&c.id);
        }
        self.components
            .values()
            .find(|c| c.name == name_or_key)
            .map(|c| c.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use uni_html::parse_fragment;

    fn component(markup: &str) -> Component {
        let doc = parse_fragment(markup);
        let root = doc.tree().children(doc.root())[0];
        Component::from_root(&doc, root).unwrap()
    }

    #[test]
    fn resolve_prefers_key_over_name() {
        let mut registry = Registry::new();
        registry.register(component(
            "<div unicorn:id=\"1\" unicorn:name=\"rows\" unicorn:key=\"special\"></div>",
        ));
        registry.register(component(
            "<div unicorn:id=\"2\" unicorn:name=\"special\"></div>",
        ));

        // "special" matches component 1's key before component 2's name.
        assert_eq!(registry.resolve("special"), Some("1"));
        assert_eq!(registry.resolve("rows"), Some("1"));
        assert_eq!(registry.resolve("nothing"), None);
    }

    #[test]
    fn register_unregister_lifecycle() {
        let mut registry = Registry::new();
        registry.register(component("<div unicorn:id=\"42\" unicorn:name=\"c\"></div>"));
        assert!(registry.contains("42"));
        assert!(registry.unregister("42").is_some());
        assert!(!registry.contains("42"));
        assert!(registry.unregister("42").is_none());
    }
}
