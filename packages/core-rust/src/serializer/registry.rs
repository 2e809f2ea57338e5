use std::sync::Arc;

use indexmap::IndexMap;

use super::{AnySerializer, BooleanSerializer, NumberSerializer, Serializer, StringSerializer};

/// Type name -> serializer registry.
///
/// Names and aliases are matched case-insensitively. Later registrations
/// replace earlier ones under the same name.
#[derive(Default, Clone)]
pub struct SerializerStore {
    by_name: IndexMap<String, Arc<dyn Serializer>>,
    primary: Vec<String>,
}

impl SerializerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with the built-in `any`, `boolean`, `number`
    /// (`integer`, `float`) and `string` serializers.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut store = Self::new();
        store.register(AnySerializer);
        store.register(BooleanSerializer);
        store.register(NumberSerializer);
        store.register(StringSerializer);
        store
    }

    /// Registers a serializer under its name and aliases.
    pub fn register<S: Serializer + 'static>(&mut self, serializer: S) -> &mut Self {
        self.register_arc(Arc::new(serializer))
    }

    /// Registers an already shared serializer.
    pub fn register_arc(&mut self, serializer: Arc<dyn Serializer>) -> &mut Self {
        let name = serializer.name().to_lowercase();
        if !self.primary.contains(&name) {
            self.primary.push(name.clone());
        }
        for alias in serializer.aliases() {
            self.by_name
                .insert(alias.to_lowercase(), Arc::clone(&serializer));
        }
        self.by_name.insert(name, serializer);
        self
    }

    /// Looks up a serializer by type name or alias.
    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn Serializer>> {
        self.by_name.get(&type_name.to_lowercase())
    }

    #[must_use]
    pub fn has(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    /// Primary names in registration order (aliases excluded).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.primary.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }
}
