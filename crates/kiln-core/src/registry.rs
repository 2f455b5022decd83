use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ComponentError;
use crate::instance::{Instance, Mounted};
use crate::schema::{LiveComponent, Schema};

/// Constructs instances of one registered component type.
pub trait ComponentFactory: Send + Sync {
    fn component_name(&self) -> &str;

    /// A fresh instance with a newly generated identity.
    fn create(&self) -> Box<dyn Instance>;
}

struct TypedFactory<C> {
    name: Arc<str>,
    schema: Arc<Schema<C>>,
}

impl<C: LiveComponent> ComponentFactory for TypedFactory<C> {
    fn component_name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Box<dyn Instance> {
        Box::new(Mounted::new(
            Arc::clone(&self.name),
            C::default(),
            Arc::clone(&self.schema),
        ))
    }
}

/// Name -> component type bindings.
///
/// Filled during startup through `&mut self`, then handed to the manager and
/// only read from there on, so lookups take no lock.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, Arc<dyn ComponentFactory>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to component type `C`, building its schema once.
    pub fn register<C: LiveComponent>(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        let factory = TypedFactory::<C> {
            name: Arc::from(name.as_str()),
            schema: Arc::new(Schema::<C>::build()),
        };

        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::warn!(component = %name, "Component registered twice, keeping the latest");
        } else {
            tracing::info!(
                component = %name,
                rust_type = std::any::type_name::<C>(),
                "Registered live component"
            );
        }
        self
    }

    /// Register `C` under [`LiveComponent::component_name`].
    pub fn register_default<C: LiveComponent>(&mut self) -> &mut Self {
        self.register::<C>(C::component_name())
    }

    /// The factory bound to `name`, or `ComponentNotFound`.
    pub fn resolve(&self, name: &str) -> Result<&dyn ComponentFactory, ComponentError> {
        self.factories
            .get(name)
            .map(|factory| factory.as_ref())
            .ok_or_else(|| ComponentError::ComponentNotFound(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    #[derive(Default)]
    struct Clock {
        ticks: u64,
    }

    impl LiveComponent for Clock {
        fn template(&self) -> &str {
            "clock.html"
        }

        fn schema(schema: &mut SchemaBuilder<Self>) {
            schema.state("ticks", |c| &c.ticks, |c| &mut c.ticks);
        }
    }

    #[derive(Default)]
    struct Banner;

    impl LiveComponent for Banner {
        fn template(&self) -> &str {
            "banner.html"
        }

        fn schema(_schema: &mut SchemaBuilder<Self>) {}

        fn component_name() -> &'static str {
            "promo-banner"
        }
    }

    #[test]
    fn resolve_unknown_name_fails() {
        let registry = ComponentRegistry::new();
        let err = registry.resolve("Nope").err().unwrap();
        assert!(matches!(err, ComponentError::ComponentNotFound(ref name) if name == "Nope"));
        assert!(registry.is_empty());
    }

    #[test]
    fn factories_create_distinct_instances() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Clock>("Clock");

        let factory = registry.resolve("Clock").unwrap();
        let a = factory.create();
        let b = factory.create();

        assert_ne!(a.id(), b.id());
        assert_eq!(a.component_name(), "Clock");
        assert_eq!(a.template(), "clock.html");
        assert_eq!(a.capture()["ticks"], serde_json::json!(0));
    }

    #[test]
    fn default_names_come_from_the_type() {
        let mut registry = ComponentRegistry::new();
        registry.register_default::<Clock>().register_default::<Banner>();

        assert_eq!(registry.names(), ["Clock", "promo-banner"]);
        assert!(registry.contains("promo-banner"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registering_twice_replaces_binding() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Clock>("Widget").register::<Banner>("Widget");

        assert_eq!(registry.len(), 1);
        let instance = registry.resolve("Widget").unwrap().create();
        assert_eq!(instance.template(), "banner.html");
    }
}
