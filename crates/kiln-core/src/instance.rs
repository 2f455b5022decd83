use std::sync::Arc;

use serde_json::Value;

use crate::codec::{self, Snapshot};
use crate::dispatch;
use crate::error::ComponentError;
use crate::id::ComponentId;
use crate::render::RenderContext;
use crate::schema::{LiveComponent, Schema};

/// A live component instance with its type erased.
///
/// Not safe for concurrent mutation; the manager serializes access per
/// instance.
pub trait Instance: Send {
    fn id(&self) -> &ComponentId;

    /// Name the instance was registered and mounted under.
    fn component_name(&self) -> &str;

    fn template(&self) -> &str;

    fn capture(&self) -> Snapshot;

    fn hydrate(&mut self, snapshot: &Snapshot) -> Result<(), ComponentError>;

    /// Put back a snapshot taken by [`Instance::capture`].
    fn restore(&mut self, snapshot: &Snapshot) -> Result<(), ComponentError>;

    fn dispatch(&mut self, action: &str, params: &[Value]) -> Result<(), ComponentError>;

    fn render_context(&self) -> RenderContext;
}

/// A concrete component paired with its type's schema.
pub struct Mounted<C> {
    id: ComponentId,
    name: Arc<str>,
    component: C,
    schema: Arc<Schema<C>>,
}

impl<C: LiveComponent> Mounted<C> {
    pub fn new(name: Arc<str>, component: C, schema: Arc<Schema<C>>) -> Self {
        Self {
            id: ComponentId::generate(),
            name,
            component,
            schema,
        }
    }

    /// The wrapped component.
    pub fn component(&self) -> &C {
        &self.component
    }
}

impl<C: LiveComponent> Instance for Mounted<C> {
    fn id(&self) -> &ComponentId {
        &self.id
    }

    fn component_name(&self) -> &str {
        &self.name
    }

    fn template(&self) -> &str {
        self.component.template()
    }

    fn capture(&self) -> Snapshot {
        codec::capture(&self.schema, &self.id, &self.component)
    }

    fn hydrate(&mut self, snapshot: &Snapshot) -> Result<(), ComponentError> {
        codec::hydrate(&self.schema, &mut self.component, snapshot)
    }

    fn restore(&mut self, snapshot: &Snapshot) -> Result<(), ComponentError> {
        codec::restore(&self.schema, &mut self.component, snapshot)
    }

    fn dispatch(&mut self, action: &str, params: &[Value]) -> Result<(), ComponentError> {
        dispatch::dispatch(&self.schema, &mut self.component, action, params)
    }

    fn render_context(&self) -> RenderContext {
        codec::render_context(&self.schema, &self.id, &self.component)
    }
}
