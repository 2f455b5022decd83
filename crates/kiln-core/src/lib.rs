//! Live component runtime for Kiln.
//!
//! Keeps small pieces of UI state alive on the server between stateless
//! HTTP requests. Clients post named actions against a mounted component;
//! the runtime hydrates the instance from client-held state, dispatches the
//! action, captures the new state and re-renders the component.
//!
//! [`ComponentManager`] is the single entry point for the HTTP layer.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kiln_core::render::{RenderContext, RenderError};
//! use kiln_core::schema::{LiveComponent, SchemaBuilder};
//! use kiln_core::{
//!     ComponentManager, ComponentRegistry, ComponentRequest, RuntimeConfig, SessionId,
//! };
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! impl LiveComponent for Counter {
//!     fn template(&self) -> &str {
//!         "components/counter.html"
//!     }
//!
//!     fn schema(schema: &mut SchemaBuilder<Self>) {
//!         schema
//!             .state("count", |c| &c.count, |c| &mut c.count)
//!             .action("increment", |c| c.count += 1);
//!     }
//! }
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register::<Counter>("Counter");
//!
//! let renderer = |_template: &str, context: &RenderContext| -> Result<String, RenderError> {
//!     Ok(format!("<span>count={}</span>", context["count"]))
//! };
//! let manager = ComponentManager::new(
//!     registry,
//!     Arc::new(renderer),
//!     &RuntimeConfig::default().cache,
//! );
//!
//! let session = SessionId::new("s1");
//! let html = manager.mount("Counter", &session)?;
//! # let component_id = String::new();
//!
//! let response = manager.handle_action(
//!     ComponentRequest::new(component_id, "increment"),
//!     &session,
//! );
//! # let _ = (html, response);
//! # Ok::<(), kiln_core::ComponentError>(())
//! ```

pub mod cache;
pub mod codec;
pub mod coerce;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod hook;
pub mod id;
pub mod instance;
pub mod manager;
pub mod registry;
pub mod render;
pub mod schema;
pub mod wire;

pub use codec::Snapshot;
pub use config::{CacheConfig, ConfigError, RuntimeConfig};
pub use error::ComponentError;
pub use hook::ComponentHook;
pub use id::{ComponentId, SessionId};
pub use manager::ComponentManager;
pub use registry::ComponentRegistry;
pub use schema::{LiveComponent, SchemaBuilder};
pub use wire::{ComponentRequest, ComponentResponse};
