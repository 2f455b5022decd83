//! HTTP front end for the Kiln component runtime.
//!
//! Exposes the action endpoint, a mount endpoint backed by
//! [`kiln_core::ComponentHook`], session teardown and a health probe, plus a
//! file-based renderer and two demo components.

pub mod components;
pub mod config;
pub mod renderer;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use renderer::FileRenderer;
pub use routes::router;
