use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{CacheKey, InstanceCache};
use crate::codec::Snapshot;
use crate::config::CacheConfig;
use crate::error::ComponentError;
use crate::id::{ComponentId, SessionId};
use crate::instance::Instance;
use crate::registry::ComponentRegistry;
use crate::render::{RenderError, Renderer};
use crate::wire::{ComponentRequest, ComponentResponse};

/// Returned when an action targets an instance the cache no longer holds.
pub const EXPIRED_MESSAGE: &str = "Component expired or not found. Please refresh the page.";

/// A cached instance behind its own lock.
pub type SharedInstance = Arc<Mutex<Box<dyn Instance>>>;

/// Orchestrates the component lifecycle: mount, action handling and
/// session teardown.
///
/// # Threading
///
/// `ComponentManager` is `Send + Sync` and is typically wrapped in `Arc` and
/// shared by every request worker. The registry is read-only; the cache
/// synchronizes itself; each cached instance carries its own mutex, so only
/// requests against the same component wait on each other.
pub struct ComponentManager {
    registry: ComponentRegistry,
    cache: InstanceCache<SharedInstance>,
    renderer: Arc<dyn Renderer>,
}

impl ComponentManager {
    /// A manager with a system-clock cache sized from `config`.
    pub fn new(
        registry: ComponentRegistry,
        renderer: Arc<dyn Renderer>,
        config: &CacheConfig,
    ) -> Self {
        Self::with_cache(registry, renderer, InstanceCache::from_config(config))
    }

    /// A manager over a caller-built cache.
    pub fn with_cache(
        registry: ComponentRegistry,
        renderer: Arc<dyn Renderer>,
        cache: InstanceCache<SharedInstance>,
    ) -> Self {
        tracing::info!(
            components = registry.len(),
            max_entries = cache.max_entries(),
            idle_ttl_secs = cache.idle_ttl().as_secs(),
            "Component manager ready"
        );
        Self {
            registry,
            cache,
            renderer,
        }
    }

    /// Construct, cache and render a new instance of `name` for `session`.
    ///
    /// If rendering fails nothing stays cached.
    pub fn mount(&self, name: &str, session: &SessionId) -> Result<String, ComponentError> {
        let factory = self.registry.resolve(name)?;
        let instance = factory.create();
        let id = instance.id().clone();

        let initial = instance.capture();
        let html = self.render(&*instance)?;

        self.cache.put(
            CacheKey::new(session.clone(), id.clone()),
            Arc::new(Mutex::new(instance)),
        );

        tracing::info!(
            component = name,
            component_id = %id,
            session = %session,
            fields = initial.len() - 1,
            "Component mounted"
        );
        Ok(html)
    }

    /// Apply a client action to a cached instance and re-render it.
    ///
    /// Never fails: every problem, including a panicking action, comes back
    /// as a failure response. A failed request leaves the instance exactly
    /// as it was before the request.
    pub fn handle_action(&self, request: ComponentRequest, session: &SessionId) -> ComponentResponse {
        let key = CacheKey::new(session.clone(), ComponentId::from(request.component_id.as_str()));

        let Some(shared) = self.cache.get_if_present(&key) else {
            tracing::warn!(
                component_id = %request.component_id,
                session = %session,
                action = %request.action,
                "Action for expired or unknown component"
            );
            return ComponentResponse::error(EXPIRED_MESSAGE);
        };

        let mut instance = shared.lock();
        let checkpoint = instance.capture();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_action(&mut **instance, &request)
        }));

        match outcome {
            Ok(Ok((html, state))) => {
                tracing::debug!(
                    component = instance.component_name(),
                    component_id = %request.component_id,
                    action = %request.action,
                    "Action applied"
                );
                ComponentResponse::success(html, state)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    component = instance.component_name(),
                    component_id = %request.component_id,
                    action = %request.action,
                    error = %e,
                    "Action failed, state rolled back"
                );
                roll_back(&mut **instance, &checkpoint);
                ComponentResponse::error(format!("Action failed: {e}"))
            }
            Err(_) => {
                tracing::error!(
                    component = instance.component_name(),
                    component_id = %request.component_id,
                    action = %request.action,
                    "Action panicked, state rolled back"
                );
                roll_back(&mut **instance, &checkpoint);
                ComponentResponse::error("Action failed: internal error")
            }
        }
    }

    /// Evict every instance mounted under `session`.
    pub fn clear_session(&self, session: &SessionId) -> usize {
        let removed = self.cache.remove_session(session);
        tracing::info!(session = %session, removed, "Session components cleared");
        removed
    }

    /// Drop instances past their idle TTL. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let purged = self.cache.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, "Expired components purged");
        }
        purged
    }

    /// Live instances across all sessions, expired ones possibly included.
    pub fn active_component_count(&self) -> usize {
        self.cache.approximate_size()
    }

    /// Registered component types.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    fn run_action(
        &self,
        instance: &mut dyn Instance,
        request: &ComponentRequest,
    ) -> Result<(String, Snapshot), ComponentError> {
        instance.hydrate(&request.state)?;
        instance.dispatch(&request.action, &request.params)?;
        let state = instance.capture();
        let html = self.render(instance)?;
        Ok((html, state))
    }

    fn render(&self, instance: &dyn Instance) -> Result<String, ComponentError> {
        let context = instance.render_context();
        self.renderer
            .render(instance.template(), &context)
            .map_err(|e| match e {
                RenderError::TemplateNotFound(path) => ComponentError::TemplateNotFound(path),
                RenderError::Failed(reason) => ComponentError::Render {
                    component: instance.component_name().to_string(),
                    reason,
                },
            })
    }
}

fn roll_back(instance: &mut dyn Instance, checkpoint: &Snapshot) {
    if let Err(e) = instance.restore(checkpoint) {
        tracing::error!(
            component = instance.component_name(),
            component_id = %instance.id(),
            error = %e,
            "Could not restore component state"
        );
    }
}
