//! End-to-end lifecycle tests for the component manager: mount, actions,
//! expiry, rollback, session teardown and the template hook.

use std::sync::Arc;
use std::time::Duration;

use kiln_core::cache::{InstanceCache, ManualClock};
use kiln_core::manager::EXPIRED_MESSAGE;
use kiln_core::render::{RenderContext, RenderError, Renderer};
use kiln_core::{
    ComponentError, ComponentHook, ComponentManager, ComponentRegistry, ComponentRequest,
    LiveComponent, RuntimeConfig, SchemaBuilder, SessionId, Snapshot,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Counter {
    count: i64,
    step: i64,
}

impl LiveComponent for Counter {
    fn template(&self) -> &str {
        "counter.html"
    }

    fn schema(schema: &mut SchemaBuilder<Self>) {
        schema
            .state("count", |c| &c.count, |c| &mut c.count)
            .state("step", |c| &c.step, |c| &mut c.step)
            .action("increment", |c| c.count += 1)
            .action1("add", |c, n: i64| c.count += n)
            .action("fail", |c| -> Result<(), String> {
                c.count = 999;
                Err("nope".into())
            })
            .action("explode", |c| {
                c.count = -1;
                assert!(c.count >= 0, "handler blew up");
            })
            .accessor("doubled", |c| c.count * 2);
    }
}

#[derive(Default)]
struct Orphan;

impl LiveComponent for Orphan {
    fn template(&self) -> &str {
        "missing.html"
    }

    fn schema(_schema: &mut SchemaBuilder<Self>) {}
}

#[derive(Default)]
struct Fragile {
    n: i64,
}

impl LiveComponent for Fragile {
    fn template(&self) -> &str {
        "counter.html"
    }

    fn schema(schema: &mut SchemaBuilder<Self>) {
        schema
            .state("n", |c| &c.n, |c| &mut c.n)
            .accessor("getRatio", |c| 10 / c.n);
    }
}

/// Renders `id=<id>;count=<count>;doubled=<doubled>`, or fails for any
/// template other than `counter.html`.
fn renderer() -> Arc<dyn Renderer> {
    Arc::new(
        |template: &str, context: &RenderContext| -> Result<String, RenderError> {
            if template != "counter.html" {
                return Err(RenderError::TemplateNotFound(template.to_string()));
            }
            let id = context.get("_id").and_then(Value::as_str).unwrap_or_default();
            Ok(format!(
                "id={id};count={};doubled={}",
                context["count"], context["doubled"]
            ))
        },
    )
}

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register::<Counter>("Counter");
    registry.register::<Orphan>("Orphan");
    registry.register::<Fragile>("Fragile");
    registry
}

fn manager() -> ComponentManager {
    ComponentManager::new(registry(), renderer(), &RuntimeConfig::default().cache)
}

fn component_id(html: &str) -> String {
    html.split(';')
        .next()
        .and_then(|part| part.strip_prefix("id="))
        .unwrap()
        .to_string()
}

fn state(value: Value) -> Snapshot {
    value.as_object().unwrap().clone()
}

#[test]
fn mount_then_increment() {
    let manager = manager();
    let session = SessionId::new("s1");

    let html = manager.mount("Counter", &session).unwrap();
    assert!(html.contains("count=0"));
    assert!(html.contains("doubled=0"));
    assert_eq!(manager.active_component_count(), 1);

    let id = component_id(&html);
    let response = manager.handle_action(
        ComponentRequest::new(id.clone(), "increment").with_state(state(json!({"count": "0"}))),
        &session,
    );

    assert!(response.is_success(), "{response:?}");
    let new_state = response.state().unwrap();
    assert_eq!(new_state["count"], json!(1));
    assert_eq!(new_state["_id"], json!(id));
    assert!(response.html().unwrap().contains("doubled=2"));
}

#[test]
fn client_state_is_hydrated_before_dispatch() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(
        ComponentRequest::new(id, "add")
            .with_state(state(json!({"count": 10, "step": "3"})))
            .with_params(vec![json!("5")]),
        &session,
    );

    let new_state = response.state().unwrap();
    assert_eq!(new_state["count"], json!(15));
    assert_eq!(new_state["step"], json!(3));
}

#[test]
fn update_field_assigns_directly() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(
        ComponentRequest::new(id, "updateField_count").with_params(vec![json!(5)]),
        &session,
    );

    assert_eq!(response.state().unwrap()["count"], json!(5));
}

#[test]
fn refresh_rerenders_without_changes() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(ComponentRequest::new(id, "__refresh"), &session);
    assert!(response.html().unwrap().contains("count=0"));
}

#[test]
fn unknown_component_id_reports_expiry() {
    let manager = manager();
    let response = manager.handle_action(
        ComponentRequest::new("no-such-id", "increment"),
        &SessionId::new("s1"),
    );
    assert_eq!(response.error_message(), Some(EXPIRED_MESSAGE));
}

#[test]
fn component_is_invisible_to_other_sessions() {
    let manager = manager();
    let id = component_id(&manager.mount("Counter", &SessionId::new("s1")).unwrap());

    let response =
        manager.handle_action(ComponentRequest::new(id, "increment"), &SessionId::new("s2"));
    assert_eq!(response.error_message(), Some(EXPIRED_MESSAGE));
}

#[test]
fn unknown_action_is_an_error_response() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(ComponentRequest::new(id.clone(), "jump"), &session);
    let message = response.error_message().unwrap();
    assert!(message.starts_with("Action failed:"), "{message}");
    assert!(message.contains("jump"), "{message}");

    // wrong arity is just as unknown
    let response = manager.handle_action(ComponentRequest::new(id, "add"), &session);
    assert!(!response.is_success());
}

#[test]
fn failed_action_rolls_back() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(
        ComponentRequest::new(id.clone(), "fail").with_state(state(json!({"count": 7}))),
        &session,
    );
    assert_eq!(
        response.error_message(),
        Some("Action failed: Action 'fail' failed: nope")
    );

    let response = manager.handle_action(ComponentRequest::new(id, "__refresh"), &session);
    assert_eq!(response.state().unwrap()["count"], json!(0));
}

#[test]
fn bad_client_state_rolls_back() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(
        ComponentRequest::new(id.clone(), "increment")
            .with_state(state(json!({"step": 4, "count": "abc"}))),
        &session,
    );
    assert!(response.error_message().unwrap().contains("count"));

    let response = manager.handle_action(ComponentRequest::new(id, "__refresh"), &session);
    let restored = response.state().unwrap();
    assert_eq!(restored["count"], json!(0));
    assert_eq!(restored["step"], json!(0));
}

#[test]
fn panicking_action_rolls_back() {
    let manager = manager();
    let session = SessionId::new("s1");
    let id = component_id(&manager.mount("Counter", &session).unwrap());

    let response = manager.handle_action(ComponentRequest::new(id.clone(), "explode"), &session);
    assert_eq!(response.error_message(), Some("Action failed: internal error"));

    // the instance stays usable
    let response = manager.handle_action(ComponentRequest::new(id, "increment"), &session);
    assert_eq!(response.state().unwrap()["count"], json!(1));
}

#[test]
fn mount_errors() {
    let manager = manager();
    let session = SessionId::new("s1");

    let err = manager.mount("Nope", &session).unwrap_err();
    assert!(matches!(err, ComponentError::ComponentNotFound(name) if name == "Nope"));

    let err = manager.mount("Orphan", &session).unwrap_err();
    assert!(matches!(err, ComponentError::TemplateNotFound(path) if path == "missing.html"));
    assert_eq!(manager.active_component_count(), 0);
}

#[test]
fn clear_session_only_touches_that_session() {
    let manager = manager();
    let alice = SessionId::new("alice");
    let bob = SessionId::new("bob");

    manager.mount("Counter", &alice).unwrap();
    manager.mount("Counter", &alice).unwrap();
    let bobs = component_id(&manager.mount("Counter", &bob).unwrap());

    assert_eq!(manager.clear_session(&alice), 2);
    assert_eq!(manager.active_component_count(), 1);

    let response = manager.handle_action(ComponentRequest::new(bobs, "increment"), &bob);
    assert!(response.is_success());
}

#[test]
fn idle_components_expire() {
    let clock = Arc::new(ManualClock::new());
    let cache = InstanceCache::with_clock(100, Duration::from_secs(60), clock.clone());
    let manager = ComponentManager::with_cache(registry(), renderer(), cache);
    let session = SessionId::new("s1");

    let id = component_id(&manager.mount("Counter", &session).unwrap());
    clock.advance(Duration::from_secs(30));
    let response = manager.handle_action(ComponentRequest::new(id.clone(), "increment"), &session);
    assert!(response.is_success());

    clock.advance(Duration::from_secs(60));
    let response = manager.handle_action(ComponentRequest::new(id, "increment"), &session);
    assert_eq!(response.error_message(), Some(EXPIRED_MESSAGE));
}

#[test]
fn purge_reports_expired_components() {
    let clock = Arc::new(ManualClock::new());
    let cache = InstanceCache::with_clock(100, Duration::from_secs(60), clock.clone());
    let manager = ComponentManager::with_cache(registry(), renderer(), cache);
    let session = SessionId::new("s1");

    manager.mount("Counter", &session).unwrap();
    manager.mount("Counter", &session).unwrap();
    clock.advance(Duration::from_secs(61));

    assert_eq!(manager.purge_expired(), 2);
    assert_eq!(manager.active_component_count(), 0);
}

#[test]
fn capacity_evicts_oldest_component() {
    let cache = InstanceCache::new(2, Duration::from_secs(3600));
    let manager = ComponentManager::with_cache(registry(), renderer(), cache);
    let session = SessionId::new("s1");

    let first = component_id(&manager.mount("Counter", &session).unwrap());
    manager.mount("Counter", &session).unwrap();
    manager.mount("Counter", &session).unwrap();

    assert_eq!(manager.active_component_count(), 2);
    let response = manager.handle_action(ComponentRequest::new(first, "increment"), &session);
    assert_eq!(response.error_message(), Some(EXPIRED_MESSAGE));
}

#[test]
fn hook_contains_panics_during_mount() {
    let manager = Arc::new(manager());
    let hook = ComponentHook::new(Arc::clone(&manager));

    let html = hook.component("Fragile", &SessionId::anonymous());
    assert_eq!(html, "<!-- Component error: internal error -->");
    assert_eq!(manager.active_component_count(), 0);

    // the hook keeps working afterwards
    assert!(hook.component("Counter", &SessionId::anonymous()).contains("count=0"));
}

#[test]
fn hook_turns_mount_errors_into_comments() {
    let hook = ComponentHook::new(Arc::new(manager()));
    let session = SessionId::new("s1");

    assert_eq!(hook.component("  ", &session), "<!-- Error: component name required -->");
    assert!(hook.component("Nope", &session).starts_with("<!-- Component not found: Nope"));
    assert_eq!(
        hook.component("Orphan", &session),
        "<!-- Template not found: missing.html -->"
    );
}
