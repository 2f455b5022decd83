use std::sync::Arc;

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName};
use axum::response::{AppendHeaders, Html};
use axum::routing::{delete, get, post};
use kiln_core::{ComponentHook, ComponentManager, ComponentRequest, ComponentResponse, SessionId};
use serde_json::{Value, json};

/// Cookie carrying the caller's session id.
pub const SESSION_COOKIE: &str = "kiln_session";

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    manager: Arc<ComponentManager>,
    hook: ComponentHook,
}

impl AppState {
    pub fn new(manager: Arc<ComponentManager>) -> Self {
        let hook = ComponentHook::new(Arc::clone(&manager));
        Self { manager, hook }
    }
}

/// The HTTP surface over `manager`.
pub fn router(manager: Arc<ComponentManager>) -> Router {
    Router::new()
        .route("/kiln/components", post(component_action))
        .route("/kiln/components/{name}", get(mount_component))
        .route("/kiln/session", delete(clear_session))
        .route("/health", get(health))
        .with_state(AppState::new(manager))
}

/// `Set-Cookie` header for a newly issued session, or nothing.
type SetCookie = AppendHeaders<Vec<(HeaderName, String)>>;

/// Session id from the `kiln_session` cookie, if the caller sent a usable one.
///
/// Blank values and the reserved anonymous id are ignored, so no client can
/// join the shared anonymous session through the cookie.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
        .map(SessionId::new)
        .filter(|session| !session.is_anonymous())
}

/// `kiln_session` cookie value for `session`.
pub fn session_cookie(session: &SessionId) -> String {
    format!("{SESSION_COOKIE}={session}; HttpOnly; Path=/; SameSite=Lax")
}

/// The caller's session, or a fresh one plus the cookie that carries it.
fn session_or_issue(headers: &HeaderMap) -> (SessionId, SetCookie) {
    match session_from_headers(headers) {
        Some(session) => (session, AppendHeaders(Vec::new())),
        None => {
            let session = SessionId::generate();
            tracing::debug!(session = %session, "Issued new session");
            let cookie = session_cookie(&session);
            (session, AppendHeaders(vec![(SET_COOKIE, cookie)]))
        }
    }
}

/// POST /kiln/components - run an action against a mounted component
///
/// Always answers 200; failures are reported in the body.
async fn component_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (SetCookie, Json<ComponentResponse>) {
    let (session, set_cookie) = session_or_issue(&headers);
    let request: ComponentRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed component request");
            return (
                set_cookie,
                Json(ComponentResponse::error(format!("Server error: {e}"))),
            );
        }
    };

    let manager = Arc::clone(&state.manager);
    let response =
        tokio::task::spawn_blocking(move || manager.handle_action(request, &session)).await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Component action task failed");
            ComponentResponse::error(format!("Server error: {e}"))
        }
    };
    (set_cookie, Json(response))
}

/// GET /kiln/components/{name} - mount a component and return its HTML
async fn mount_component(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> (SetCookie, Html<String>) {
    let (session, set_cookie) = session_or_issue(&headers);
    let hook = state.hook.clone();
    let html = tokio::task::spawn_blocking(move || hook.component(&name, &session)).await;

    let html = match html {
        Ok(html) => html,
        Err(e) => {
            tracing::error!(error = %e, "Component mount task failed");
            kiln_core::hook::html_comment(&format!("Component error: {e}"))
        }
    };
    (set_cookie, Html(html))
}

/// DELETE /kiln/session - drop every component of the caller's session
///
/// A caller without a session cookie owns nothing, so nothing is removed.
async fn clear_session(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let removed = match session_from_headers(&headers) {
        Some(session) => state.manager.clear_session(&session),
        None => 0,
    };
    Json(json!({ "removed": removed }))
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "kiln",
        "active_components": state.manager.active_component_count(),
    }))
}
