use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::ComponentError;
use crate::id::SessionId;
use crate::manager::ComponentManager;

/// The `component("Name")` callable a page template engine exposes.
///
/// Mounts the named component for the given session and returns its HTML.
/// Failures, panics included, turn into an inert HTML comment so a broken
/// component never aborts the surrounding page render.
#[derive(Clone)]
pub struct ComponentHook {
    manager: Arc<ComponentManager>,
}

impl ComponentHook {
    pub fn new(manager: Arc<ComponentManager>) -> Self {
        Self { manager }
    }

    /// Mount `name` for `session` and return its HTML or an error comment.
    pub fn component(&self, name: &str, session: &SessionId) -> String {
        let name = name.trim();
        if name.is_empty() {
            return "<!-- Error: component name required -->".to_string();
        }

        let mounted = panic::catch_unwind(AssertUnwindSafe(|| self.manager.mount(name, session)));
        let Ok(result) = mounted else {
            tracing::error!(component = name, session = %session, "Component panicked during mount");
            return html_comment("Component error: internal error");
        };

        match result {
            Ok(html) => html,
            Err(e @ (ComponentError::ComponentNotFound(_) | ComponentError::TemplateNotFound(_))) => {
                tracing::error!(component = name, error = %e, "Component could not be mounted");
                html_comment(&e.to_string())
            }
            Err(e) => {
                tracing::error!(component = name, error = %e, "Component error during mount");
                html_comment(&format!("Component error: {e}"))
            }
        }
    }
}

/// Wrap `text` in an HTML comment, defusing any `--` that could close it
/// early.
pub fn html_comment(text: &str) -> String {
    format!("<!-- {} -->", text.replace("--", "- -"))
}
