use thiserror::Error;

use crate::coerce::CoercionError;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Component not found: {0}. Make sure it is registered before the manager is built.")]
    ComponentNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Action '{action}' taking {arity} parameter(s) not found in component '{component}'")]
    ActionNotFound {
        component: String,
        action: String,
        arity: usize,
    },

    #[error("Field '{field}' not found or not declared as state in component '{component}'")]
    FieldNotFound { component: String, field: String },

    #[error("Failed to hydrate state field '{field}': {source}")]
    StateHydration {
        field: String,
        #[source]
        source: CoercionError,
    },

    #[error("Invalid parameter {index} for action '{action}': {source}")]
    Coercion {
        action: String,
        index: usize,
        #[source]
        source: CoercionError,
    },

    #[error("Action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },

    #[error("Failed to render component '{component}': {reason}")]
    Render { component: String, reason: String },
}
