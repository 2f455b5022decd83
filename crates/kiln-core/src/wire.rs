use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::codec::Snapshot;

/// Inbound action request, as posted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRequest {
    pub component_id: String,
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: Snapshot,
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: Vec<Value>,
}

/// An explicit `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ComponentRequest {
    pub fn new(component_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            action: action.into(),
            state: Snapshot::new(),
            params: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: Snapshot) -> Self {
        self.state = state;
        self
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

/// Outcome of an action request.
///
/// On the wire this is a flat object with a `success` flag; exactly one of
/// `html` + `state` or `error` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub enum ComponentResponse {
    Success { html: String, state: Snapshot },
    Failure { error: String },
}

impl ComponentResponse {
    /// A success response carrying rendered HTML and the new state.
    pub fn success(html: String, state: Snapshot) -> Self {
        Self::Success { html, state }
    }

    /// A failure response carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Failure {
            error: message.into(),
        }
    }

    /// Whether this is a success response.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Rendered HTML of a success response.
    pub fn html(&self) -> Option<&str> {
        match self {
            Self::Success { html, .. } => Some(html),
            Self::Failure { .. } => None,
        }
    }

    /// State snapshot of a success response.
    pub fn state(&self) -> Option<&Snapshot> {
        match self {
            Self::Success { state, .. } => Some(state),
            Self::Failure { .. } => None,
        }
    }

    /// Message of a failure response.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<ComponentResponse> for WireResponse {
    fn from(response: ComponentResponse) -> Self {
        match response {
            ComponentResponse::Success { html, state } => Self {
                success: true,
                html: Some(html),
                state: Some(state),
                error: None,
            },
            ComponentResponse::Failure { error } => Self {
                success: false,
                html: None,
                state: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<WireResponse> for ComponentResponse {
    type Error = String;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        if wire.success {
            let html = wire.html.ok_or("successful response without html")?;
            Ok(Self::Success {
                html,
                state: wire.state.unwrap_or_default(),
            })
        } else {
            Ok(Self::Failure {
                error: wire.error.unwrap_or_default(),
            })
        }
    }
}
