use serde::{Deserialize, Serialize};

/// Session identifier used when the caller has no session.
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Identity of one mounted component instance. Generated once at
/// construction and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// A fresh random (v4 uuid) identity.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque session identifier supplied by the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random session id, for callers that have none yet.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The shared session used when no session is available.
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_SESSION.to_string())
    }

    /// Map a possibly-missing session to an id. Absent or blank sessions
    /// share the reserved anonymous id.
    pub fn from_option(id: Option<&str>) -> Self {
        match id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::new(id),
            _ => Self::anonymous(),
        }
    }

    /// Whether this is the shared anonymous session.
    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_SESSION
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
