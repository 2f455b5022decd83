use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use thiserror::Error;

/// Declared type of a state field or action parameter, as far as coercion
/// of client-supplied values is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    Float,
    Boolean,
    Text,
    /// Structured or opaque values. Coercion passes them through unchanged.
    Any,
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeTag::Integer => write!(f, "integer"),
            TypeTag::Float => write!(f, "float"),
            TypeTag::Boolean => write!(f, "boolean"),
            TypeTag::Text => write!(f, "text"),
            TypeTag::Any => write!(f, "any"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("cannot parse {input:?} as {target}")]
    Parse { input: String, target: TypeTag },

    #[error("cannot convert {kind} to {target}")]
    Unsupported { kind: &'static str, target: TypeTag },

    #[error("{value} is not a finite number")]
    NonFinite { value: String },

    #[error("value does not fit the declared type: {0}")]
    Mismatch(String),
}

/// Coerce a client-supplied value toward `target`.
///
/// `null` is returned as-is for every target; whether it is acceptable is
/// decided by the typed assignment that follows.
pub fn coerce(value: Value, target: TypeTag) -> Result<Value, CoercionError> {
    if value.is_null() {
        return Ok(value);
    }

    match target {
        TypeTag::Integer => to_integer(value),
        TypeTag::Float => to_float(value),
        // Anything that is not a case-insensitive "true" becomes false.
        TypeTag::Boolean => match value {
            Value::Bool(_) => Ok(value),
            other => Ok(Value::Bool(stringify(other).eq_ignore_ascii_case("true"))),
        },
        TypeTag::Text => Ok(Value::String(stringify(value))),
        TypeTag::Any => Ok(value),
    }
}

/// String form used by the text and boolean rules: strings verbatim,
/// everything else as compact JSON.
pub fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn to_integer(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            float_to_integer(f, &n.to_string())
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::from(i))
            } else if let Ok(u) = trimmed.parse::<u64>() {
                Ok(Value::from(u))
            } else {
                Err(CoercionError::Parse {
                    input: s,
                    target: TypeTag::Integer,
                })
            }
        }
        other => Err(CoercionError::Unsupported {
            kind: kind_of(&other),
            target: TypeTag::Integer,
        }),
    }
}

fn float_to_integer(f: f64, display: &str) -> Result<Value, CoercionError> {
    if !f.is_finite() {
        return Err(CoercionError::NonFinite {
            value: display.to_string(),
        });
    }
    let truncated = f.trunc();
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Ok(Value::from(truncated as i64))
    } else {
        Err(CoercionError::Mismatch(format!("{display} is out of integer range")))
    }
}

fn to_float(value: Value) -> Result<Value, CoercionError> {
    match value {
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            finite_number(f, &n.to_string())
        }
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) => finite_number(f, &s),
            Err(_) => Err(CoercionError::Parse {
                input: s,
                target: TypeTag::Float,
            }),
        },
        other => Err(CoercionError::Unsupported {
            kind: kind_of(&other),
            target: TypeTag::Float,
        }),
    }
}

fn finite_number(f: f64, display: &str) -> Result<Value, CoercionError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| CoercionError::NonFinite {
            value: display.to_string(),
        })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A Rust type usable as a state field or action parameter.
///
/// Numeric, boolean and string types come with the matching [`TypeTag`];
/// any other serde type can opt in with the default `Any` tag:
///
/// ```
/// use kiln_core::coerce::StateValue;
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// struct Filter {
///     query: String,
/// }
///
/// impl StateValue for Filter {}
/// ```
pub trait StateValue: Serialize + DeserializeOwned + Send + 'static {
    const TAG: TypeTag = TypeTag::Any;
}

macro_rules! state_value {
    ($tag:expr => $($ty:ty),+ $(,)?) => {
        $(impl StateValue for $ty {
            const TAG: TypeTag = $tag;
        })+
    };
}

state_value!(TypeTag::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
state_value!(TypeTag::Float => f32, f64);
state_value!(TypeTag::Boolean => bool);
state_value!(TypeTag::Text => String);

impl<T: StateValue> StateValue for Option<T> {
    const TAG: TypeTag = T::TAG;
}

impl<T: StateValue> StateValue for Vec<T> {}

impl StateValue for Value {}

/// Coerce `value` toward `T`'s tag, then deserialize it into `T`.
pub fn decode<T: StateValue>(value: Value) -> Result<T, CoercionError> {
    let coerced = coerce(value, T::TAG)?;
    serde_json::from_value(coerced).map_err(|e| CoercionError::Mismatch(e.to_string()))
}

/// Serialize a state value for snapshots and render contexts.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "State value could not be serialized, using null");
        Value::Null
    })
}
