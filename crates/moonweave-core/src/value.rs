//! Declared slot types and call-time value marshalling.
//!
//! Key and argument slots are bound positionally at render time, but the
//! values supplied for them at call time are converted according to the
//! declared [`ValueType`]: integers become numeric literals, booleans become
//! `1`/`0`, and structured values round-trip through JSON.

use std::fmt;

use serde_json::Value;

use crate::error::MarshalError;

/// The value type a `%arg` or `%return` declaration can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Pass-through text.
    String,
    /// Numeric value, decoded with `tonumber` on the script side.
    Integer,
    /// Truthiness of a numeric value, encoded as `1`/`0`.
    Boolean,
    /// A JSON-encoded array, decoded with `cjson.decode` on the script side.
    List,
    /// A JSON-encoded object, decoded with `cjson.decode` on the script side.
    Dict,
}

impl ValueType {
    /// Parse a directive type token.
    ///
    /// Accepts the canonical names and their aliases (`str`, `int`, `bool`,
    /// `array`, `dictionary`). Returns `None` for an unknown token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "str" | "string" => Some(ValueType::String),
            "int" | "integer" => Some(ValueType::Integer),
            "bool" | "boolean" => Some(ValueType::Boolean),
            "list" | "array" => Some(ValueType::List),
            "dict" | "dictionary" => Some(ValueType::Dict),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::String => "string",
            ValueType::Integer => "integer",
            ValueType::Boolean => "boolean",
            ValueType::List => "list",
            ValueType::Dict => "dict",
        };
        write!(f, "{name}")
    }
}

/// A `%pragma` directive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pragma {
    /// The fragment is rendered at most once per top-level render.
    Once,
}

impl Pragma {
    /// Parse a directive pragma token. Returns `None` for an unknown value.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "once" => Some(Pragma::Once),
            _ => None,
        }
    }
}

impl fmt::Display for Pragma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pragma::Once => write!(f, "once"),
        }
    }
}

/// Encode a caller-supplied value for an argument slot of the given type.
///
/// The execution collaborator receives every argument as text; the declared
/// type selects the wire form:
///
/// - `integer` → the numeric literal
/// - `boolean` → `1` or `0` from the value's truthiness
/// - `list`/`dict` → JSON
/// - `string` → the literal text
pub fn encode_argument(value_type: ValueType, value: &Value) -> Result<String, MarshalError> {
    match value_type {
        ValueType::Integer => as_integer(value).map(|n| n.to_string()),
        ValueType::Boolean => Ok(if is_truthy(value) { "1" } else { "0" }.to_string()),
        ValueType::List => match value {
            Value::Array(_) => Ok(serde_json::to_string(value)?),
            other => Err(MarshalError::WrongShape {
                value: other.to_string(),
                expected: "list",
            }),
        },
        ValueType::Dict => match value {
            Value::Object(_) => Ok(serde_json::to_string(value)?),
            other => Err(MarshalError::WrongShape {
                value: other.to_string(),
                expected: "dict",
            }),
        },
        ValueType::String => Ok(as_text(value)),
    }
}

/// Encode a caller-supplied value for a key slot.
///
/// Keys carry no declared type and are always passed as literal text.
pub fn encode_key(value: &Value) -> String {
    as_text(value)
}

/// Decode a value returned by the execution collaborator.
///
/// The inverse of [`encode_argument`], driven by the fragment's declared
/// return type. With no declared type the raw value passes through
/// unchanged.
pub fn decode_return(value_type: Option<ValueType>, value: Value) -> Result<Value, MarshalError> {
    let Some(value_type) = value_type else {
        return Ok(value);
    };

    match value_type {
        ValueType::String => Ok(Value::String(as_text(&value))),
        ValueType::Integer => as_integer(&value).map(Value::from),
        ValueType::Boolean => Ok(Value::Bool(is_truthy(&value))),
        ValueType::List | ValueType::Dict => match value {
            Value::String(text) => Ok(serde_json::from_str(&text)?),
            structured @ (Value::Array(_) | Value::Object(_)) => Ok(structured),
            other => Err(MarshalError::WrongShape {
                value: other.to_string(),
                expected: if value_type == ValueType::List {
                    "list"
                } else {
                    "dict"
                },
            }),
        },
    }
}

fn as_integer(value: &Value) -> Result<i64, MarshalError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| MarshalError::NotAnInteger {
            value: n.to_string(),
        }),
        Value::String(s) => s.trim().parse().map_err(|_| MarshalError::NotAnInteger {
            value: s.clone(),
        }),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(MarshalError::NotAnInteger {
            value: other.to_string(),
        }),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
