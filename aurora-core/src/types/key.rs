use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ExtractionError;

/// Identifies the logical entity a payload concerns (a player, an account, a session).
///
/// Keys are hashable and equality-comparable. Composite keys are tuples.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Bool(bool),
    Int(i128),
    Str(String),
    Tuple(Vec<Key>),
}

impl Key {
    /// Converts a JSON value into a key.
    ///
    /// Arrays become tuples. Floats, `null` and objects are rejected.
    pub fn from_value(value: &Value) -> Result<Self, ExtractionError> {
        match value {
            Value::Bool(b) => Ok(Key::Bool(*b)),
            Value::String(s) => Ok(Key::Str(s.clone())),
            Value::Number(n) => integer(n)
                .map(Key::Int)
                .ok_or(ExtractionError::UnhashableKey { found: "float" }),
            Value::Array(items) => items
                .iter()
                .map(Key::from_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Key::Tuple),
            other => Err(ExtractionError::UnhashableKey {
                found: value_kind(other),
            }),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{}", s),
            Key::Tuple(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i.into())
    }
}

impl From<u64> for Key {
    fn from(i: u64) -> Self {
        Key::Int(i.into())
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i.into())
    }
}

impl From<Vec<Key>> for Key {
    fn from(parts: Vec<Key>) -> Self {
        Key::Tuple(parts)
    }
}

impl<A: Into<Key>, B: Into<Key>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Key>, B: Into<Key>, C: Into<Key>> From<(A, B, C)> for Key {
    fn from((a, b, c): (A, B, C)) -> Self {
        Key::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

/// A key scoped to the route it was extracted on.
///
/// Equal keys under different routes never share a lock or sequence state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub route: Arc<str>,
    pub key: Key,
}

impl RouteKey {
    pub fn new(route: impl Into<Arc<str>>, key: impl Into<Key>) -> Self {
        Self {
            route: route.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.route, self.key)
    }
}

/// A totally-ordered delivery sequence used to detect stale or duplicate payloads.
///
/// Integers order before strings when the two kinds are mixed on one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Sequence {
    Int(i128),
    Text(String),
}

impl Sequence {
    pub fn from_value(value: &Value) -> Result<Self, ExtractionError> {
        match value {
            Value::String(s) => Ok(Sequence::Text(s.clone())),
            Value::Number(n) => integer(n)
                .map(Sequence::Int)
                .ok_or(ExtractionError::UnorderedSequence { found: "float" }),
            other => Err(ExtractionError::UnorderedSequence {
                found: value_kind(other),
            }),
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sequence::Int(i) => write!(f, "{}", i),
            Sequence::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Sequence {
    fn from(i: i64) -> Self {
        Sequence::Int(i.into())
    }
}

impl From<u64> for Sequence {
    fn from(i: u64) -> Self {
        Sequence::Int(i.into())
    }
}

impl From<i32> for Sequence {
    fn from(i: i32) -> Self {
        Sequence::Int(i.into())
    }
}

impl From<&str> for Sequence {
    fn from(s: &str) -> Self {
        Sequence::Text(s.to_string())
    }
}

impl From<String> for Sequence {
    fn from(s: String) -> Self {
        Sequence::Text(s)
    }
}

fn integer(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Short name of a JSON value's kind, used in extraction errors.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
