use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch priority of a receiver: a single integer or an ordered tuple of integers.
///
/// Passed through to the dispatch layer without interpretation. A bare integer `n`
/// normalizes to `(n,)`; the default is the empty tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(Vec<i64>);

impl Priority {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

impl From<i64> for Priority {
    fn from(p: i64) -> Self {
        Priority(vec![p])
    }
}

impl From<i32> for Priority {
    fn from(p: i32) -> Self {
        Priority(vec![p.into()])
    }
}

impl From<Vec<i64>> for Priority {
    fn from(p: Vec<i64>) -> Self {
        Priority(p)
    }
}

impl<const N: usize> From<[i64; N]> for Priority {
    fn from(p: [i64; N]) -> Self {
        Priority(p.to_vec())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_slice() {
            [single] => write!(f, "({},)", single),
            parts => {
                let joined: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "({})", joined.join(", "))
            }
        }
    }
}

/// Introspection record about a registered handler, captured before wrapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnaRecord {
    /// Route as written at registration (trimmed)
    pub route: String,
    pub priority: Priority,
    /// Handler name, the last path segment of its type name
    pub fn_name: String,
    /// Module path the handler was defined in
    pub module: String,
    /// Free-form source or description supplied at registration
    pub source: Option<String>,
    /// How the key is extracted (`field:<name>` or `fn`)
    pub key_by: String,
    /// How the sequence is extracted, if replay protection is on
    pub seq_by: Option<String>,
}

/// Result of delivering one payload to a wrapped handler.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<R> {
    /// The handler ran and returned this value
    Handled(R),
    /// The payload's sequence was not newer than the last accepted one; the handler did not run
    Stale,
}

impl<R> Outcome<R> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Outcome::Stale)
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled(_))
    }

    pub fn into_handled(self) -> Option<R> {
        match self {
            Outcome::Handled(r) => Some(r),
            Outcome::Stale => None,
        }
    }
}
