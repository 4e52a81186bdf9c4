//! Key and sequence extraction from payloads.
//!
//! An extractor is either a field name, resolved against the payload through
//! [`Payload::field`], or a function computing the value directly.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ExtractionError;
use crate::types::{Key, Sequence, value_kind};

/// Named-field access on a payload.
///
/// Generic JSON payloads resolve fields as map lookups. Structured payload types
/// implement this to expose their attributes by name.
pub trait Payload {
    fn field(&self, name: &str) -> Result<Cow<'_, Value>, ExtractionError>;
}

impl Payload for Value {
    fn field(&self, name: &str) -> Result<Cow<'_, Value>, ExtractionError> {
        match self {
            Value::Object(map) => map
                .get(name)
                .map(Cow::Borrowed)
                .ok_or_else(|| ExtractionError::missing_field(name)),
            other => Err(ExtractionError::NotAMapping {
                field: name.to_string(),
                found: value_kind(other),
            }),
        }
    }
}

impl<P: Payload + ?Sized> Payload for Arc<P> {
    fn field(&self, name: &str) -> Result<Cow<'_, Value>, ExtractionError> {
        (**self).field(name)
    }
}

/// Values that can be read out of a payload field.
pub trait FromField: Sized {
    fn from_field(value: &Value) -> Result<Self, ExtractionError>;
}

impl FromField for Key {
    fn from_field(value: &Value) -> Result<Self, ExtractionError> {
        Key::from_value(value)
    }
}

impl FromField for Sequence {
    fn from_field(value: &Value) -> Result<Self, ExtractionError> {
        Sequence::from_value(value)
    }
}

type ExtractFn<P, T> = Arc<dyn Fn(&P) -> Result<T, ExtractionError> + Send + Sync>;

/// How to pull a `T` out of a payload `P`.
pub enum Extractor<P, T> {
    Field(String),
    Func(ExtractFn<P, T>),
}

/// Extracts the lock key.
pub type KeyBy<P> = Extractor<P, Key>;

/// Extracts the replay sequence.
pub type SeqBy<P> = Extractor<P, Sequence>;

impl<P, T> Extractor<P, T> {
    pub fn field(name: impl Into<String>) -> Self {
        Extractor::Field(name.into())
    }

    /// Wraps an infallible function.
    pub fn func<F, V>(f: F) -> Self
    where
        F: Fn(&P) -> V + Send + Sync + 'static,
        V: Into<T> + 'static,
        P: 'static,
        T: 'static,
    {
        Extractor::Func(Arc::new(move |payload: &P| Ok(f(payload).into())))
    }

    /// Wraps a function that may reject the payload.
    pub fn try_func<F>(f: F) -> Self
    where
        F: Fn(&P) -> Result<T, ExtractionError> + Send + Sync + 'static,
    {
        Extractor::Func(Arc::new(f))
    }

    /// Short form for introspection records.
    pub fn describe(&self) -> String {
        match self {
            Extractor::Field(name) => format!("field:{}", name),
            Extractor::Func(_) => "fn".to_string(),
        }
    }
}

impl<P: Payload, T: FromField> Extractor<P, T> {
    pub fn resolve(&self, payload: &P) -> Result<T, ExtractionError> {
        match self {
            Extractor::Field(name) => T::from_field(payload.field(name)?.as_ref()),
            Extractor::Func(f) => f(payload),
        }
    }
}

impl<P, T> Clone for Extractor<P, T> {
    fn clone(&self) -> Self {
        match self {
            Extractor::Field(name) => Extractor::Field(name.clone()),
            Extractor::Func(f) => Extractor::Func(Arc::clone(f)),
        }
    }
}

impl<P, T> fmt::Debug for Extractor<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extractor::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Extractor::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl<P, T> From<&str> for Extractor<P, T> {
    fn from(name: &str) -> Self {
        Extractor::field(name)
    }
}

impl<P, T> From<String> for Extractor<P, T> {
    fn from(name: String) -> Self {
        Extractor::Field(name)
    }
}
