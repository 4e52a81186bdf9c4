//! Error types for registration and delivery

use thiserror::Error;

/// Any error returned by a user handler body.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid registration, detected before any payload is processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("mutex_receive on route '{route}' requires key_by")]
    MissingKeyBy { route: String },
    #[error("mutex_receive requires a non-empty route")]
    EmptyRoute,
}

/// A key or sequence could not be resolved from a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("payload has no field '{field}'")]
    MissingField { field: String },
    #[error("cannot read field '{field}' from a {found} payload")]
    NotAMapping { field: String, found: &'static str },
    #[error("a {found} value cannot be used as a key")]
    UnhashableKey { found: &'static str },
    #[error("a {found} value cannot be used as a sequence")]
    UnorderedSequence { found: &'static str },
    #[error("{0}")]
    Custom(String),
}

impl ExtractionError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        ExtractionError::MissingField {
            field: field.into(),
        }
    }
}

/// Failure while delivering a payload to a registered receiver.
///
/// A stale payload is not an error; it is reported as `Outcome::Stale`.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("handler error: {0}")]
    Handler(#[source] HandlerError),
    #[error("no receiver registered for route '{0}'")]
    NoReceiver(String),
}
