//! # aurora-core
//!
//! Keyed concurrency control for message handlers.
//! Handlers touching the same entity never run concurrently, handlers for
//! different entities run in parallel, and stale or duplicate deliveries are
//! dropped before they reach user code.

pub mod client;
pub mod error;
pub mod extract;
pub mod handler;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
pub mod keyed_mutex;
pub mod replay;
pub mod route;
pub mod types;

pub use client::Agent;
pub use error::{ConfigError, DeliveryError, ExtractionError, HandlerError};
pub use extract::{Extractor, KeyBy, Payload, SeqBy};
pub use handler::{HandlerWrapper, ReceiveOptions};
pub use keyed_mutex::{KeyedGuard, KeyedMutex};
pub use replay::ReplayGuard;
pub use types::{DnaRecord, Key, Outcome, Priority, RouteKey, Sequence};

#[cfg(test)]
mod extract_test;
#[cfg(test)]
mod keyed_mutex_test;
