//! High-level agent that owns the keyed locks, the replay table and the receiver index.
//! Handlers registered through `mutex_receive` are wrapped and queued, then installed
//! into the index when the agent flushes its pending registrations.

use crate::error::{ConfigError, DeliveryError, HandlerError};
use crate::extract::Payload;
use crate::handler::{HandlerWrapper, ReceiveOptions, SharedReplay};
use crate::infrastructure::{Receiver, ReceiverIndex};
use crate::infrastructure_in_memory::InMemoryReceiverIndex;
use crate::keyed_mutex::KeyedMutex;
use crate::replay::ReplayGuard;
use crate::route::ParsedRoute;
use crate::types::{DnaRecord, Outcome, Priority, RouteKey};
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const RELEASE_NAME: &str = "aurora";
pub const RELEASE_VERSION: &str = env!("CARGO_PKG_VERSION");

type BoxedIndex<P, R> = Box<dyn ReceiverIndex<P, R>>;

/// The main entry point: registers keyed handlers and delivers payloads to them.
///
/// `P` is the payload type (a JSON value by default) and `R` what handlers return.
pub struct Agent<P = Value, R = ()> {
    name: String,
    locks: KeyedMutex<RouteKey>,
    replay: SharedReplay,
    /// Receiver index and DNA log, behind the agent's routes lock
    routes: RwLock<BoxedIndex<P, R>>,
    /// Registrations waiting for the next flush
    pending: Mutex<Vec<Receiver<P, R>>>,
    route_parsing: AtomicBool,
}

impl<P, R> Agent<P, R>
where
    P: Payload + Send + 'static,
    R: Send + 'static,
{
    /// Create an agent with an in-memory receiver index.
    /// Without a name, one is generated.
    pub fn new(name: Option<&str>) -> Self {
        Self::with_index(name, Box::new(InMemoryReceiverIndex::new()))
    }

    pub fn with_index(name: Option<&str>, index: BoxedIndex<P, R>) -> Self {
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{}-{}", RELEASE_NAME, nanoid::nanoid!(8)),
        };
        Self {
            name,
            locks: KeyedMutex::new(),
            replay: Arc::new(Mutex::new(ReplayGuard::new())),
            routes: RwLock::new(index),
            pending: Mutex::new(Vec::new()),
            route_parsing: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index receivers under their parsed route instead of the raw string.
    /// Applies to registrations flushed after the call and to later deliveries.
    pub fn set_route_parsing(&self, enabled: bool) {
        self.route_parsing.store(enabled, Ordering::SeqCst);
    }

    pub fn route_parsing(&self) -> bool {
        self.route_parsing.load(Ordering::SeqCst)
    }

    /// Register `handler` on `route` with per-key serialization.
    ///
    /// The registration is validated and its metadata logged immediately; the
    /// wrapped handler is installed on the next [`flush_registrations`](Self::flush_registrations).
    /// The original handler is handed back for direct calls.
    pub fn mutex_receive<H, Fut, E>(
        &self,
        route: &str,
        options: ReceiveOptions<P>,
        handler: H,
    ) -> Result<H, ConfigError>
    where
        H: Fn(P) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        E: Into<HandlerError> + 'static,
    {
        let record = dna_record::<H, P>(route.trim(), &options);
        let wrapper = HandlerWrapper::new(
            route,
            options,
            self.locks.clone(),
            Arc::clone(&self.replay),
            handler.clone(),
        )?;

        self.routes_mut().append_dna(record);

        let receiver = Receiver {
            route: wrapper.route().to_string(),
            priority: wrapper.priority().clone(),
            handler: wrapper.into_receiver_fn(),
        };
        self.pending().push(receiver);

        Ok(handler)
    }

    /// Bring the agent up: installs every queued registration and reports it ready.
    /// Returns how many receivers were installed.
    pub fn start(&self) -> usize {
        let installed = self.flush_registrations();
        tracing::info!(
            agent = %self.name,
            receivers = installed,
            route_parsing = self.route_parsing(),
            "Agent ready"
        );
        installed
    }

    /// Install every queued registration into the receiver index.
    /// Returns how many were installed.
    pub fn flush_registrations(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending());
        let count = pending.len();
        let parsing = self.route_parsing();

        let mut routes = self.routes_mut();
        for receiver in pending {
            let (index_key, parsed) = if parsing {
                let parsed = ParsedRoute::parse(&receiver.route);
                (parsed.to_string(), Some(parsed))
            } else {
                (receiver.route.clone(), None)
            };

            tracing::info!(
                agent = %self.name,
                route = %index_key,
                priority = %receiver.priority,
                "Receiver registered"
            );
            if routes.insert(index_key.clone(), parsed, receiver).is_some() {
                tracing::warn!(route = %index_key, "Receiver replaced an existing registration");
            }
        }
        count
    }

    /// Registrations queued but not yet installed.
    pub fn pending_registrations(&self) -> usize {
        self.pending().len()
    }

    /// Deliver `payload` to the receiver registered for `route`.
    pub async fn deliver(&self, route: &str, payload: P) -> Result<Outcome<R>, DeliveryError> {
        let index_key = self.index_key(route);
        let receiver = self
            .routes()
            .get(&index_key)
            .ok_or_else(|| DeliveryError::NoReceiver(index_key.clone()))?;

        (receiver.handler)(payload).await
    }

    /// Installed receivers as `(index key, priority)`, ordered by priority then key.
    pub fn receivers(&self) -> Vec<(String, Priority)> {
        self.routes().entries()
    }

    /// Parsed form recorded for an installed receiver.
    pub fn parsed_route(&self, index_key: &str) -> Option<ParsedRoute> {
        self.routes().parsed_route(index_key)
    }

    /// Metadata of every registered handler.
    pub fn dna(&self) -> Vec<DnaRecord> {
        self.routes().dna()
    }

    /// The agent's keyed lock table.
    pub fn locks(&self) -> &KeyedMutex<RouteKey> {
        &self.locks
    }

    /// Number of `(route, key)` pairs with a recorded sequence.
    pub fn tracked_sequences(&self) -> usize {
        self.replay
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn index_key(&self, route: &str) -> String {
        if self.route_parsing() {
            ParsedRoute::parse(route).to_string()
        } else {
            route.trim().to_string()
        }
    }

    fn routes(&self) -> RwLockReadGuard<'_, BoxedIndex<P, R>> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn routes_mut(&self) -> RwLockWriteGuard<'_, BoxedIndex<P, R>> {
        self.routes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, Vec<Receiver<P, R>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P, R> Default for Agent<P, R>
where
    P: Payload + Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new(None)
    }
}

fn dna_record<H, P>(route: &str, options: &ReceiveOptions<P>) -> DnaRecord {
    let full_name = std::any::type_name::<H>();
    let (module, fn_name) = full_name.rsplit_once("::").unwrap_or(("", full_name));
    DnaRecord {
        route: route.to_string(),
        priority: options.priority.clone(),
        fn_name: fn_name.to_string(),
        module: module.to_string(),
        source: options.source.clone(),
        key_by: options
            .key_by
            .as_ref()
            .map_or_else(|| "none".to_string(), |by| by.describe()),
        seq_by: options.seq_by.as_ref().map(|by| by.describe()),
    }
}
