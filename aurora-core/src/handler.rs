//! Wraps a user handler with per-key serialization and replay protection.
//!
//! For each delivery the wrapper extracts the key, takes the `(route, key)` lock,
//! checks the sequence against the replay table while holding it, and only then
//! runs the handler. The lock is released on every exit path.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{ConfigError, DeliveryError, HandlerError};
use crate::extract::{KeyBy, Payload, SeqBy};
use crate::keyed_mutex::KeyedMutex;
use crate::replay::ReplayGuard;
use crate::types::{Key, Outcome, Priority, RouteKey, Sequence};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased user handler.
pub type HandlerFn<P, R> =
    Arc<dyn Fn(P) -> BoxFuture<'static, Result<R, HandlerError>> + Send + Sync>;

/// Type-erased wrapped handler, as stored in the receiver index.
pub type ReceiverFn<P, R> =
    Arc<dyn Fn(P) -> BoxFuture<'static, Result<Outcome<R>, DeliveryError>> + Send + Sync>;

/// Replay table shared by every wrapper of one agent.
///
/// The inner guard is only held for a single compare-and-update; ordering between
/// deliveries of one key comes from that key's lock.
pub type SharedReplay = Arc<Mutex<ReplayGuard<Key, Sequence>>>;

/// Registration settings for [`HandlerWrapper`].
pub struct ReceiveOptions<P> {
    pub(crate) key_by: Option<KeyBy<P>>,
    pub(crate) seq_by: Option<SeqBy<P>>,
    pub(crate) priority: Priority,
    pub(crate) source: Option<String>,
}

impl<P> ReceiveOptions<P> {
    pub fn new() -> Self {
        Self {
            key_by: None,
            seq_by: None,
            priority: Priority::default(),
            source: None,
        }
    }

    /// Field name or function yielding the lock key. Required.
    pub fn key_by(mut self, by: impl Into<KeyBy<P>>) -> Self {
        self.key_by = Some(by.into());
        self
    }

    /// Field name or function yielding the delivery sequence. Enables replay protection.
    pub fn seq_by(mut self, by: impl Into<SeqBy<P>>) -> Self {
        self.seq_by = Some(by.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }

    /// Description of the handler kept in its introspection record.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl<P> Default for ReceiveOptions<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for ReceiveOptions<P> {
    fn clone(&self) -> Self {
        Self {
            key_by: self.key_by.clone(),
            seq_by: self.seq_by.clone(),
            priority: self.priority.clone(),
            source: self.source.clone(),
        }
    }
}

/// One handler bound to one route.
pub struct HandlerWrapper<P, R> {
    route: Arc<str>,
    key_by: KeyBy<P>,
    seq_by: Option<SeqBy<P>>,
    priority: Priority,
    locks: KeyedMutex<RouteKey>,
    replay: SharedReplay,
    handler: HandlerFn<P, R>,
}

impl<P, R> HandlerWrapper<P, R>
where
    P: Payload + Send + 'static,
    R: Send + 'static,
{
    /// Validates the registration and erases the handler's future type.
    ///
    /// The route is trimmed; an empty route or a missing `key_by` is rejected.
    pub fn new<H, Fut, E>(
        route: &str,
        options: ReceiveOptions<P>,
        locks: KeyedMutex<RouteKey>,
        replay: SharedReplay,
        handler: H,
    ) -> Result<Self, ConfigError>
    where
        H: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        E: Into<HandlerError> + 'static,
    {
        let route = route.trim();
        if route.is_empty() {
            return Err(ConfigError::EmptyRoute);
        }
        let key_by = options.key_by.ok_or_else(|| ConfigError::MissingKeyBy {
            route: route.to_string(),
        })?;

        let handler: HandlerFn<P, R> = Arc::new(
            move |payload: P| -> BoxFuture<'static, Result<R, HandlerError>> {
                let fut = handler(payload);
                Box::pin(async move { fut.await.map_err(|e| -> HandlerError { e.into() }) })
            },
        );

        Ok(Self {
            route: Arc::from(route),
            key_by,
            seq_by: options.seq_by,
            priority: options.priority,
            locks,
            replay,
            handler,
        })
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn priority(&self) -> &Priority {
        &self.priority
    }

    /// Delivers one payload.
    ///
    /// Returns `Outcome::Stale` without running the handler when the payload's
    /// sequence is not newer than the last accepted one for its key. Extraction and
    /// handler errors are returned after the key's lock is released.
    pub async fn call(&self, payload: P) -> Result<Outcome<R>, DeliveryError> {
        let key = self.key_by.resolve(&payload)?;
        let _guard = self
            .locks
            .lock(RouteKey::new(Arc::clone(&self.route), key.clone()))
            .await;

        let seq = self
            .seq_by
            .as_ref()
            .map(|by| by.resolve(&payload))
            .transpose()?;

        if !self.accept(&key, seq.clone()) {
            tracing::debug!(
                route = %self.route,
                key = %key,
                seq = ?seq,
                "Stale delivery dropped"
            );
            return Ok(Outcome::Stale);
        }

        (self.handler)(payload)
            .await
            .map(Outcome::Handled)
            .map_err(DeliveryError::Handler)
    }

    /// Erases the wrapper into the form stored in the receiver index.
    pub fn into_receiver_fn(self) -> ReceiverFn<P, R> {
        let wrapper = Arc::new(self);
        Arc::new(move |payload: P| -> BoxFuture<'static, Result<Outcome<R>, DeliveryError>> {
            let wrapper = Arc::clone(&wrapper);
            Box::pin(async move { wrapper.call(payload).await })
        })
    }

    fn accept(&self, key: &Key, seq: Option<Sequence>) -> bool {
        let mut replay = self.replay.lock().unwrap_or_else(PoisonError::into_inner);
        replay.accept(&self.route, key, seq)
    }
}
