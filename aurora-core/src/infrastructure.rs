use crate::handler::ReceiverFn;
use crate::route::ParsedRoute;
use crate::types::{DnaRecord, Priority};

/// A wrapped handler ready for dispatch.
pub struct Receiver<P, R> {
    pub route: String,
    pub priority: Priority,
    pub handler: ReceiverFn<P, R>,
}

impl<P, R> Clone for Receiver<P, R> {
    fn clone(&self) -> Self {
        Self {
            route: self.route.clone(),
            priority: self.priority.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Defines the contract for receiver index backends.
///
/// Implementations do no locking; the agent serializes mutation behind its own
/// routes lock.
pub trait ReceiverIndex<P, R>: Send + Sync {
    /// Store a receiver under `index_key`, returning the one it replaces.
    ///
    /// `parsed` is the normalized route when route parsing is on.
    fn insert(
        &mut self,
        index_key: String,
        parsed: Option<ParsedRoute>,
        receiver: Receiver<P, R>,
    ) -> Option<Receiver<P, R>>;

    /// Look up the receiver for an index key
    fn get(&self, index_key: &str) -> Option<Receiver<P, R>>;

    /// Index keys with their priorities
    fn entries(&self) -> Vec<(String, Priority)>;

    /// Parsed form recorded for an index key, if any
    fn parsed_route(&self, index_key: &str) -> Option<ParsedRoute>;

    /// Append handler metadata to the introspection log
    fn append_dna(&mut self, record: DnaRecord);

    /// All handler metadata, in registration order
    fn dna(&self) -> Vec<DnaRecord>;
}
