use crate::infrastructure::{Receiver, ReceiverIndex};
use crate::route::ParsedRoute;
use crate::types::{DnaRecord, Priority};
use std::collections::HashMap;

pub struct InMemoryReceiverIndex<P, R> {
    // Map of index key -> receiver
    receivers: HashMap<String, Receiver<P, R>>,
    // Map of index key -> parsed route (route parsing only)
    parsed_routes: HashMap<String, ParsedRoute>,
    dna: Vec<DnaRecord>,
}

impl<P, R> InMemoryReceiverIndex<P, R> {
    pub fn new() -> Self {
        Self {
            receivers: HashMap::new(),
            parsed_routes: HashMap::new(),
            dna: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

impl<P, R> Default for InMemoryReceiverIndex<P, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> ReceiverIndex<P, R> for InMemoryReceiverIndex<P, R> {
    fn insert(
        &mut self,
        index_key: String,
        parsed: Option<ParsedRoute>,
        receiver: Receiver<P, R>,
    ) -> Option<Receiver<P, R>> {
        match parsed {
            Some(parsed) => {
                self.parsed_routes.insert(index_key.clone(), parsed);
            }
            None => {
                self.parsed_routes.remove(&index_key);
            }
        }
        self.receivers.insert(index_key, receiver)
    }

    fn get(&self, index_key: &str) -> Option<Receiver<P, R>> {
        self.receivers.get(index_key).cloned()
    }

    fn entries(&self) -> Vec<(String, Priority)> {
        let mut entries: Vec<_> = self
            .receivers
            .iter()
            .map(|(key, receiver)| (key.clone(), receiver.priority.clone()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    fn parsed_route(&self, index_key: &str) -> Option<ParsedRoute> {
        self.parsed_routes.get(index_key).cloned()
    }

    fn append_dna(&mut self, record: DnaRecord) {
        self.dna.push(record);
    }

    fn dna(&self) -> Vec<DnaRecord> {
        self.dna.clone()
    }
}
