//! Bounded store of request snapshots.
//!
//! The executor publishes a snapshot when a run starts and replaces it at the
//! terminal transition. Readers only ever get clones. When the store is full
//! the oldest request id is evicted first.

use std::collections::{HashMap, VecDeque};

use pipeline::{RequestId, RequestState};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Entries {
    states: HashMap<RequestId, RequestState>,
    order: VecDeque<RequestId>,
}

impl Entries {
    fn insert(&mut self, state: RequestState, capacity: usize) {
        let id = state.request_id();
        if self.states.insert(id, state).is_none() {
            self.order.push_back(id);
            while self.order.len() > capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.states.remove(&evicted);
                    tracing::debug!(request_id = %evicted, "evicted request snapshot");
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct StateRegistry {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl StateRegistry {
    /// Creates a registry holding at most `capacity` requests (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    /// Inserts or replaces the snapshot for `state.request_id()`.
    ///
    /// Replacing keeps the request's original position in the eviction order.
    pub async fn publish(&self, state: RequestState) {
        self.entries.write().await.insert(state, self.capacity);
    }

    /// [`publish`](Self::publish) without waiting. Hands the state back when
    /// the lock is held elsewhere.
    pub fn try_publish(&self, state: RequestState) -> Result<(), RequestState> {
        match self.entries.try_write() {
            Ok(mut entries) => {
                entries.insert(state, self.capacity);
                Ok(())
            }
            Err(_) => Err(state),
        }
    }

    pub async fn get(&self, id: RequestId) -> Option<RequestState> {
        self.entries.read().await.states.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.states.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
