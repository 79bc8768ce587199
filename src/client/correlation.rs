//! Correlation table
//!
//! Maps an outstanding request id to the handle its caller waits on. The
//! table is the single source of truth for "is this call still waiting".
//!
//! ## Entry lifecycle
//! ```text
//!  register ──▶ Waiting ──resolve/abandon──▶ Settled ──wait──▶ Taken
//!                  │                            │
//!                  └──────── release ───────────┴──▶ removed
//! ```
//!
//! A handle settles at most once. A second settle attempt (a late response
//! after a timeout, a duplicate response) only removes the entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};

use crate::error::{Result, RpcError};
use crate::protocol::{ObjectId, Outcome, Response};

#[derive(Debug)]
enum State {
    Waiting,
    Settled(Outcome),
    /// Consumed by the waiter
    Taken,
}

/// Single-assignment slot a caller blocks on
#[derive(Debug)]
pub struct PendingHandle {
    state: Mutex<State>,
    ready: Condvar,
}

impl PendingHandle {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::Waiting),
            ready: Condvar::new(),
        }
    }

    /// Settle with `outcome`; false if already settled
    pub fn settle(&self, outcome: Outcome) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, State::Waiting) {
            return false;
        }
        *state = State::Settled(outcome);
        self.ready.notify_all();
        true
    }

    pub fn is_settled(&self) -> bool {
        !matches!(*self.state.lock(), State::Waiting)
    }

    /// Block until settled or until `timeout` passes (`None` = no limit)
    ///
    /// Returns `None` on timeout, or if another waiter already took the
    /// outcome.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<Outcome> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();

        while matches!(*state, State::Waiting) {
            match deadline {
                Some(deadline) => {
                    if self.ready.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.ready.wait(&mut state),
            }
        }

        match std::mem::replace(&mut *state, State::Taken) {
            State::Settled(outcome) => Some(outcome),
            State::Waiting => {
                *state = State::Waiting;
                None
            }
            State::Taken => None,
        }
    }
}

/// Concurrent map of outstanding calls for one connection
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: DashMap<ObjectId, Arc<PendingHandle>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh pending handle for `id`
    pub fn register(&self, id: ObjectId) -> Result<Arc<PendingHandle>> {
        use dashmap::mapref::entry::Entry;

        match self.pending.entry(id) {
            Entry::Occupied(_) => Err(RpcError::DuplicateId(id.to_string())),
            Entry::Vacant(slot) => {
                let handle = Arc::new(PendingHandle::new());
                slot.insert(Arc::clone(&handle));
                Ok(handle)
            }
        }
    }

    fn handle(&self, id: &ObjectId) -> Option<Arc<PendingHandle>> {
        self.pending.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Deliver a response; returns true if it settled a waiting call
    ///
    /// Unknown ids and already-settled handles are cleaned up and ignored.
    pub fn resolve(&self, response: Response) -> bool {
        let id = response.id();
        match self.handle(&id) {
            Some(handle) if handle.settle(Outcome::Response(response)) => true,
            Some(_) => {
                tracing::debug!("Dropping late response for {}", id);
                self.pending.remove(&id);
                false
            }
            None => {
                tracing::debug!("No pending call for response {}", id);
                false
            }
        }
    }

    /// Give up on `id`: wake its waiter with VOID, or remove it if already
    /// settled
    pub fn abandon(&self, id: &ObjectId) {
        if let Some(handle) = self.handle(id) {
            if !handle.settle(Outcome::Void) {
                self.pending.remove(id);
            }
        }
    }

    /// Remove `id` once its waiter is done with it
    pub fn release(&self, id: &ObjectId) {
        self.pending.remove(id);
    }

    /// Wake every waiter with VOID and clear the table
    pub fn abandon_all(&self) -> usize {
        let ids: Vec<ObjectId> = self.pending.iter().map(|e| *e.key()).collect();
        let mut woken = 0;
        for id in ids {
            if let Some((_, handle)) = self.pending.remove(&id) {
                if handle.settle(Outcome::Void) {
                    woken += 1;
                }
            }
        }
        woken
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
