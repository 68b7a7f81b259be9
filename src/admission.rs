//! Admission control and active-set bookkeeping.
//!
//! All shared mutable state lives behind one coarse-grained lock: the
//! waiting count mutated by producers and the dispatcher, the active set
//! mutated by the dispatcher and the reaper, and the closed flag set at
//! shutdown. The lock is held only for O(1)/O(active) bookkeeping and
//! never across a readiness wait or transport advancement, so producers
//! are never blocked by network latency.
//!
//! Callers cannot touch the state outside this module's narrow API,
//! which keeps the lock discipline in one place.

use crate::transfer::{ActiveTransfer, TransferId, TransferState};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Shared dispatcher state: waiting count + active set behind one lock.
pub struct DispatchState {
    queue_capacity: usize,
    inner: Mutex<StateInner>,
}

struct StateInner {
    /// Accepted-but-undispatched intents. Never negative; bounded
    /// indirectly by the admission check.
    waiting: usize,
    /// Transfers currently registered or in flight.
    active: HashMap<TransferId, ActiveTransfer>,
    /// Set at shutdown; all later admissions are rejected.
    closed: bool,
}

impl DispatchState {
    /// Creates empty state with the given backlog bound.
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            inner: Mutex::new(StateInner {
                waiting: 0,
                active: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Admits one intent into the backlog, or rejects it.
    ///
    /// Rejection happens when the state is closed or when the waiting
    /// count already exceeds the capacity. The check is a strict
    /// greater-than: with capacity 50, the 52nd concurrent waiter is the
    /// first one rejected.
    pub fn try_admit(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed || inner.waiting > self.queue_capacity {
            return false;
        }
        inner.waiting += 1;
        true
    }

    /// Atomically takes up to `n` intents off the backlog, returning how
    /// many were taken.
    pub fn pop_up_to(&self, n: usize) -> usize {
        let mut inner = self.inner.lock();
        let taken = inner.waiting.min(n);
        inner.waiting -= taken;
        taken
    }

    /// Number of accepted-but-undispatched intents.
    pub fn waiting(&self) -> usize {
        self.inner.lock().waiting
    }

    /// Number of transfers currently registered or in flight.
    pub fn active_len(&self) -> usize {
        self.inner.lock().active.len()
    }

    /// Whether the state has been closed for admission.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Closes admission. Called once during shutdown.
    pub(crate) fn close(&self) {
        self.inner.lock().closed = true;
    }

    pub(crate) fn insert_active(&self, record: ActiveTransfer) {
        self.inner.lock().active.insert(record.id, record);
    }

    pub(crate) fn remove_active(&self, id: TransferId) -> Option<ActiveTransfer> {
        self.inner.lock().active.remove(&id)
    }

    /// Removes every active record, for the final shutdown drain.
    pub(crate) fn drain_active(&self) -> Vec<ActiveTransfer> {
        let mut inner = self.inner.lock();
        inner.active.drain().map(|(_, record)| record).collect()
    }

    /// Marks every registered transfer as in flight. Called after each
    /// successful transport advancement.
    pub(crate) fn mark_in_flight(&self) {
        let mut inner = self.inner.lock();
        for record in inner.active.values_mut() {
            if record.state == TransferState::Registered {
                record.advance_state();
            }
        }
    }
}
