//! Producer-facing submission handle.
//!
//! This module contains [`RequestSubmitter`] - the public interface
//! producers use to push request intents at the dispatcher. It is
//! cloneable and can be shared across threads; `submit()` is
//! non-blocking and serializes only briefly on the shared lock.

use crate::admission::DispatchState;
use std::sync::Arc;
use tracing::trace;

/// Handle for submitting request intents to the dispatcher.
///
/// The request shape is fixed by the dispatcher configuration, so a
/// submission carries no payload: it either claims a backlog slot or is
/// rejected. A rejected submission has no side effect; the caller
/// decides whether to drop the intent or resubmit later.
#[derive(Clone)]
pub struct RequestSubmitter {
    state: Arc<DispatchState>,
}

impl RequestSubmitter {
    pub(crate) fn new(state: Arc<DispatchState>) -> Self {
        Self { state }
    }

    /// Submits one request intent. Returns `false` when the backlog is
    /// full or the dispatcher has shut down.
    pub fn submit(&self) -> bool {
        let accepted = self.state.try_admit();
        if !accepted {
            trace!("submission rejected, backlog full");
        }
        accepted
    }

    /// Number of accepted intents not yet dispatched.
    pub fn queued(&self) -> usize {
        self.state.waiting()
    }

    /// Number of transfers currently in flight.
    pub fn in_flight(&self) -> usize {
        self.state.active_len()
    }

    /// Whether the dispatcher has shut down and stopped admitting.
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}
