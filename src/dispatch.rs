//! Releasing waiting intents into the transport.
//!
//! Each dispatch cycle converts backlog slots into registered transfers,
//! bounded by the in-flight cap. The waiting count is reduced under the
//! shared lock before any registration happens, so `submit()` and the
//! cycle never race on it.

use crate::core::RequestDispatcher;
use crate::transfer::ActiveTransfer;
use crate::transport::TransportSession;
use tracing::{debug, warn};

impl<T: TransportSession> RequestDispatcher<T> {
    /// Number of additional transfers that can start this cycle.
    pub(crate) fn capacity_available(&self) -> usize {
        self.config
            .max_in_flight
            .saturating_sub(self.state.active_len())
    }

    /// Dispatches up to `min(waiting, capacity_available())` transfers.
    pub(crate) fn dispatch_waiting(&mut self) {
        let capacity = self.capacity_available();
        if capacity == 0 {
            return;
        }

        let batch = self.state.pop_up_to(capacity);
        if batch == 0 {
            return;
        }

        debug!(batch, in_flight = self.state.active_len(), "dispatching");
        for _ in 0..batch {
            self.dispatch_one();
        }
    }

    /// Registers one transfer with the session and tracks it in the
    /// active set.
    fn dispatch_one(&mut self) {
        let id = self.allocate_id();
        let mut record = ActiveTransfer::new(id, self.release_tx.clone());

        if let Err(e) = self.session.register(id, &self.spec) {
            // The intent is dropped; no retry. The record's release
            // guard routes the id through reclaim, where the unknown-id
            // deregister is a no-op.
            warn!(id = %id, error = %e, "failed to register transfer");
            return;
        }

        record.advance_state(); // Created -> Registered
        self.state.insert_active(record);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DispatcherConfig;
    use crate::core::RequestDispatcher;
    use crate::submitter::RequestSubmitter;
    use crate::transport::mock::MockSession;

    fn dispatcher_with_capacity(
        queue_capacity: usize,
        max_in_flight: usize,
    ) -> (RequestDispatcher<MockSession>, RequestSubmitter) {
        let config = DispatcherConfig {
            queue_capacity,
            max_in_flight,
            ..DispatcherConfig::default()
        };
        RequestDispatcher::new(config, MockSession::manual())
    }

    #[test]
    fn test_single_cycle_dispatches_all_when_under_cap() {
        // Scenario: 10 waiting, cap 30 -> one cycle dispatches all 10.
        let (mut dispatcher, submitter) = dispatcher_with_capacity(50, 30);
        for _ in 0..10 {
            assert!(submitter.submit());
        }

        dispatcher.dispatch_waiting();

        assert_eq!(submitter.queued(), 0);
        assert_eq!(submitter.in_flight(), 10);
    }

    #[test]
    fn test_dispatch_is_bounded_by_max_in_flight() {
        let (mut dispatcher, submitter) = dispatcher_with_capacity(50, 30);
        for _ in 0..51 {
            assert!(submitter.submit());
        }

        dispatcher.dispatch_waiting();

        assert_eq!(submitter.in_flight(), 30);
        assert_eq!(submitter.queued(), 21);

        // No capacity left; a second cycle dispatches nothing.
        dispatcher.dispatch_waiting();
        assert_eq!(submitter.in_flight(), 30);
        assert_eq!(submitter.queued(), 21);
    }

    #[test]
    fn test_capacity_available_saturates_at_zero() {
        let (mut dispatcher, submitter) = dispatcher_with_capacity(50, 5);
        for _ in 0..5 {
            assert!(submitter.submit());
        }
        dispatcher.dispatch_waiting();

        assert_eq!(dispatcher.capacity_available(), 0);
    }

    #[test]
    fn test_empty_backlog_dispatches_nothing() {
        let (mut dispatcher, submitter) = dispatcher_with_capacity(50, 30);
        dispatcher.dispatch_waiting();
        assert_eq!(submitter.in_flight(), 0);
    }
}
