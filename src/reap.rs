//! Completion reaping and transfer release.
//!
//! Completions are drained from the session after each advancement. For
//! each one the record is removed from the active set under the shared
//! lock; deregistration from the session happens outside the lock, via
//! the reclaim channel fed by the record's release guard. Outcome status
//! is logged and then discarded: no retry, nothing surfaced upstream.

use crate::core::RequestDispatcher;
use crate::transport::{TransferOutcome, TransportSession};
use tracing::{debug, trace};

impl<T: TransportSession> RequestDispatcher<T> {
    /// Drains all pending completion notifications and releases the
    /// corresponding transfers.
    pub(crate) fn reap_completions(&mut self) {
        for completion in self.session.drain_completions() {
            let Some(mut record) = self.state.remove_active(completion.id) else {
                // Already released (e.g. a duplicate notification).
                trace!(id = %completion.id, "completion for unknown transfer");
                continue;
            };

            record.advance_state(); // InFlight -> Completed
            let elapsed = record.registered_at.elapsed();

            match completion.outcome {
                TransferOutcome::Success { status } => {
                    debug!(id = %completion.id, status, ?elapsed, "transfer completed");
                }
                TransferOutcome::Failed { reason } => {
                    // Failures are reaped exactly like successes.
                    debug!(id = %completion.id, reason = %reason, ?elapsed, "transfer failed");
                }
            }

            // Dropping the record routes its id to the reclaim channel.
            drop(record);
        }

        self.reclaim();
    }

    /// Deregisters every transfer whose record has been dropped since
    /// the last pass. This is the only place session resources are
    /// released, which makes the release exactly-once on every path.
    pub(crate) fn reclaim(&mut self) {
        while let Ok(id) = self.release_rx.try_recv() {
            self.session.deregister(id);
            trace!(id = %id, "transfer released");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DispatcherConfig;
    use crate::core::RequestDispatcher;
    use crate::transport::mock::MockSession;
    use crate::transport::{TransferOutcome, TransportSession};

    #[test]
    fn test_reap_releases_completed_transfers() {
        let session = MockSession::new();
        let stats = session.stats();
        let (mut dispatcher, submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), session);

        for _ in 0..5 {
            assert!(submitter.submit());
        }
        dispatcher.dispatch_waiting();
        assert_eq!(submitter.in_flight(), 5);

        dispatcher.session.advance().unwrap();
        dispatcher.reap_completions();

        assert_eq!(submitter.in_flight(), 0);
        assert_eq!(stats.deregistered(), 5);
    }

    #[test]
    fn test_failed_transfers_are_reaped_without_retry() {
        let session = MockSession::new().with_outcome(TransferOutcome::Failed {
            reason: "connection reset".into(),
        });
        let stats = session.stats();
        let (mut dispatcher, submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), session);

        for _ in 0..3 {
            assert!(submitter.submit());
        }
        dispatcher.dispatch_waiting();
        dispatcher.session.advance().unwrap();
        dispatcher.reap_completions();

        assert_eq!(submitter.in_flight(), 0);
        assert_eq!(stats.deregistered(), 3);
        // No re-registration happened.
        assert_eq!(stats.registered(), 3);
        assert_eq!(submitter.queued(), 0);
    }

    #[test]
    fn test_reap_with_no_completions_is_a_no_op() {
        let session = MockSession::manual();
        let stats = session.stats();
        let (mut dispatcher, submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), session);

        assert!(submitter.submit());
        dispatcher.dispatch_waiting();
        dispatcher.session.advance().unwrap();
        dispatcher.reap_completions();

        // Manual session completed nothing; the transfer stays active.
        assert_eq!(submitter.in_flight(), 1);
        assert_eq!(stats.deregistered(), 0);
    }
}
