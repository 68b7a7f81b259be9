//! Dispatcher core - main struct and event loop.
//!
//! This module contains the [`RequestDispatcher`] struct and its run
//! loop. Handler methods live in separate modules:
//! - `dispatch`: releasing waiting intents into the transport
//! - `reap`: draining completions and releasing transfers

use crate::admission::DispatchState;
use crate::config::DispatcherConfig;
use crate::submitter::RequestSubmitter;
use crate::transfer::{TransferId, TransferSpec};
use crate::transport::{Readiness, TransportSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// =============================================================================
// Request Dispatcher
// =============================================================================

/// The admission-controlled dispatch engine.
///
/// A single instance owns the transport session and the event loop.
/// Producers interact only through the [`RequestSubmitter`] returned by
/// [`new`](Self::new); the loop itself:
/// - releases waiting intents up to the in-flight cap
/// - waits (bounded) for transport readiness, or idles when nothing is
///   registered
/// - advances the transport and reaps completed transfers
/// - on shutdown, closes admission and drains the active set
pub struct RequestDispatcher<T: TransportSession> {
    /// Shared admission + active-set state (the one lock).
    pub(crate) state: Arc<DispatchState>,

    /// The multiplexed transport session.
    pub(crate) session: T,

    /// Configuration.
    pub(crate) config: DispatcherConfig,

    /// The fixed request shape every transfer uses.
    pub(crate) spec: TransferSpec,

    /// Next transfer id. Only the loop allocates ids.
    pub(crate) next_id: u64,

    /// Release guards send ids here; `reclaim()` deregisters them.
    pub(crate) release_tx: mpsc::UnboundedSender<TransferId>,
    pub(crate) release_rx: mpsc::UnboundedReceiver<TransferId>,
}

impl<T: TransportSession> RequestDispatcher<T> {
    /// Creates a dispatcher and its producer-facing submitter.
    pub fn new(config: DispatcherConfig, session: T) -> (Self, RequestSubmitter) {
        let state = Arc::new(DispatchState::new(config.queue_capacity));
        let spec = TransferSpec::from_config(&config);
        let (release_tx, release_rx) = mpsc::unbounded_channel();

        let dispatcher = Self {
            state: Arc::clone(&state),
            session,
            config,
            spec,
            next_id: 0,
            release_tx,
            release_rx,
        };
        let submitter = RequestSubmitter::new(state);
        (dispatcher, submitter)
    }

    /// Runs the event loop until shutdown is signalled, then drains.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            target = %self.config.target_url,
            queue_capacity = self.config.queue_capacity,
            max_in_flight = self.config.max_in_flight,
            "dispatcher started"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            self.dispatch_waiting();

            let wait = self.wait_budget();
            let readiness = match self.session.readiness() {
                Ok(readiness) => readiness,
                Err(e) => {
                    // Non-fatal: abandon this iteration and restart.
                    // Yield so a persistently failing session cannot
                    // starve the scheduler.
                    warn!(error = %e, "readiness query failed");
                    tokio::task::yield_now().await;
                    continue;
                }
            };

            let proceed = match readiness {
                Readiness::Idle => {
                    // Nothing to wait on; poll instead of blocking so
                    // new submissions are picked up promptly.
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.idle_poll_interval) => true,
                    }
                }
                Readiness::Pending => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        result = self.session.wait_ready(wait) => match result {
                            Ok(()) => true,
                            Err(e) => {
                                // Non-fatal: skip advancement this cycle.
                                warn!(error = %e, "readiness wait failed");
                                false
                            }
                        },
                    }
                }
            };

            if proceed {
                match self.session.advance() {
                    Ok(()) => {
                        self.state.mark_in_flight();
                        self.reap_completions();
                    }
                    Err(e) => warn!(error = %e, "transport advance failed"),
                }
            }

            self.reclaim();
        }

        self.drain_and_stop();
    }

    /// Bound for the next readiness wait: the session's suggestion
    /// clamped to `max_wait`, defaulting to `max_wait` when the session
    /// has none.
    pub(crate) fn wait_budget(&mut self) -> Duration {
        match self.session.suggested_timeout() {
            Some(suggested) => suggested.min(self.config.max_wait),
            None => self.config.max_wait,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> TransferId {
        let id = TransferId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Final drain: close admission, take one last advance/reap pass,
    /// then release every remaining active transfer.
    fn drain_and_stop(&mut self) {
        self.state.close();

        if self.session.advance().is_ok() {
            self.reap_completions();
        }

        let leftover = self.state.drain_active();
        let aborted = leftover.len();
        drop(leftover);
        self.reclaim();

        info!(
            aborted,
            waiting_discarded = self.state.waiting(),
            "dispatcher stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockSession;

    #[test]
    fn test_dispatcher_creation() {
        let (dispatcher, submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), MockSession::new());

        assert_eq!(dispatcher.next_id, 0);
        assert_eq!(dispatcher.spec.url, "https://localhost/api/");
        assert_eq!(submitter.queued(), 0);
        assert_eq!(submitter.in_flight(), 0);
    }

    #[test]
    fn test_wait_budget_defaults_to_max_wait() {
        let (mut dispatcher, _submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), MockSession::new());

        // MockSession suggests nothing.
        assert_eq!(dispatcher.wait_budget(), Duration::from_millis(1000));
    }

    #[test]
    fn test_wait_budget_clamps_large_suggestions() {
        let session = MockSession::new().with_suggested_timeout(Duration::from_secs(5));
        let (mut dispatcher, _submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), session);

        assert_eq!(dispatcher.wait_budget(), Duration::from_millis(1000));
    }

    #[test]
    fn test_wait_budget_keeps_small_suggestions() {
        let session = MockSession::new().with_suggested_timeout(Duration::from_millis(200));
        let (mut dispatcher, _submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), session);

        assert_eq!(dispatcher.wait_budget(), Duration::from_millis(200));
    }

    #[test]
    fn test_wait_budget_respects_smaller_max_wait() {
        let config = DispatcherConfig {
            max_wait: Duration::from_millis(250),
            ..DispatcherConfig::default()
        };
        let (mut dispatcher, _submitter) = RequestDispatcher::new(config, MockSession::new());

        assert_eq!(dispatcher.wait_budget(), Duration::from_millis(250));
    }

    #[test]
    fn test_allocate_id_is_monotonic() {
        let (mut dispatcher, _submitter) =
            RequestDispatcher::new(DispatcherConfig::default(), MockSession::new());

        assert_eq!(dispatcher.allocate_id(), TransferId::new(0));
        assert_eq!(dispatcher.allocate_id(), TransferId::new(1));
        assert_eq!(dispatcher.allocate_id(), TransferId::new(2));
    }
}
