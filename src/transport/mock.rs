//! Deterministic transport session for tests.
//!
//! `MockSession` completes transfers on `advance()` (or on demand in
//! manual mode), can inject readiness and wait failures, and exposes its
//! counters through a shared [`MockStats`] so tests can observe the
//! session after the dispatcher has consumed it.

use super::{Completion, Readiness, TransferOutcome, TransportSession};
use crate::error::TransportError;
use crate::transfer::{TransferId, TransferSpec};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared counters, cloneable before the session is handed to the
/// dispatcher.
#[derive(Debug, Default)]
pub struct MockStats {
    registered: AtomicUsize,
    deregistered: AtomicUsize,
    advances: AtomicUsize,
    waits: AtomicUsize,
}

impl MockStats {
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn deregistered(&self) -> usize {
        self.deregistered.load(Ordering::SeqCst)
    }

    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

/// Scripted in-memory transport session.
pub struct MockSession {
    stats: Arc<MockStats>,
    outcome: TransferOutcome,
    /// Registered, not-yet-completed transfers in registration order.
    in_flight: Vec<TransferId>,
    staged: VecDeque<Completion>,
    complete_on_advance: bool,
    suggested: Option<Duration>,
    fail_readiness: bool,
    fail_wait: bool,
}

impl MockSession {
    /// Session where every transfer succeeds on the next advance.
    pub fn new() -> Self {
        Self {
            stats: Arc::new(MockStats::default()),
            outcome: TransferOutcome::Success { status: 200 },
            in_flight: Vec::new(),
            staged: VecDeque::new(),
            complete_on_advance: true,
            suggested: None,
            fail_readiness: false,
            fail_wait: false,
        }
    }

    /// Session that never completes transfers on its own; tests call
    /// [`complete_all`](Self::complete_all) explicitly.
    pub fn manual() -> Self {
        Self {
            complete_on_advance: false,
            ..Self::new()
        }
    }

    /// Overrides the outcome reported for every completion.
    pub fn with_outcome(mut self, outcome: TransferOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Makes the session suggest a wait timeout.
    pub fn with_suggested_timeout(mut self, suggested: Duration) -> Self {
        self.suggested = Some(suggested);
        self
    }

    /// Makes every readiness query fail.
    pub fn failing_readiness(mut self) -> Self {
        self.fail_readiness = true;
        self
    }

    /// Makes every readiness wait fail.
    pub fn failing_wait(mut self) -> Self {
        self.fail_wait = true;
        self
    }

    /// Counters shared with this session.
    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// Stages a completion for every in-flight transfer (manual mode).
    pub fn complete_all(&mut self) {
        for id in self.in_flight.drain(..) {
            self.staged.push_back(Completion {
                id,
                outcome: self.outcome.clone(),
            });
        }
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportSession for MockSession {
    fn register(&mut self, id: TransferId, _spec: &TransferSpec) -> Result<(), TransportError> {
        self.stats.registered.fetch_add(1, Ordering::SeqCst);
        self.in_flight.push(id);
        Ok(())
    }

    fn suggested_timeout(&mut self) -> Option<Duration> {
        self.suggested
    }

    fn readiness(&mut self) -> Result<Readiness, TransportError> {
        if self.fail_readiness {
            return Err(TransportError::Readiness("injected failure".into()));
        }
        if self.in_flight.is_empty() {
            Ok(Readiness::Idle)
        } else {
            Ok(Readiness::Pending)
        }
    }

    fn wait_ready(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.stats.waits.fetch_add(1, Ordering::SeqCst);
        let fail = self.fail_wait;
        async move {
            // Yield briefly so tests don't spin a tight loop.
            tokio::time::sleep(timeout.min(Duration::from_millis(1))).await;
            if fail {
                return Err(TransportError::Wait("injected failure".into()));
            }
            Ok(())
        }
    }

    fn advance(&mut self) -> Result<(), TransportError> {
        self.stats.advances.fetch_add(1, Ordering::SeqCst);
        if self.complete_on_advance {
            self.complete_all();
        }
        Ok(())
    }

    fn drain_completions(&mut self) -> Vec<Completion> {
        self.staged.drain(..).collect()
    }

    fn deregister(&mut self, id: TransferId) {
        self.in_flight.retain(|known| *known != id);
        self.stats.deregistered.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TransferSpec {
        TransferSpec {
            url: "https://example.test/".into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_auto_completes_on_advance() {
        let mut session = MockSession::new();
        session.register(TransferId::new(1), &spec()).unwrap();
        session.register(TransferId::new(2), &spec()).unwrap();
        assert_eq!(session.readiness().unwrap(), Readiness::Pending);

        session.advance().unwrap();
        let completions = session.drain_completions();
        assert_eq!(completions.len(), 2);
        assert_eq!(session.readiness().unwrap(), Readiness::Idle);
    }

    #[test]
    fn test_manual_mode_holds_transfers() {
        let mut session = MockSession::manual();
        session.register(TransferId::new(1), &spec()).unwrap();
        session.advance().unwrap();
        assert!(session.drain_completions().is_empty());

        session.complete_all();
        assert_eq!(session.drain_completions().len(), 1);
    }

    #[test]
    fn test_injected_failures() {
        let mut session = MockSession::new().failing_readiness();
        assert!(session.readiness().is_err());
    }

    #[tokio::test]
    async fn test_injected_wait_failure() {
        let mut session = MockSession::new().failing_wait();
        let result = session.wait_ready(Duration::from_millis(10)).await;
        assert!(matches!(result, Err(TransportError::Wait(_))));
        assert_eq!(session.stats().waits(), 1);
    }

    #[test]
    fn test_stats_track_lifecycle() {
        let mut session = MockSession::new().with_outcome(TransferOutcome::Failed {
            reason: "simulated".into(),
        });
        let stats = session.stats();

        session.register(TransferId::new(7), &spec()).unwrap();
        session.advance().unwrap();
        let completions = session.drain_completions();
        session.deregister(TransferId::new(7));

        assert_eq!(stats.registered(), 1);
        assert_eq!(stats.deregistered(), 1);
        assert_eq!(stats.advances(), 1);
        assert!(matches!(
            completions[0].outcome,
            TransferOutcome::Failed { .. }
        ));
    }
}
