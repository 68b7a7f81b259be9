//! Transfer identity, lifecycle, and the fixed request shape.
//!
//! A transfer moves strictly forward through
//! `Created → Registered → InFlight → Completed → Released`; there is no
//! retry edge and no cancellation edge. Exactly-once release is enforced
//! by [`ReleaseGuard`]: dropping an [`ActiveTransfer`] on any path routes
//! its id to the event loop's reclaim channel, where the session
//! deregistration happens.

use crate::config::DispatcherConfig;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// =============================================================================
// Transfer Identity
// =============================================================================

/// Unique identifier for one outbound transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransferId(u64);

impl TransferId {
    /// Creates an id from a raw sequence number.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer-{}", self.0)
    }
}

// =============================================================================
// Transfer Lifecycle
// =============================================================================

/// Lifecycle state of a transfer. Transitions are strictly forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferState {
    /// Configured but not yet known to the transport.
    Created,
    /// Registered with the transport session and tracked in the active set.
    Registered,
    /// The transport is advancing the transfer.
    InFlight,
    /// The transport reported completion (success or failure alike).
    Completed,
    /// Removed from the active set and deregistered from the transport.
    Released,
}

impl TransferState {
    /// Returns the next state in the forward-only lifecycle.
    /// `Released` is terminal and maps to itself.
    pub fn next(self) -> Self {
        match self {
            Self::Created => Self::Registered,
            Self::Registered => Self::InFlight,
            Self::InFlight => Self::Completed,
            Self::Completed | Self::Released => Self::Released,
        }
    }

    /// Whether the transfer has reached its terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released)
    }
}

// =============================================================================
// Fixed Request Shape
// =============================================================================

/// The per-transfer request configuration.
///
/// Every dispatched transfer uses the same shape: a GET against the fixed
/// target with a fixed timeout. Session-level behavior (redirects, TLS
/// verification, content decoding, HTTP/2 prior knowledge) is configured
/// once when the transport session is built.
#[derive(Clone, Debug)]
pub struct TransferSpec {
    /// Target URL for the GET request.
    pub url: String,
    /// Per-transfer timeout.
    pub timeout: Duration,
}

impl TransferSpec {
    /// Builds the fixed request shape from the dispatcher configuration.
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self {
            url: config.target_url.clone(),
            timeout: config.request_timeout,
        }
    }
}

// =============================================================================
// Active Transfer Record
// =============================================================================

/// Bookkeeping record for a transfer in the active set.
///
/// The record owns a [`ReleaseGuard`]; when the record is dropped (after
/// reaping, during the shutdown drain, or on any error path) the guard
/// sends the id to the reclaim channel and the event loop deregisters
/// the transfer from the session exactly once.
pub(crate) struct ActiveTransfer {
    pub id: TransferId,
    pub state: TransferState,
    pub registered_at: Instant,
    _release: ReleaseGuard,
}

impl ActiveTransfer {
    pub fn new(id: TransferId, release_tx: mpsc::UnboundedSender<TransferId>) -> Self {
        Self {
            id,
            state: TransferState::Created,
            registered_at: Instant::now(),
            _release: ReleaseGuard { id, release_tx },
        }
    }

    /// Steps the lifecycle forward by one state.
    pub fn advance_state(&mut self) {
        self.state = self.state.next();
    }
}

/// Scoped-release guard. Sending on a closed channel means the event
/// loop (and with it the session) is already gone; nothing remains to
/// deregister, so the error is ignored.
struct ReleaseGuard {
    id: TransferId,
    release_tx: mpsc::UnboundedSender<TransferId>,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        let _ = self.release_tx.send(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_display() {
        assert_eq!(TransferId::new(7).to_string(), "transfer-7");
    }

    #[test]
    fn test_lifecycle_is_strictly_forward() {
        let mut state = TransferState::Created;
        let expected = [
            TransferState::Registered,
            TransferState::InFlight,
            TransferState::Completed,
            TransferState::Released,
        ];
        for next in expected {
            state = state.next();
            assert_eq!(state, next);
        }
        // Terminal state stays put.
        assert_eq!(state.next(), TransferState::Released);
        assert!(state.is_terminal());
        assert!(!TransferState::Completed.is_terminal());
    }

    #[test]
    fn test_spec_from_config() {
        let config = DispatcherConfig::new("https://10.1.1.1/api/");
        let spec = TransferSpec::from_config(&config);
        assert_eq!(spec.url, "https://10.1.1.1/api/");
        assert_eq!(spec.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_dropping_record_routes_id_to_reclaim_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let record = ActiveTransfer::new(TransferId::new(3), tx);
        assert_eq!(record.state, TransferState::Created);

        drop(record);

        assert_eq!(rx.try_recv().unwrap(), TransferId::new(3));
        // Exactly once.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_release_with_dropped_loop_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        // Must not panic even though the receiver is gone.
        drop(ActiveTransfer::new(TransferId::new(1), tx));
    }
}
