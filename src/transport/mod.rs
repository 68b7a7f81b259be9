//! The multiplexed transport seam.
//!
//! The dispatcher treats the transport as a black box speaking a small
//! protocol: register a transfer, report what to wait on and for how
//! long, advance all in-flight transfers once, and hand back completion
//! notifications. [`http2::Http2Session`] is the production
//! implementation; [`mock::MockSession`] is a deterministic stand-in for
//! tests.

pub mod http2;
pub mod mock;

use crate::error::TransportError;
use crate::transfer::{TransferId, TransferSpec};
use std::future::Future;
use std::time::Duration;

/// What the session has to wait on this cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Nothing registered; the loop should fall back to its poll
    /// interval instead of blocking.
    Idle,
    /// Transfers are in flight; a bounded readiness wait is worthwhile.
    Pending,
}

/// Final status of one transfer, reported regardless of success.
///
/// The dispatcher logs the outcome and otherwise discards it: there is
/// no retry and nothing is surfaced to producers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The request completed; carries the HTTP status code. Non-2xx
    /// statuses are still completions at this layer.
    Success { status: u16 },
    /// The transfer failed before producing a response (connect error,
    /// timeout, protocol error).
    Failed { reason: String },
}

/// A completion notification drained from the session.
#[derive(Clone, Debug)]
pub struct Completion {
    pub id: TransferId,
    pub outcome: TransferOutcome,
}

/// A multiplexed transport session owning pooled connections and every
/// currently-registered transfer.
///
/// The trait is used generically (methods return `impl Future`), the
/// same way the crate's HTTP client seam would be; it is not object
/// safe.
pub trait TransportSession: Send {
    /// Registers one transfer. The session owns it from here until
    /// [`deregister`](Self::deregister).
    fn register(&mut self, id: TransferId, spec: &TransferSpec) -> Result<(), TransportError>;

    /// Suggested bound for the next readiness wait, if the session has
    /// one. The event loop clamps it to its configured maximum.
    fn suggested_timeout(&mut self) -> Option<Duration>;

    /// Reports whether there is anything to wait on.
    fn readiness(&mut self) -> Result<Readiness, TransportError>;

    /// Blocks until progress is likely or the timeout elapses. A timeout
    /// is a normal return; `Err` means the wait itself failed and the
    /// caller should skip advancement this cycle.
    fn wait_ready(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Advances all in-flight transfers once, staging any newly finished
    /// ones for [`drain_completions`](Self::drain_completions).
    fn advance(&mut self) -> Result<(), TransportError>;

    /// Drains every staged completion notification.
    fn drain_completions(&mut self) -> Vec<Completion>;

    /// Releases a transfer's resources. Idempotent: unknown ids are
    /// ignored.
    fn deregister(&mut self, id: TransferId);
}
