//! Error types for the transport seam.

use thiserror::Error;

/// Errors reported by a [`TransportSession`](crate::TransportSession).
///
/// Only [`TransportError::Init`] is fatal (it fails dispatcher
/// construction). The remaining variants are per-cycle failures: the
/// event loop logs them and retries on the next iteration.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport session could not be created. Propagates as a
    /// startup failure.
    #[error("transport initialization failed: {0}")]
    Init(String),

    /// A transfer could not be registered with the session. The intent
    /// is dropped; no retry is issued.
    #[error("failed to register transfer: {0}")]
    Register(String),

    /// The session could not report what to wait on. The loop abandons
    /// the current iteration and restarts.
    #[error("readiness query failed: {0}")]
    Readiness(String),

    /// The bounded readiness wait failed. The loop skips transport
    /// advancement for this cycle.
    #[error("readiness wait failed: {0}")]
    Wait(String),

    /// Advancing in-flight transfers failed. Completions are not reaped
    /// this cycle.
    #[error("failed to advance transfers: {0}")]
    Advance(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TransportError::Init("no TLS backend".into());
        assert_eq!(err.to_string(), "transport initialization failed: no TLS backend");

        let err = TransportError::Wait("poll interrupted".into());
        assert_eq!(err.to_string(), "readiness wait failed: poll interrupted");
    }
}
