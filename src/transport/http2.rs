//! Production transport session backed by reqwest.
//!
//! One `reqwest::Client` owns the pooled connections; every registered
//! transfer becomes a spawned task driving a single GET. The HTTP/2
//! protocol is negotiated with prior knowledge (no ALPN fallback), so
//! transfers multiplex over the existing connection rather than opening
//! new ones. Response bodies are never read.

use super::{Completion, Readiness, TransferOutcome, TransportSession};
use crate::config::{DispatcherConfig, DEFAULT_POOL_IDLE_TIMEOUT};
use crate::error::TransportError;
use crate::transfer::{TransferId, TransferSpec};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Multiplexed HTTP/2 transport session.
pub struct Http2Session {
    client: reqwest::Client,
    /// Join handles for registered transfers, removed on deregister.
    tasks: HashMap<TransferId, JoinHandle<()>>,
    /// Completions staged by `advance()` for `drain_completions()`.
    staged: VecDeque<Completion>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    /// Woken by transfer tasks as they finish.
    completed: Arc<Notify>,
}

impl Http2Session {
    /// Builds the session from the dispatcher configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Init`] if the underlying client cannot
    /// be constructed (e.g. no TLS backend available). This is the one
    /// fatal error in the crate and should propagate at startup.
    pub fn new(config: &DispatcherConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .http2_prior_knowledge()
            .timeout(config.request_timeout)
            // Transparent decoding for every encoding the client knows.
            .gzip(true)
            .brotli(true)
            .deflate(true)
            // Cached DNS resolution (TTL-driven).
            .hickory_dns(true)
            .pool_idle_timeout(DEFAULT_POOL_IDLE_TIMEOUT)
            .tcp_nodelay(true);

        builder = if config.follow_redirects {
            builder.redirect(reqwest::redirect::Policy::limited(10))
        } else {
            builder.redirect(reqwest::redirect::Policy::none())
        };

        if config.accept_invalid_tls {
            warn!("TLS certificate and hostname verification disabled");
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Init(e.to_string()))?;

        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Ok(Self {
            client,
            tasks: HashMap::new(),
            staged: VecDeque::new(),
            done_tx,
            done_rx,
            completed: Arc::new(Notify::new()),
        })
    }

    /// Number of transfers registered and not yet deregistered.
    pub fn registered(&self) -> usize {
        self.tasks.len()
    }
}

impl TransportSession for Http2Session {
    fn register(&mut self, id: TransferId, spec: &TransferSpec) -> Result<(), TransportError> {
        let client = self.client.clone();
        let url = spec.url.clone();
        let timeout = spec.timeout;
        let done_tx = self.done_tx.clone();
        let completed = Arc::clone(&self.completed);

        let handle = tokio::spawn(async move {
            let outcome = match client.get(&url).timeout(timeout).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    trace!(id = %id, status, "response received");
                    // Body intentionally unread; dropping the response
                    // releases the stream.
                    TransferOutcome::Success { status }
                }
                Err(e) => {
                    debug!(id = %id, error = %e, "request failed");
                    TransferOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            let _ = done_tx.send(Completion { id, outcome });
            completed.notify_one();
        });

        self.tasks.insert(id, handle);
        trace!(id = %id, in_flight = self.tasks.len(), "transfer registered");
        Ok(())
    }

    fn suggested_timeout(&mut self) -> Option<Duration> {
        // Transfers are driven by the runtime; there is no tighter bound
        // to suggest than the loop's own clamp.
        None
    }

    fn readiness(&mut self) -> Result<Readiness, TransportError> {
        if self.tasks.is_empty() {
            Ok(Readiness::Idle)
        } else {
            Ok(Readiness::Pending)
        }
    }

    fn wait_ready(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let completed = Arc::clone(&self.completed);
        async move {
            // Elapsing is a normal return, not an error.
            let _ = tokio::time::timeout(timeout, completed.notified()).await;
            Ok(())
        }
    }

    fn advance(&mut self) -> Result<(), TransportError> {
        while let Ok(completion) = self.done_rx.try_recv() {
            self.staged.push_back(completion);
        }
        Ok(())
    }

    fn drain_completions(&mut self) -> Vec<Completion> {
        self.staged.drain(..).collect()
    }

    fn deregister(&mut self, id: TransferId) {
        if let Some(handle) = self.tasks.remove(&id) {
            // No-op for finished tasks; cancels stragglers during the
            // shutdown drain.
            handle.abort();
            trace!(id = %id, remaining = self.tasks.len(), "transfer deregistered");
        }
    }
}
