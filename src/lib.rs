//! BurstGate - admission-controlled dispatch of outbound HTTP requests.
//!
//! This library bounds how many concurrent requests a producer can have
//! open against a remote endpoint. Request intents are admitted into a
//! bounded backlog, released into a bounded pool of in-flight transfers,
//! driven through a multiplexed transport session, and reaped as they
//! complete.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RequestSubmitter                        │
//! │  Non-blocking submit(), accept/reject against the backlog   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     RequestDispatcher                       │
//! │  Event loop: dispatch waiting intents, bounded wait,        │
//! │  advance the transport, reap completions                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ DispatchState│  │ Http2Session │  │ Tracing          │   │
//! │  │ (one lock)   │  │ (reqwest)    │  │ diagnostics      │   │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use burstgate::{DispatcherConfig, Http2Session, RequestDispatcher};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = DispatcherConfig::new("https://internal-host/api/");
//! let session = Http2Session::new(&config)?;
//! let (dispatcher, submitter) = RequestDispatcher::new(config, session);
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(dispatcher.run(shutdown.clone()));
//!
//! // Producers, from any thread:
//! if !submitter.submit() {
//!     // backlog full - drop or resubmit later
//! }
//! ```
//!
//! # Security note
//!
//! Matching the system this replaces, [`DispatcherConfig`] defaults to
//! `accept_invalid_tls = true` (no certificate or hostname verification).
//! The flag is explicit so the choice is auditable; set it to `false`
//! unless the target endpoint lives on a trusted internal network.

pub mod admission;
pub mod config;
pub mod core;
mod dispatch;
pub mod error;
pub mod logging;
mod reap;
pub mod submitter;
pub mod transfer;
pub mod transport;

pub use admission::DispatchState;
pub use config::{
    DispatcherConfig, DEFAULT_IDLE_POLL_INTERVAL, DEFAULT_MAX_IN_FLIGHT, DEFAULT_MAX_WAIT,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_REQUEST_TIMEOUT,
};
pub use crate::core::RequestDispatcher;
pub use error::TransportError;
pub use submitter::RequestSubmitter;
pub use transfer::{TransferId, TransferSpec, TransferState};
pub use transport::http2::Http2Session;
pub use transport::mock::{MockSession, MockStats};
pub use transport::{Completion, Readiness, TransferOutcome, TransportSession};

/// Version of the burstgate library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
