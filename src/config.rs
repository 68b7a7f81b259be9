//! Dispatcher configuration.
//!
//! This module contains the [`DispatcherConfig`] struct and the named
//! default constants for the dispatcher's tunables. The two limits that
//! matter operationally are `queue_capacity` (how many accepted intents
//! may wait) and `max_in_flight` (how many transfers may run at once);
//! both are process-wide values injected at construction.

use std::time::Duration;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default backlog bound for accepted-but-undispatched intents.
///
/// Admission uses a strict greater-than check against this value, so the
/// backlog can briefly hold `queue_capacity + 1` intents before the next
/// submit is rejected.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Default cap on concurrently in-flight transfers.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 30;

/// Default per-transfer timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single readiness wait. Session-suggested timeouts are
/// clamped to this; it is also the default when the session has no
/// suggestion.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(1000);

/// Poll interval when the session has nothing to wait on. Keeps the loop
/// from spinning while the backlog and active set are both empty.
pub const DEFAULT_IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long idle pooled connections are kept warm by the transport.
pub const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

// =============================================================================
// Dispatcher Configuration
// =============================================================================

/// Configuration for the request dispatcher.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Fixed target URL; every dispatched transfer is a GET against it.
    pub target_url: String,

    /// Backlog bound for accepted-but-undispatched intents.
    pub queue_capacity: usize,

    /// Cap on concurrently in-flight transfers.
    pub max_in_flight: usize,

    /// Per-transfer timeout.
    pub request_timeout: Duration,

    /// Upper bound on a single readiness wait.
    pub max_wait: Duration,

    /// Poll interval when there is nothing to wait on.
    pub idle_poll_interval: Duration,

    /// Follow HTTP 30x redirects.
    pub follow_redirects: bool,

    /// Skip TLS certificate and hostname verification.
    ///
    /// Defaults to `true` to match the system this replaces. This is a
    /// security-relevant setting: leave it enabled only for trusted or
    /// internal endpoints.
    pub accept_invalid_tls: bool,
}

impl DispatcherConfig {
    /// Creates a configuration for the given target URL with default
    /// limits and timeouts.
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            ..Self::default()
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            target_url: String::from("https://localhost/api/"),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_wait: DEFAULT_MAX_WAIT,
            idle_poll_interval: DEFAULT_IDLE_POLL_INTERVAL,
            follow_redirects: true,
            accept_invalid_tls: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_limits() {
        let config = DispatcherConfig::default();
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.max_in_flight, DEFAULT_MAX_IN_FLIGHT);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.max_wait, Duration::from_millis(1000));
        assert_eq!(config.idle_poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_config_default_flags() {
        let config = DispatcherConfig::default();
        assert!(config.follow_redirects);
        assert!(config.accept_invalid_tls);
    }

    #[test]
    fn test_config_new_sets_target() {
        let config = DispatcherConfig::new("https://10.0.0.1/api/");
        assert_eq!(config.target_url, "https://10.0.0.1/api/");
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_config_clone() {
        let config = DispatcherConfig::new("https://example.test/");
        let cloned = config.clone();
        assert_eq!(cloned.target_url, config.target_url);
        assert_eq!(cloned.max_in_flight, config.max_in_flight);
    }
}
