//! Client configuration.
//!
//! [`ClientConfig`] can be built in code or deserialized from any serde format. Durations are
//! expressed in milliseconds on the wire:
//!
//! ```json
//! {
//!   "base_address": "https://api.example.com/",
//!   "thrown_policy": "all",
//!   "retry_on_connection_error": true,
//!   "retry_interval": 500,
//!   "max_retry_attempts": 10,
//!   "max_queued_requests": 500
//! }
//! ```
use crate::transport::ThrownPolicy;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_MAX_QUEUED_REQUESTS: usize = 1000;

/// Settings for a [`crate::RestClient`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Absolute URL every request plan is resolved against.
    pub base_address: String,
    /// Policy applied when a call does not override it.
    pub thrown_policy: ThrownPolicy,
    /// Queue requests that fail at the connection level and re-send them in the background.
    pub retry_on_connection_error: bool,
    /// Pause between two passes of the retry worker.
    #[serde(with = "millis")]
    pub retry_interval: Duration,
    /// Retry passes an entry may fail before it is abandoned. `None` retries forever.
    pub max_retry_attempts: Option<u32>,
    /// Capacity of the retry queue. When full, the oldest queued request is dropped.
    pub max_queued_requests: usize,
    /// Total timeout for a single exchange. Only applies to the default `reqwest` sender.
    #[serde(with = "optional_millis")]
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            base_address: base_address.into(),
            ..Self::default()
        }
    }

    pub fn thrown_policy(mut self, policy: ThrownPolicy) -> Self {
        self.thrown_policy = policy;
        self
    }

    /// Enables the retry queue with the given interval between passes.
    pub fn retry_every(mut self, interval: Duration) -> Self {
        self.retry_on_connection_error = true;
        self.retry_interval = interval;
        self
    }

    pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = Some(attempts);
        self
    }

    pub fn max_queued_requests(mut self, capacity: usize) -> Self {
        self.max_queued_requests = capacity;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_address: "http://localhost/api/".to_string(),
            thrown_policy: ThrownPolicy::default(),
            retry_on_connection_error: false,
            retry_interval: Duration::from_millis(3000),
            max_retry_attempts: None,
            max_queued_requests: DEFAULT_MAX_QUEUED_REQUESTS,
            request_timeout: None,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
