//! # Resilient Transport
//!
//! This module owns the network exchange.
//!
//! [`RestClient::execute`] takes a [`crate::translate::RequestPlan`], resolves it against the
//! client's base address and default headers, sends it through an [`HttpSend`] implementation
//! and shapes the answer into a [`Response`].
//!
//! ## Failure handling
//!
//! What happens when an exchange fails is decided by the [`ThrownPolicy`]:
//!
//! | outcome                  | `None`             | `OnlyDomainErrors` | `All`                 |
//! |--------------------------|--------------------|--------------------|-----------------------|
//! | 401                      | event              | event              | event                 |
//! | 403 / other 4xx          | failure response   | `DomainError`      | `DomainError`         |
//! | 5xx                      | failure response   | failure response   | `RemoteServerError`   |
//! | server unreachable       | failure response   | failure response   | `ConnectionFailure`   |
//! | any other send failure   | failure response   | failure response   | `Request`             |
//!
//! Unreachable servers publish [`RestEvent::ConnectionError`] (unless the policy is `All`)
//! and, when [`crate::ClientConfig::retry_on_connection_error`] is set, the request is queued.
//! A single background worker re-sends queued requests every
//! [`crate::ClientConfig::retry_interval`] until they are delivered, fail for another
//! reason or run out of attempts.
//!
//! ## Events
//!
//! [`RestClient::subscribe`] returns a `tokio::sync::broadcast` receiver of [`RestEvent`]s.
pub mod codec;

mod client;
mod retry;
mod sender;
mod types;

pub use client::RestClient;
pub use sender::*;
pub use types::*;
