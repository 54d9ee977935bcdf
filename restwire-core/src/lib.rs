//! # Restwire Core
//!
//! `restwire-core` is a declarative REST client. Application code describes a call against a
//! service contract and the runtime translates it into an HTTP request, dispatches it with a
//! configurable failure policy and decodes the response back into a typed result.
//!
//! ## Key Components
//!
//! * **[`contract`]:** The metadata model. Contracts are described with explicit descriptor
//!   tables ([`contract::ServiceDescriptor`], [`contract::ActionDescriptor`],
//!   [`contract::ParameterBinding`]) instead of runtime annotations.
//! * **[`translate`]:** The call translator. A pure function turning a described call into a
//!   [`translate::RequestPlan`].
//! * **[`transport`]:** The resilient transport. [`RestClient`] owns the network exchange,
//!   applies the [`ThrownPolicy`] and runs the background retry worker for requests that
//!   failed at the connection level.
//! * **[`service`]:** The client facade. [`RestService`] composes the translator and the
//!   transport behind a single `call` entry point.
//! * **[`transform`]:** The versioned transform pipeline used to migrate payloads between
//!   contract versions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use restwire_core::{
//!     ClientConfig, RestClient, RestService,
//!     contract::{ActionDescriptor, Contract, ContractDescriptor, ParameterBinding, Returns, ServiceDescriptor},
//!     service::Call,
//! };
//!
//! struct Users;
//!
//! impl Contract for Users {
//!     fn descriptor() -> ContractDescriptor {
//!         ContractDescriptor::new("Users")
//!             .service(ServiceDescriptor::new("api/users"))
//!             .action(
//!                 ActionDescriptor::get("Find")
//!                     .route("{id:int}")
//!                     .bind(ParameterBinding::path("id"))
//!                     .returns(Returns::deferred(Returns::Value)),
//!             )
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::new(ClientConfig::new("http://localhost:8080/"))?;
//! let users = RestService::<Users>::new(client);
//!
//! let user: Option<serde_json::Value> = users.call(Call::new("Find").arg("id", 7), None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports `http` and `serde_json` so that consumers build plans and payloads
//! with the same versions the transport uses.
pub mod config;
pub mod contract;
pub mod model;
pub mod service;
pub mod transform;
pub mod translate;
pub mod transport;

pub use config::ClientConfig;
pub use service::RestService;
pub use transport::{RestClient, ThrownPolicy};

// Re-exports
pub use http;
pub use serde_json;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
