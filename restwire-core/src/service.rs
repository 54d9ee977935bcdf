//! # Client Facade
//!
//! [`RestService`] is the entry point application code talks to. It owns the contract
//! metadata, asks the translator for a [`RequestPlan`], hands it to the [`RestClient`] and
//! decodes the [`Response`] into the caller's type.
//!
//! A call is described with a [`Call`] value: the action name plus the named arguments.
//! Typed adapters are thin wrappers that build the `Call` for each operation:
//!
//! ```rust,no_run
//! use restwire_core::{RestService, contract::Contract, service::{Call, CallError}};
//! # use restwire_core::contract::ContractDescriptor;
//! # struct Orders;
//! # impl Contract for Orders { fn descriptor() -> ContractDescriptor { ContractDescriptor::new("Orders") } }
//! # #[derive(serde::Deserialize)] struct Order;
//!
//! struct OrdersClient(RestService<Orders>);
//!
//! impl OrdersClient {
//!     async fn find(&self, id: u64) -> Result<Option<Order>, CallError> {
//!         self.0.call(Call::new("Find").arg("id", id), None).await
//!     }
//! }
//! ```
use crate::{
    contract::{Contract, ContractDescriptor},
    translate::{self, RequestPlan, TranslateError},
    transport::{Response, RestClient, ThrownPolicy, TransportError, codec},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{marker::PhantomData, sync::Arc};
use tracing::debug;

pub use crate::translate::RestCallConfig;

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Argument '{name}' could not be serialized: {reason}")]
    Argument { name: String, reason: String },
    #[error("Failed to decode the response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One invocation of a contract action.
#[derive(Debug, Clone, Default)]
pub struct Call {
    action: String,
    args: Map<String, Value>,
    invalid: Option<(String, String)>,
}

impl Call {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Adds a named argument.
    ///
    /// The value is serialized right away. A serialization failure is reported when the call
    /// is executed, as [`CallError::Argument`].
    pub fn arg(mut self, name: impl Into<String>, value: impl Serialize) -> Self {
        let name = name.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.args.insert(name, value);
            }
            Err(err) => {
                self.invalid.get_or_insert((name, err.to_string()));
            }
        }
        self
    }

    /// Adds an argument that is already a JSON value.
    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }
}

/// A typed client for the contract `C`.
pub struct RestService<C> {
    client: RestClient,
    descriptor: Arc<ContractDescriptor>,
    policy: Option<ThrownPolicy>,
    _contract: PhantomData<fn() -> C>,
}

impl<C> Clone for RestService<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            descriptor: self.descriptor.clone(),
            policy: self.policy,
            _contract: PhantomData,
        }
    }
}

impl<C> std::fmt::Debug for RestService<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestService")
            .field("contract", &self.descriptor.name())
            .field("client", &self.client)
            .finish()
    }
}

impl<C: Contract> RestService<C> {
    /// Creates a service, reading the contract's descriptor once.
    pub fn new(client: RestClient) -> Self {
        Self::with_descriptor(client, C::descriptor())
    }
}

impl<C> RestService<C> {
    /// Creates a service from an explicit descriptor.
    pub fn with_descriptor(client: RestClient, descriptor: ContractDescriptor) -> Self {
        Self {
            client,
            descriptor: Arc::new(descriptor),
            policy: None,
            _contract: PhantomData,
        }
    }

    /// Overrides the client's [`ThrownPolicy`] for every call made through this service.
    pub fn with_policy(mut self, policy: ThrownPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    /// Translates a call without sending it.
    pub fn plan(&self, call: &Call, config: Option<&RestCallConfig>) -> Result<RequestPlan, CallError> {
        if let Some((name, reason)) = &call.invalid {
            return Err(CallError::Argument {
                name: name.clone(),
                reason: reason.clone(),
            });
        }

        let service = self
            .descriptor
            .service_descriptor()
            .map_err(TranslateError::from)?;
        let action = self
            .descriptor
            .action_descriptor(&call.action)
            .map_err(TranslateError::from)?;

        Ok(translate::build_plan(service, action, &call.args, config)?)
    }

    /// Translates and sends a call, returning the transport's response untouched.
    pub async fn invoke(
        &self,
        call: Call,
        config: Option<RestCallConfig>,
    ) -> Result<Response, CallError> {
        let plan = self.plan(&call, config.as_ref())?;

        debug!(
            contract = self.descriptor.name(),
            action = call.action(),
            method = %plan.method,
            url = %plan.url,
            "Invoking action"
        );

        Ok(self.client.execute(plan, self.policy).await?)
    }

    /// Sends a call and decodes the result into `T`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(T))` - The decoded payload. For text responses `T` is read from a JSON
    ///   string and for success-only actions from a JSON boolean.
    /// * `Ok(None)` - The exchange failed without raising, or the body was empty.
    /// * `Err(CallError)` - Translation, transport or decoding failed.
    pub async fn call<T: DeserializeOwned>(
        &self,
        call: Call,
        config: Option<RestCallConfig>,
    ) -> Result<Option<T>, CallError> {
        let response = self.invoke(call, config).await?;
        decode(response)
    }

    /// Sends a call and reports whether it succeeded.
    pub async fn call_success(
        &self,
        call: Call,
        config: Option<RestCallConfig>,
    ) -> Result<bool, CallError> {
        Ok(self.invoke(call, config).await?.is_success())
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<Option<T>, CallError> {
    let value = match response {
        Response::Json(Some(value)) => value,
        Response::Text(Some(text)) => Value::String(text),
        Response::Success(ok) => Value::Bool(ok),
        Response::Json(None) | Response::Text(None) => return Ok(None),
    };

    codec::from_value(value).map(Some).map_err(CallError::Decode)
}
