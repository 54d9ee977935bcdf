use crate::BoxError;
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

/// Which failures the transport raises as errors instead of folding them into the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrownPolicy {
    /// Nothing is raised. Failed exchanges come back as failure-shaped responses.
    None,
    /// Client errors (4xx except 401) are raised as [`TransportError::DomainError`].
    #[default]
    OnlyDomainErrors,
    /// Client errors, server errors and send failures are all raised.
    All,
}

/// Notifications published by a [`super::RestClient`].
///
/// Events are fire-and-forget: they are delivered to every live subscriber and dropped when
/// nobody listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestEvent {
    /// The server answered 401.
    Unauthorized { url: String },
    /// The server answered 403.
    Forbidden { url: String },
    /// A request could not reach the server.
    ConnectionError { request_id: u64, url: String },
    /// The server answered with a 5xx status.
    ServerError { url: String, status: StatusCode },
    /// A queued request exhausted its retry attempts and was dropped.
    RetryAbandoned {
        request_id: u64,
        url: String,
        attempts: u32,
    },
}

/// The decoded result of an exchange, shaped by the plan's expected response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Whether the exchange succeeded (2xx).
    Success(bool),
    /// The raw body of a successful exchange.
    Text(Option<String>),
    /// The JSON body of a successful exchange. `None` for failures and empty bodies.
    Json(Option<Value>),
}

impl Response {
    /// Whether the response carries a success flag or a payload.
    pub fn is_success(&self) -> bool {
        match self {
            Response::Success(ok) => *ok,
            Response::Text(body) => body.is_some(),
            Response::Json(body) => body.is_some(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Server rejected the request with {code}: {message}")]
    DomainError { code: StatusCode, message: String },
    #[error("Server failed with {code}: {message}")]
    RemoteServerError { code: StatusCode, message: String },
    #[error("Could not connect to '{url}': {source}")]
    ConnectionFailure {
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("Request failed: {0}")]
    Request(#[source] BoxError),
    /// The URL could not be parsed, or resolved outside the client's base address.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("Failed to encode the request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to decode the response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl TransportError {
    /// The HTTP status that caused the error, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::DomainError { code, .. }
            | TransportError::RemoteServerError { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors creating a [`super::RestClient`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid base address: {0}")]
    InvalidBaseAddress(#[from] url::ParseError),
    #[error("Failed to build the HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}
