use crate::BoxError;
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use url::Url;

/// A fully resolved outbound request, ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// The status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The response returned to callers in place of a request that never reached the server.
    pub(crate) fn unreachable() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, String::new())
    }
}

/// Why a request produced no response at all.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The server could not be reached (refused, unresolvable, timed out).
    /// Only these failures are eligible for retry.
    #[error("connection failed: {0}")]
    Connect(#[source] BoxError),
    #[error("request failed: {0}")]
    Other(#[source] BoxError),
}

/// The HTTP primitive used by [`super::RestClient`].
///
/// Implementations perform a single exchange and classify failures. Any non-2xx status
/// is a successful exchange from this trait's point of view.
#[async_trait]
pub trait HttpSend: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SendError>;
}

/// [`HttpSend`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    /// Builds the underlying `reqwest` client.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Total timeout applied to every request. `None` leaves requests unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestSender {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SendError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse { status, body })
    }
}

fn classify(err: reqwest::Error) -> SendError {
    if err.is_connect() || err.is_timeout() {
        SendError::Connect(err.into())
    } else {
        SendError::Other(err.into())
    }
}
