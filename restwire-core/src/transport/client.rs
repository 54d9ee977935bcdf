use super::{
    codec,
    retry::{self, RetryQueue, RetrySettings},
    sender::{HttpRequest, HttpResponse, HttpSend, ReqwestSender, SendError},
    types::{BuildError, Response, RestEvent, ThrownPolicy, TransportError},
};
use crate::{
    config::ClientConfig,
    translate::{RequestPlan, ResponseShape},
};
use http::{
    HeaderMap, HeaderName, HeaderValue, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use url::Url;

const EVENT_CAPACITY: usize = 64;

/// The resilient HTTP transport.
///
/// A `RestClient` is cheap to clone: clones share the default headers, the base address,
/// the retry queue and the event channel.
#[derive(Clone)]
pub struct RestClient {
    shared: Arc<Shared>,
}

pub(super) struct Shared {
    sender: Arc<dyn HttpSend>,
    policy: RwLock<ThrownPolicy>,
    base_address: RwLock<Url>,
    headers: RwLock<HeaderMap>,
    pub(super) retry: RetrySettings,
    pub(super) queue: RetryQueue,
    events: broadcast::Sender<RestEvent>,
    next_request_id: AtomicU64,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_address", &self.shared.base_address.read().as_str())
            .field("thrown_policy", &*self.shared.policy.read())
            .field("queued", &self.shared.queue.len())
            .finish()
    }
}

impl RestClient {
    /// Creates a client that sends requests with `reqwest`.
    ///
    /// # Returns
    ///
    /// * `Ok(RestClient)` - The client, with no default headers set.
    /// * `Err(BuildError)` - If the base address is not an absolute URL or the HTTP client
    ///   could not be built.
    pub fn new(config: ClientConfig) -> Result<Self, BuildError> {
        let sender = ReqwestSender::new(config.request_timeout)?;
        Self::with_sender(config, sender)
    }

    /// Creates a client on top of any [`HttpSend`] implementation.
    pub fn with_sender(
        config: ClientConfig,
        sender: impl HttpSend + 'static,
    ) -> Result<Self, BuildError> {
        let base_address = parse_base_address(&config.base_address)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            shared: Arc::new(Shared {
                sender: Arc::new(sender),
                policy: RwLock::new(config.thrown_policy),
                base_address: RwLock::new(base_address),
                headers: RwLock::new(HeaderMap::new()),
                retry: RetrySettings {
                    enabled: config.retry_on_connection_error,
                    interval: config.retry_interval,
                    max_attempts: config.max_retry_attempts,
                    max_queued: config.max_queued_requests,
                },
                queue: RetryQueue::default(),
                events,
                next_request_id: AtomicU64::new(1),
            }),
        })
    }

    /// Executes a request plan.
    ///
    /// # Arguments
    ///
    /// * `plan` - The plan produced by the translator. Its URL is resolved against the base
    ///   address.
    /// * `policy` - Overrides the client's [`ThrownPolicy`] for this call.
    ///
    /// # Returns
    ///
    /// The response shaped by `plan.expected`, or the error selected by the policy. Requests
    /// that never reached the server are answered with a failure-shaped response unless the
    /// policy is [`ThrownPolicy::All`], and are queued for retry when retries are enabled.
    pub async fn execute(
        &self,
        plan: RequestPlan,
        policy: Option<ThrownPolicy>,
    ) -> Result<Response, TransportError> {
        let policy = policy.unwrap_or_else(|| self.thrown_policy());
        let expected = plan.expected;
        let request = self.prepare(plan)?;
        let request_id = self.shared.next_request_id.fetch_add(1, Ordering::Relaxed);

        let response = match self.shared.dispatch(request_id, &request, policy).await {
            Ok(response) => response,
            Err(TransportError::ConnectionFailure { url, .. }) if policy != ThrownPolicy::All => {
                self.shared
                    .publish(RestEvent::ConnectionError { request_id, url });

                if self.shared.retry.enabled {
                    retry::enqueue(&self.shared, request_id, request);
                }

                HttpResponse::unreachable()
            }
            Err(TransportError::Request(_)) if policy != ThrownPolicy::All => {
                HttpResponse::unreachable()
            }
            Err(err) => return Err(err),
        };

        shape_response(expected, response)
    }

    fn prepare(&self, plan: RequestPlan) -> Result<HttpRequest, TransportError> {
        let url = resolve_url(&self.shared.base_address.read(), &plan.url)?;

        let mut headers = self.shared.headers.read().clone();
        for (key, value) in &plan.headers {
            let (name, value) = parse_header(key, value)?;
            headers.insert(name, value);
        }

        if plan.requires_authorization && !headers.contains_key(AUTHORIZATION) {
            warn!(url = %url, "Request requires authorization but no credentials are set");
        }

        let body = match &plan.body {
            Some(body) => {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("application/json"));

                let json = codec::to_json(body).map_err(TransportError::Encode)?;
                Some(serde_json::to_vec(&json).map_err(TransportError::Encode)?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method: plan.method,
            url,
            headers,
            body,
        })
    }

    pub fn thrown_policy(&self) -> ThrownPolicy {
        *self.shared.policy.read()
    }

    pub fn set_thrown_policy(&self, policy: ThrownPolicy) {
        *self.shared.policy.write() = policy;
    }

    /// Adds a default header value, keeping any value already set for the key.
    pub fn add_header(&self, key: &str, value: &str) -> Result<(), TransportError> {
        let (name, value) = parse_header(key, value)?;
        self.shared.headers.write().append(name, value);
        Ok(())
    }

    /// Sets a default header, replacing every value already set for the key.
    pub fn add_single_header(&self, key: &str, value: &str) -> Result<(), TransportError> {
        let (name, value) = parse_header(key, value)?;
        self.shared.headers.write().insert(name, value);
        Ok(())
    }

    /// Removes a default header. Returns whether it was set.
    pub fn remove_header(&self, key: &str) -> bool {
        self.shared.headers.write().remove(key).is_some()
    }

    /// Sets the `Authorization` header to `"{scheme} {parameter}"`.
    pub fn add_authentication(&self, scheme: &str, parameter: &str) -> Result<(), TransportError> {
        self.add_single_header(AUTHORIZATION.as_str(), &format!("{scheme} {parameter}"))
    }

    /// Snapshot of the default headers.
    pub fn headers(&self) -> HeaderMap {
        self.shared.headers.read().clone()
    }

    pub fn base_address(&self) -> Url {
        self.shared.base_address.read().clone()
    }

    /// Points subsequent requests at a new base address. Queued requests keep their
    /// original URL.
    pub fn update_base_address(&self, address: &str) -> Result<(), TransportError> {
        let url = parse_base_address(address).map_err(|e| invalid_url(address, e))?;
        *self.shared.base_address.write() = url;
        Ok(())
    }

    /// Number of requests waiting in the retry queue.
    pub fn retry_count(&self) -> usize {
        self.shared.queue.len()
    }

    /// Drops every queued request. The retry worker stops after its current pass.
    pub fn clear_retries(&self) -> usize {
        self.shared.queue.clear()
    }

    /// Subscribes to the client's [`RestEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<RestEvent> {
        self.shared.events.subscribe()
    }
}

impl Shared {
    /// Sends one request and applies the status policy.
    ///
    /// Send failures are always returned as errors. Folding them into a response is the
    /// caller's decision.
    pub(super) async fn dispatch(
        &self,
        request_id: u64,
        request: &HttpRequest,
        policy: ThrownPolicy,
    ) -> Result<HttpResponse, TransportError> {
        debug!(request_id, method = %request.method, url = %request.url, "Sending request");

        let response = match self.sender.send(request).await {
            Ok(response) => response,
            Err(SendError::Connect(source)) => {
                warn!(request_id, url = %request.url, error = %source, "Connection failed");
                return Err(TransportError::ConnectionFailure {
                    url: request.url.to_string(),
                    source,
                });
            }
            Err(SendError::Other(source)) => {
                warn!(request_id, url = %request.url, error = %source, "Request failed");
                return Err(TransportError::Request(source));
            }
        };

        debug!(request_id, status = %response.status, "Received response");
        self.check_status(&request.url, response, policy)
    }

    fn check_status(
        &self,
        url: &Url,
        response: HttpResponse,
        policy: ThrownPolicy,
    ) -> Result<HttpResponse, TransportError> {
        let status = response.status;

        if status == StatusCode::UNAUTHORIZED {
            self.publish(RestEvent::Unauthorized {
                url: url.to_string(),
            });
            return Ok(response);
        }

        if status == StatusCode::FORBIDDEN {
            self.publish(RestEvent::Forbidden {
                url: url.to_string(),
            });
        }

        if status.is_client_error() && policy != ThrownPolicy::None {
            return Err(TransportError::DomainError {
                code: status,
                message: response.body,
            });
        }

        if status.is_server_error() {
            self.publish(RestEvent::ServerError {
                url: url.to_string(),
                status,
            });

            if policy == ThrownPolicy::All {
                return Err(TransportError::RemoteServerError {
                    code: status,
                    message: response.body,
                });
            }
        }

        Ok(response)
    }

    pub(super) fn publish(&self, event: RestEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

fn shape_response(expected: ResponseShape, response: HttpResponse) -> Result<Response, TransportError> {
    let ok = response.status.is_success();

    let response = match expected {
        ResponseShape::None => Response::Success(ok),
        ResponseShape::RawString => Response::Text(ok.then_some(response.body)),
        ResponseShape::Typed if ok && !response.body.trim().is_empty() => {
            let value = serde_json::from_str(&response.body).map_err(TransportError::Decode)?;
            Response::Json(Some(value))
        }
        ResponseShape::Typed => Response::Json(None),
    };

    Ok(response)
}

/// Parses an absolute base address, making sure relative plan URLs resolve below its path.
fn parse_base_address(address: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(address)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolves a plan URL against the base address.
///
/// The result must stay on the base origin and below the base path, so a plan can never
/// carry the client's default headers to another server.
fn resolve_url(base: &Url, relative: &str) -> Result<Url, TransportError> {
    let url = base
        .join(relative.trim_start_matches('/'))
        .map_err(|e| invalid_url(relative, e))?;

    if url.origin() != base.origin() {
        return Err(invalid_url(url.as_str(), "leaves the base address origin"));
    }
    if !url.path().starts_with(base.path()) {
        return Err(invalid_url(url.as_str(), "leaves the base address path"));
    }

    Ok(url)
}

fn invalid_url(url: &str, reason: impl ToString) -> TransportError {
    TransportError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_header(key: &str, value: &str) -> Result<(HeaderName, HeaderValue), TransportError> {
    let invalid = |reason: String| TransportError::InvalidHeader {
        name: key.to_string(),
        reason,
    };

    let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| invalid(e.to_string()))?;
    let value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_address_gets_a_trailing_slash() {
        let url = parse_base_address("http://blackdigital.com.br/api").unwrap();
        assert_eq!(url.as_str(), "http://blackdigital.com.br/api/");

        let url = parse_base_address("http://localhost:8080").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");

        assert!(parse_base_address("not a url").is_err());
    }

    #[test]
    fn plan_urls_resolve_below_the_base_path() {
        let base = parse_base_address("http://blackdigital.com.br/").unwrap();
        let url = base
            .join("api/serviceTest/Nome?Value=21&HttpStatus=OK")
            .unwrap();

        assert_eq!(
            url.as_str(),
            "http://blackdigital.com.br/api/serviceTest/Nome?Value=21&HttpStatus=OK"
        );
    }

    #[test]
    fn plan_urls_cannot_leave_the_base_address() {
        let base = parse_base_address("https://api.example.com/v1").unwrap();

        for relative in [
            "http://evil.test/steal",
            "https://api.example.com/admin",
            "../admin",
            "users/../../admin",
        ] {
            assert!(
                matches!(resolve_url(&base, relative), Err(TransportError::InvalidUrl { .. })),
                "{relative} should be rejected"
            );
        }

        assert_eq!(
            resolve_url(&base, "/users/7?x=1").unwrap().as_str(),
            "https://api.example.com/v1/users/7?x=1"
        );
        assert_eq!(resolve_url(&base, "").unwrap().as_str(), "https://api.example.com/v1/");
    }

    #[test]
    fn invalid_headers_are_reported_with_their_name() {
        let err = parse_header("bad header", "x").unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader { ref name, .. } if name == "bad header"));

        assert!(parse_header("x-ok", "line\nbreak").is_err());
    }

    #[test]
    fn failed_exchanges_shape_as_failures() {
        let failed = HttpResponse::unreachable();

        assert_eq!(
            shape_response(ResponseShape::None, failed.clone()).unwrap(),
            Response::Success(false)
        );
        assert_eq!(
            shape_response(ResponseShape::RawString, failed.clone()).unwrap(),
            Response::Text(None)
        );
        assert_eq!(
            shape_response(ResponseShape::Typed, failed).unwrap(),
            Response::Json(None)
        );
    }

    #[test]
    fn successful_exchanges_shape_their_body() {
        let ok = HttpResponse::new(StatusCode::OK, r#"{"id": 1}"#);

        assert_eq!(
            shape_response(ResponseShape::Typed, ok.clone()).unwrap(),
            Response::Json(Some(serde_json::json!({ "id": 1 })))
        );
        assert_eq!(
            shape_response(ResponseShape::RawString, ok).unwrap(),
            Response::Text(Some(r#"{"id": 1}"#.to_string()))
        );
        assert_eq!(
            shape_response(ResponseShape::Typed, HttpResponse::new(StatusCode::NO_CONTENT, ""))
                .unwrap(),
            Response::Json(None)
        );
        assert!(matches!(
            shape_response(ResponseShape::Typed, HttpResponse::new(StatusCode::OK, "<html>")),
            Err(TransportError::Decode(_))
        ));
    }
}
