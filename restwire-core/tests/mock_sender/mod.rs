use http::StatusCode;
use parking_lot::Mutex;
use restwire_core::transport::{HttpRequest, HttpResponse, HttpSend, SendError};
use std::{collections::VecDeque, sync::Arc, time::Duration};

/// What the mock does with the next request.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(StatusCode, String),
    /// Fails as if the server could not be reached.
    Unreachable,
    /// Fails after reaching the server.
    Broken,
    /// Waits, then fails as if the server could not be reached.
    SlowUnreachable(Duration),
}

#[allow(dead_code)]
impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Reply::Respond(StatusCode::OK, body.into())
    }

    pub fn status(code: u16) -> Self {
        let status = StatusCode::from_u16(code).unwrap();
        Reply::Respond(status, format!("status {code}"))
    }
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Reply>,
    fallback: Option<Reply>,
    sent: Vec<HttpRequest>,
}

/// A scripted [`HttpSend`] that records every request it receives.
///
/// Replies queued with [`MockSender::then`] are used in order. Once the script runs out the
/// fallback reply is used, `200` with an empty body by default. Clones share their state, so
/// a test can keep a handle after moving the sender into a client.
#[derive(Clone, Default)]
pub struct MockSender {
    state: Arc<Mutex<MockState>>,
}

#[allow(dead_code)]
impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn always(reply: Reply) -> Self {
        let sender = Self::new();
        sender.state.lock().fallback = Some(reply);
        sender
    }

    pub fn then(self, reply: Reply) -> Self {
        self.state.lock().script.push_back(reply);
        self
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.state.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn last(&self) -> HttpRequest {
        self.state
            .lock()
            .sent
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait::async_trait]
impl HttpSend for MockSender {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, SendError> {
        let reply = {
            let mut state = self.state.lock();
            state.sent.push(request.clone());
            state
                .script
                .pop_front()
                .or_else(|| state.fallback.clone())
                .unwrap_or_else(|| Reply::ok(""))
        };

        match reply {
            Reply::Respond(status, body) => Ok(HttpResponse::new(status, body)),
            Reply::Unreachable => Err(SendError::Connect("connection refused".into())),
            Reply::Broken => Err(SendError::Other("connection reset by peer".into())),
            Reply::SlowUnreachable(delay) => {
                tokio::time::sleep(delay).await;
                Err(SendError::Connect("connection timed out".into()))
            }
        }
    }
}
