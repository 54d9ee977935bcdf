use serde_json::Value;

/// How the transport should read a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Only the success flag of the exchange matters.
    None,
    /// The body is returned as text.
    RawString,
    /// The body is decoded as JSON.
    Typed,
}

/// The fully resolved, ready-to-send description of one HTTP call.
///
/// A plan is built fresh for every call and consumed exactly once by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub method: http::Method,
    /// Relative to the client base address, with path substitutions and query string applied.
    pub url: String,
    /// Ordered headers. Keys are unique (compared case-insensitively).
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub expected: ResponseShape,
    pub requires_authorization: bool,
}

impl RequestPlan {
    pub fn new(method: http::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            expected: ResponseShape::None,
            requires_authorization: false,
        }
    }

    /// Returns the value of a header, comparing keys case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing the value in place when the key already exists.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        upsert_header(&mut self.headers, key, value);
    }
}

/// Inserts a header into an ordered header list, replacing the value in place when the key
/// already exists.
pub(crate) fn upsert_header(
    headers: &mut Vec<(String, String)>,
    key: impl Into<String>,
    value: impl Into<String>,
) {
    let key = key.into();
    let value = value.into();

    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
        Some(entry) => entry.1 = value,
        None => headers.push((key, value)),
    }
}

/// Caller-supplied overlay merged into a plan after the descriptor-derived values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestCallConfig {
    pub extra_headers: Vec<(String, String)>,
    pub query_parameters: Vec<(String, String)>,
}

impl RestCallConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((key.into(), value.into()));
        self
    }

    /// Appends a query entry verbatim. An empty value produces a bare flag.
    pub fn add_query_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters.push((key.into(), value.into()));
        self
    }

    /// Appends the `api-version` query entry.
    pub fn add_version(self, version: impl Into<String>) -> Self {
        self.add_query_parameter("api-version", version)
    }
}
