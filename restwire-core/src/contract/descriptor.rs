use std::fmt;

/// The HTTP verbs an action can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Patch => http::Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for a whole service contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub base_route: String,
    pub version: Option<String>,
    pub requires_authorization: bool,
}

impl ServiceDescriptor {
    pub fn new(base_route: impl Into<String>) -> Self {
        Self {
            base_route: base_route.into(),
            version: None,
            requires_authorization: false,
        }
    }

    /// Sets the contract version sent in the `x-api-version` header.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn authorize(mut self, requires_authorization: bool) -> Self {
        self.requires_authorization = requires_authorization;
        self
    }
}

/// The declared return shape of an operation.
///
/// `Deferred` stands for a value that is produced later (the equivalent of a future of `T`).
/// The translator unwraps exactly one level of it before deciding how to read the response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Returns {
    #[default]
    Nothing,
    Text,
    Value,
    Deferred(Box<Returns>),
}

impl Returns {
    pub fn deferred(inner: Returns) -> Self {
        Returns::Deferred(Box::new(inner))
    }
}

/// Where the value of an argument goes in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Path,
    Header,
    Query,
    Body,
}

/// How a query-bound argument is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueryEncoding {
    /// Flattens the value recursively into as many query entries as needed.
    #[default]
    Raw,
    /// Emits exactly one `name=value` entry.
    KeyValue,
}

/// The declared source of one argument's value within a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBinding {
    pub source_name: String,
    pub kind: BindingKind,
    pub query_encoding: QueryEncoding,
    pub bound_name: Option<String>,
}

impl ParameterBinding {
    pub fn new(source_name: impl Into<String>, kind: BindingKind) -> Self {
        Self {
            source_name: source_name.into(),
            kind,
            query_encoding: QueryEncoding::default(),
            bound_name: None,
        }
    }

    pub fn path(source_name: impl Into<String>) -> Self {
        Self::new(source_name, BindingKind::Path)
    }

    pub fn header(source_name: impl Into<String>) -> Self {
        Self::new(source_name, BindingKind::Header)
    }

    pub fn query(source_name: impl Into<String>) -> Self {
        Self::new(source_name, BindingKind::Query)
    }

    pub fn body(source_name: impl Into<String>) -> Self {
        Self::new(source_name, BindingKind::Body)
    }

    /// Overrides the name used on the wire.
    pub fn named(mut self, bound_name: impl Into<String>) -> Self {
        self.bound_name = Some(bound_name.into());
        self
    }

    pub fn encoding(mut self, encoding: QueryEncoding) -> Self {
        self.query_encoding = encoding;
        self
    }

    /// The name used on the wire: the bound name if any, the source name otherwise.
    pub fn wire_name(&self) -> &str {
        self.bound_name.as_deref().unwrap_or(&self.source_name)
    }
}

/// Static metadata for one operation of a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub name: String,
    pub route_template: Option<String>,
    pub method: HttpMethod,
    pub requires_authorization: bool,
    pub return_is_success_only: bool,
    pub version_override: Option<String>,
    pub bindings: Vec<ParameterBinding>,
    pub returns: Returns,
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            name: name.into(),
            route_template: None,
            method,
            requires_authorization: true,
            return_is_success_only: false,
            version_override: None,
            bindings: Vec::new(),
            returns: Returns::Nothing,
        }
    }

    pub fn get(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Get)
    }

    pub fn post(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Post)
    }

    pub fn put(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Put)
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Delete)
    }

    pub fn patch(name: impl Into<String>) -> Self {
        Self::new(name, HttpMethod::Patch)
    }

    pub fn route(mut self, template: impl Into<String>) -> Self {
        self.route_template = Some(template.into());
        self
    }

    pub fn bind(mut self, binding: ParameterBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn returns(mut self, returns: Returns) -> Self {
        self.returns = returns;
        self
    }

    /// Reduces the result of the operation to a "request succeeded" flag.
    pub fn success_only(mut self) -> Self {
        self.return_is_success_only = true;
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version_override = Some(version.into());
        self
    }

    pub fn authorize(mut self, requires_authorization: bool) -> Self {
        self.requires_authorization = requires_authorization;
        self
    }

    /// Checks whether an incoming `method` and `route` address this action.
    ///
    /// Verbs and literal segments are compared case-insensitively and every `{...}` segment of
    /// the template matches any value. An action without a route only matches an empty route.
    pub fn matches(&self, method: &str, route: Option<&str>) -> bool {
        if !self.method.as_str().eq_ignore_ascii_case(method) {
            return false;
        }

        let template = self
            .route_template
            .as_deref()
            .filter(|t| !t.trim().is_empty());
        let route = route.filter(|r| !r.trim().is_empty());

        let (template, route) = match (template, route) {
            (None, None) => return true,
            (Some(template), Some(route)) => (template, route),
            _ => return false,
        };

        let template_segments: Vec<&str> = template.split('/').collect();
        let route_segments: Vec<&str> = route.split('/').collect();

        if template_segments.len() != route_segments.len() {
            return false;
        }

        template_segments
            .iter()
            .zip(route_segments.iter())
            .all(|(expected, actual)| {
                (expected.starts_with('{') && expected.ends_with('}'))
                    || expected.eq_ignore_ascii_case(actual)
            })
    }
}
