//! # Call Translator
//!
//! This module turns an abstract call ("invoke this operation with these arguments") into a
//! concrete [`RequestPlan`].
//!
//! The translation is a pure function of the contract metadata, the argument values and the
//! caller's [`RestCallConfig`]:
//!
//! 1. **Route**: the service base route and the action route template are joined with `/` and
//!    every `{name}` / `{name:constraint}` placeholder is replaced by the matching path argument,
//!    percent-encoded as a single segment.
//! 2. **Headers**: header-bound arguments, the `x-api-version` header and the caller's extra
//!    headers, in that order. Later writes win.
//! 3. **Body**: the single body-bound argument, verbatim.
//! 4. **Query**: query-bound arguments followed by the caller's extra query entries.
//! 5. **Expected response**: derived from the action's declared return shape.
//!
//! Translation failures always indicate a mistake in the contract definition, so they are never
//! subject to the transport failure policy.
pub mod query;
mod plan;

pub use plan::*;

use crate::contract::{
    ActionDescriptor, BindingKind, MetadataError, ParameterBinding, QueryEncoding, Returns,
    ServiceDescriptor,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Name of the header carrying the contract version.
pub const VERSION_HEADER: &str = "x-api-version";

static NULL: Value = Value::Null;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(.+?)\}").expect("valid route placeholder pattern"));

/// Errors that can occur while translating a call into a request plan.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error("Route parameter '{parameter}' of action '{action}' has no path binding")]
    RouteParameterMissing { action: String, parameter: String },
    #[error("Invalid binding on action '{action}': {reason}")]
    InvalidBinding { action: String, reason: String },
    #[error("Route parameter '{parameter}' of action '{action}' cannot be '{value}'")]
    InvalidPathValue {
        action: String,
        parameter: String,
        value: String,
    },
}

/// Builds the request plan for one call.
///
/// # Arguments
///
/// * `service` - Metadata of the contract the action belongs to.
/// * `action` - Metadata of the invoked operation.
/// * `args` - The call arguments, keyed by their source parameter name. Missing arguments are
///   treated as `null`.
/// * `config` - Optional caller overlay of extra headers and query entries.
///
/// # Returns
///
/// * `Ok(RequestPlan)` - The ready-to-send plan.
/// * `Err(TranslateError)` - If a placeholder has no path binding or the action declares more
///   than one body binding.
pub fn build_plan(
    service: &ServiceDescriptor,
    action: &ActionDescriptor,
    args: &Map<String, Value>,
    config: Option<&RestCallConfig>,
) -> Result<RequestPlan, TranslateError> {
    let body = body_argument(action, args)?;
    let route = build_route(service, action, args)?;
    let query = build_query(action, args, config);

    let url = if query.is_empty() {
        route
    } else {
        format!("{route}?{}", query.join("&"))
    };

    let mut plan = RequestPlan::new(action.method.into(), url);
    plan.headers = build_headers(service, action, args, config);
    plan.body = body;
    plan.expected = expected_shape(action);
    plan.requires_authorization = service.requires_authorization || action.requires_authorization;

    Ok(plan)
}

fn argument<'a>(args: &'a Map<String, Value>, binding: &ParameterBinding) -> &'a Value {
    args.get(&binding.source_name).unwrap_or(&NULL)
}

fn bindings_of(
    action: &ActionDescriptor,
    kind: BindingKind,
) -> impl Iterator<Item = &ParameterBinding> {
    action.bindings.iter().filter(move |b| b.kind == kind)
}

fn body_argument(
    action: &ActionDescriptor,
    args: &Map<String, Value>,
) -> Result<Option<Value>, TranslateError> {
    let mut bodies = bindings_of(action, BindingKind::Body);

    let Some(binding) = bodies.next() else {
        return Ok(None);
    };

    if let Some(extra) = bodies.next() {
        return Err(TranslateError::InvalidBinding {
            action: action.name.clone(),
            reason: format!(
                "parameters '{}' and '{}' are both bound to the body",
                binding.source_name, extra.source_name
            ),
        });
    }

    Ok(Some(argument(args, binding).clone()))
}

fn build_route(
    service: &ServiceDescriptor,
    action: &ActionDescriptor,
    args: &Map<String, Value>,
) -> Result<String, TranslateError> {
    let segments = [
        Some(service.base_route.as_str()),
        action.route_template.as_deref(),
    ];

    let mut resolved = Vec::with_capacity(segments.len());
    for segment in segments.into_iter().flatten() {
        if segment.is_empty() {
            continue;
        }
        resolved.push(resolve_placeholders(segment, action, args)?);
    }

    Ok(resolved.join("/"))
}

fn resolve_placeholders(
    template: &str,
    action: &ActionDescriptor,
    args: &Map<String, Value>,
) -> Result<String, TranslateError> {
    let mut route = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        let parameter = inner
            .as_str()
            .split_once(':')
            .map_or(inner.as_str(), |(name, _constraint)| name);

        let binding = bindings_of(action, BindingKind::Path)
            .find(|b| match &b.bound_name {
                Some(bound) => bound == parameter,
                None => b.source_name == parameter,
            })
            .ok_or_else(|| TranslateError::RouteParameterMissing {
                action: action.name.clone(),
                parameter: parameter.to_string(),
            })?;

        let value = query::scalar_to_string(argument(args, binding));
        if value == "." || value == ".." {
            return Err(TranslateError::InvalidPathValue {
                action: action.name.clone(),
                parameter: parameter.to_string(),
                value,
            });
        }

        route.push_str(&template[last..whole.start()]);
        route.push_str(&query::encode_segment(&value));
        last = whole.end();
    }

    route.push_str(&template[last..]);
    Ok(route)
}

fn build_headers(
    service: &ServiceDescriptor,
    action: &ActionDescriptor,
    args: &Map<String, Value>,
    config: Option<&RestCallConfig>,
) -> Vec<(String, String)> {
    let mut headers = Vec::new();

    for binding in bindings_of(action, BindingKind::Header) {
        upsert_header(
            &mut headers,
            binding.wire_name(),
            query::scalar_to_string(argument(args, binding)),
        );
    }

    let version = action
        .version_override
        .as_deref()
        .or(service.version.as_deref())
        .filter(|v| !v.is_empty());

    if let Some(version) = version {
        upsert_header(&mut headers, VERSION_HEADER, version);
    }

    if let Some(config) = config {
        for (key, value) in &config.extra_headers {
            upsert_header(&mut headers, key.as_str(), value.as_str());
        }
    }

    headers
}

fn build_query(
    action: &ActionDescriptor,
    args: &Map<String, Value>,
    config: Option<&RestCallConfig>,
) -> Vec<String> {
    let mut entries = Vec::new();

    for binding in bindings_of(action, BindingKind::Query) {
        let value = argument(args, binding);

        match binding.query_encoding {
            QueryEncoding::Raw => {
                // Objects spread their fields at the top level, everything else keeps its name.
                let prefix = if value.is_object() {
                    ""
                } else {
                    binding.wire_name()
                };
                entries.extend(query::encode_entries(value, prefix));
            }
            QueryEncoding::KeyValue => entries.push(format!(
                "{}={}",
                binding.wire_name(),
                query::encode_component(&query::scalar_to_string(value))
            )),
        }
    }

    if let Some(config) = config {
        for (key, value) in &config.query_parameters {
            if value.is_empty() {
                entries.push(key.clone());
            } else {
                entries.push(format!("{key}={value}"));
            }
        }
    }

    entries
}

fn expected_shape(action: &ActionDescriptor) -> ResponseShape {
    if action.return_is_success_only {
        return ResponseShape::None;
    }

    let payload = match &action.returns {
        Returns::Deferred(inner) => inner.as_ref(),
        other => other,
    };

    match payload {
        Returns::Nothing => ResponseShape::None,
        Returns::Text => ResponseShape::RawString,
        Returns::Value | Returns::Deferred(_) => ResponseShape::Typed,
    }
}
