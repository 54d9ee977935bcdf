//! # Echo Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide a REST server for integration
//! testing `restwire-core`. It is not intended for production use.
//!
//! Routes:
//!
//! - `ANY /status/{code}`: answers with the given status and the body `status {code}`.
//! - `GET /text`: answers `200` with the plain text body `hello`.
//! - `ANY /private/{*rest}`: answers `401` unless an `Authorization` header is present, then
//!   echoes like the fallback.
//! - anything else: answers `200` with a JSON description of the request:
//!   `{ "method", "path", "query", "headers", "body" }`. `query` is the raw query string,
//!   `headers` maps lowercase names to values and `body` is the parsed JSON body (or `null`).
use axum::{
    Json, Router,
    extract::Path,
    http::{HeaderMap, Method, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use serde_json::{Map, Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub fn router() -> Router {
    Router::new()
        .route("/status/{code}", any(status))
        .route("/text", get(text))
        .route("/private/{*rest}", any(private))
        .fallback(echo)
}

/// Serves [`router`] on an ephemeral localhost port and returns its address.
pub async fn spawn() -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let _ = axum::serve(listener, router()).await;
    });

    Ok(addr)
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status").into_response(),
    }
}

async fn text() -> &'static str {
    "hello"
}

async fn private(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
    if !headers.contains_key(AUTHORIZATION) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    echo(method, uri, headers, body).await.into_response()
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_string(), Value::String(value.to_string())))
        })
        .collect();

    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or(Value::String(body))
    };

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": headers,
        "body": body,
    }))
}
