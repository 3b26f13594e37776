//! Forward-proxy request dispatch.
//!
//! [`dispatch`] is the Axum fallback that receives every request and
//! routes it by shape:
//!
//! - `CONNECT host:port` opens a byte tunnel ([`connect`], [`tunnel`]).
//! - Any other method with an absolute target (`GET http://host/path`) is
//!   forwarded to its destination ([`forward`]).
//! - Everything else was not addressed to a proxy and gets 405.

pub mod connect;
pub mod forward;
pub mod headers;
pub mod tunnel;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;

use crate::server::AppState;

pub async fn dispatch(State(state): State<Arc<AppState>>, req: Request) -> Response {
    if req.method() == Method::CONNECT {
        connect::handle(&state, req).await
    } else if req.uri().scheme().is_some() {
        forward::handle(&state, req).await
    } else {
        tracing::error!(
            method = %req.method(),
            uri = %req.uri(),
            "invalid method"
        );
        error_response(StatusCode::METHOD_NOT_ALLOWED)
    }
}

/// Plain-text response whose body is the status' reason phrase.
#[must_use]
pub fn error_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or_default();
    let mut response = Response::new(Body::from(format!("{reason}\n")));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
