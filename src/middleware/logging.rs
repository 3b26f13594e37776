//! Start/finish logging around every request.
//!
//! Runs inside the span installed by [`super::request_id::propagate`], so
//! both records carry the request's correlation token.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request};
use axum::middleware::Next;
use axum::response::Response;

pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let remote = remote_addr(&req);

    let start = Instant::now();
    tracing::info!(
        method = %method,
        uri = %uri,
        remote = %remote,
        "request started"
    );

    // The takeover handle rides in the request extensions, so CONNECT
    // handling below this layer still reaches the raw connection.
    let response = next.run(req).await;

    let status = response.status();
    let duration = start.elapsed();
    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            remote = %remote,
            status = status.as_u16(),
            duration = ?duration,
            "request finished"
        );
    } else {
        tracing::info!(
            method = %method,
            uri = %uri,
            remote = %remote,
            status = status.as_u16(),
            duration = ?duration,
            "request finished"
        );
    }

    response
}

fn remote_addr(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default()
}
