//! Absolute-URI request forwarding.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use http_body_util::BodyExt;
use tracing::Span;

use super::error_response;
use super::headers::strip_hop_by_hop;
use crate::error::ProxyError;
use crate::server::AppState;

pub async fn handle(state: &AppState, req: Request) -> Response {
    let uri = req.uri().to_string();

    let response = match send(state, req).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, uri = %uri, "error sending request");
            return error_response(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);

    // The body is streamed after this handler returns, outside the request
    // span, so the span is carried along explicitly.
    let span = Span::current();
    let body = body.map_err(move |e| {
        span.in_scope(|| {
            tracing::error!(error = %e, uri = %uri, "error copying response body");
        });
        e
    });

    Response::from_parts(parts, Body::new(body))
}

async fn send(
    state: &AppState,
    req: Request,
) -> Result<hyper::Response<hyper::body::Incoming>, ProxyError> {
    let (parts, body) = req.into_parts();

    // Fresh request: inbound extensions (connection info, takeover handle,
    // request context) stay on this side of the proxy.
    let mut outbound = hyper::Request::new(body);
    *outbound.method_mut() = parts.method;
    *outbound.uri_mut() = parts.uri;
    *outbound.version_mut() = parts.version;
    *outbound.headers_mut() = parts.headers;
    strip_hop_by_hop(outbound.headers_mut());

    Ok(state.http_client.request(outbound).await?)
}
