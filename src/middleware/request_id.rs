//! Per-request correlation tokens.
//!
//! [`propagate`] is the ingress middleware: it resolves a [`RequestId`]
//! for every inbound request, binds it into a fresh [`RequestContext`]
//! stored in the request extensions, and runs the rest of the stack inside
//! the context's logging span. Records emitted anywhere under that span
//! pick the token up through [`crate::logging::correlation`].

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, Span};

use crate::config::ProxyConfig;

/// Header consulted when remote request IDs are allowed.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Structured field name the token is logged under.
pub const REQUEST_ID_FIELD: &str = "request-id";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(Arc<str>);

impl RequestId {
    #[must_use]
    pub fn generate() -> Self {
        Self::from(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable request-scoped context.
///
/// Extending a context never mutates it: [`bind`](Self::bind) returns a new
/// value whose logging span is a child of the parent's span.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Option<RequestId>,
    span: Span,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: None,
            span: Span::none(),
        }
    }
}

impl RequestContext {
    /// Returns a context carrying `id`.
    ///
    /// A token is immutable once bound: binding onto a context that already
    /// carries one returns that context unchanged.
    #[must_use]
    pub fn bind(&self, id: RequestId) -> Self {
        if self.request_id.is_some() {
            return self.clone();
        }
        // error level so the span survives any enabled filter
        let span = tracing::error_span!(parent: &self.span, "request", "request-id" = %id);
        Self {
            request_id: Some(id),
            span,
        }
    }

    /// The bound token, or `""` when none is bound.
    #[must_use]
    pub fn request_id(&self) -> &str {
        self.request_id.as_ref().map_or("", RequestId::as_str)
    }

    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }
}

/// Picks the token for an inbound request.
#[must_use]
pub fn resolve(headers: &HeaderMap, allow_remote: bool) -> RequestId {
    let remote = if allow_remote {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    } else {
        None
    };
    remote.map_or_else(RequestId::generate, RequestId::from)
}

pub async fn propagate(
    State(config): State<Arc<ProxyConfig>>,
    mut req: Request,
    next: Next,
) -> Response {
    let id = resolve(req.headers(), config.allow_remote_request_id);
    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default()
        .bind(id);
    let span = ctx.span().clone();
    req.extensions_mut().insert(ctx);

    next.run(req).instrument(span).await
}
