//! Correlation-field injection for log records.
//!
//! Two pieces cooperate:
//!
//! - [`RequestIdLayer`] watches span creation and stores the `request-id`
//!   field of a span in that span's extensions.
//! - [`RequestIdFormat`] decorates any event formatter. When the record
//!   being formatted sits under a span carrying a token, the token is
//!   appended to the record as a `request-id` field.

use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::middleware::request_id::{RequestId, REQUEST_ID_FIELD};

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = RequestIdVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(token), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(token);
        }
    }
}

#[derive(Default)]
struct RequestIdVisitor(Option<RequestId>);

impl Visit for RequestIdVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == REQUEST_ID_FIELD && !value.is_empty() {
            self.0 = Some(RequestId::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == REQUEST_ID_FIELD {
            let value = format!("{value:?}");
            if !value.is_empty() {
                self.0 = Some(RequestId::from(value));
            }
        }
    }
}

/// Event formatter decorator adding the `request-id` field.
#[derive(Debug, Clone, Default)]
pub struct RequestIdFormat<F> {
    inner: F,
}

impl<F> RequestIdFormat<F> {
    #[must_use]
    pub const fn new(inner: F) -> Self {
        Self { inner }
    }

    /// Derives the wrapped formatter while keeping the decoration.
    #[must_use]
    pub fn map_inner<G>(self, f: impl FnOnce(F) -> G) -> RequestIdFormat<G> {
        RequestIdFormat::new(f(self.inner))
    }
}

impl<S, N, F> FormatEvent<S, N> for RequestIdFormat<F>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    F: FormatEvent<S, N>,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let Some(id) = lookup(ctx) else {
            return self.inner.format_event(ctx, writer, event);
        };

        let mut record = String::new();
        self.inner.format_event(ctx, Writer::new(&mut record), event)?;
        writer.write_str(&append_field(&record, &id))
    }
}

/// Nearest token in the record's span scope, innermost span first.
fn lookup<S, N>(ctx: &FmtContext<'_, S, N>) -> Option<RequestId>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    ctx.event_scope()?.find_map(|span| {
        let extensions = span.extensions();
        extensions.get::<RequestId>().cloned()
    })
}

/// Appends the token to one formatted record.
///
/// JSON objects get a `"request-id"` member; anything else gets a
/// `request-id=<token>` pair at the end of its first line.
fn append_field(record: &str, id: &RequestId) -> String {
    let mut out = String::with_capacity(record.len() + id.as_str().len() + 16);

    let body = record.trim_end_matches('\n');
    let newlines = &record[body.len()..];
    if body.starts_with('{') && body.ends_with('}') {
        let head = &body[..body.len() - 1];
        let value = serde_json::to_string(id.as_str()).unwrap_or_else(|_| "\"\"".into());
        let sep = if head.trim_end().ends_with('{') { "" } else { "," };
        let _ = write!(out, "{head}{sep}\"{REQUEST_ID_FIELD}\":{value}}}{newlines}");
        return out;
    }

    let (first, rest) = record.split_at(record.find('\n').unwrap_or(record.len()));
    let _ = write!(out, "{first} {REQUEST_ID_FIELD}={id}{rest}");
    out
}
