//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.
//!
//! Every record emitted while a request is in flight carries that
//! request's `request-id`; see [`correlation`].

pub mod correlation;

use tracing::Subscriber;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::cli::LogLevel;

pub use correlation::{RequestIdFormat, RequestIdLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Formatting layer writing to `writer`, with the correlation field
/// injected into every record.
///
/// Must be stacked on top of [`RequestIdLayer`] for tokens to be found.
pub fn fmt_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        // The token is added as a top-level member, so span dumps are off.
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_target(false)
            .map_event_format(RequestIdFormat::new)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .map_event_format(RequestIdFormat::new)
            .with_writer(writer)
            .boxed(),
    }
}

pub fn init(level: &LogLevel, format: LogFormat) {
    let filter = tracing_subscriber::filter::Targets::new().with_default(level.to_tracing_level());

    tracing_subscriber::registry()
        .with(filter)
        .with(RequestIdLayer)
        .with(fmt_layer(format, std::io::stdout))
        .init();
}
