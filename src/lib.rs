//! sproxy is an HTTP forward proxy.
//!
//! It forwards absolute-URI requests (`GET http://host/path`) to their
//! destination and opens opaque byte tunnels for `CONNECT host:port`
//! requests. Every request is tagged with a correlation ID that appears on
//! each log record emitted while handling it.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`config`] -- Runtime options shared by the middleware and the proxy.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup and correlation-field injection.
//! - [`middleware`] -- Request ID propagation and start/finish request logging.
//! - [`proxy`] -- Request dispatch, forwarding, `CONNECT` handling, and the
//!   tunnel relay.
//! - [`run`] -- Process entry: logging, listener, graceful shutdown.
//! - [`server`] -- Shared application state, HTTP client, router assembly.

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod proxy;
pub mod run;
pub mod server;
