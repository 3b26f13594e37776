//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the proxy
//! configuration and the outbound HTTP client), [`build_router`] for
//! constructing the middleware stack around the proxy, [`build_http_client`]
//! for the connection-pooled hyper client, [`serve`] for the accept loop,
//! and [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::middleware;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tower::{ServiceBuilder, ServiceExt};

use crate::config::ProxyConfig;
use crate::middleware::{logging, request_id};
use crate::proxy;

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Body>;

pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub http_client: HttpClient,
}

impl AppState {
    #[must_use]
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
            http_client: build_http_client(),
        }
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring` as the default.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

/// Every request goes through: request ID → logging → proxy dispatch.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(proxy::dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    Arc::clone(&state.config),
                    request_id::propagate,
                ))
                .layer(middleware::from_fn(logging::log_requests)),
        )
        .with_state(state)
}

/// Accepts HTTP/1 connections on `listener` until `signal` resolves, then
/// waits for in-flight connections to finish.
///
/// Connections are served with automatic `Date` headers off, so a tunnel
/// opens with exactly `HTTP/1.1 200 OK\r\n\r\n`, and with upgrades on, so
/// `CONNECT` handlers can take the raw connection over. Taken-over
/// connections are not tracked.
///
/// Accept failures that belong to a single connection are skipped; any other
/// accept failure stops the loop and is returned once the connections
/// already accepted have drained.
pub async fn serve<F>(listener: TcpListener, router: Router, signal: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let (signal_tx, signal_rx) = watch::channel(());
    let (close_tx, close_rx) = watch::channel(());
    let mut signal = pin!(signal);
    let mut outcome = Ok(());

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "error accepting connection");
                    continue;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            },
            () = &mut signal => break,
        };

        tokio::spawn(serve_connection(
            stream,
            remote,
            router.clone(),
            signal_rx.clone(),
            close_rx.clone(),
        ));
    }

    drop(listener);
    drop(close_rx);
    let _ = signal_tx.send(());
    close_tx.closed().await;
    outcome
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}

async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    router: Router,
    mut signal_rx: watch::Receiver<()>,
    close_rx: watch::Receiver<()>,
) {
    let service = service_fn(move |mut req: hyper::Request<Incoming>| {
        req.extensions_mut().insert(ConnectInfo(remote));
        router.clone().oneshot(req)
    });

    let mut conn = pin!(http1::Builder::new()
        .auto_date_header(false)
        .serve_connection(TokioIo::new(stream), service)
        .with_upgrades());

    let mut draining = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, remote = %remote, "connection error");
                }
                break;
            }
            _ = signal_rx.changed(), if !draining => {
                draining = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    }

    drop(close_rx);
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
    tracing::info!("stopping server");
}
