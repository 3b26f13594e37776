//! `CONNECT` handling: dial, take over the client connection, relay.

use std::future::Future;
use std::io;
use std::time::Duration;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::{Instrument, Span};

use super::{error_response, tunnel};
use crate::error::ProxyError;
use crate::server::AppState;

pub async fn handle(state: &AppState, mut req: Request) -> Response {
    let uri = req.uri().to_string();
    let host = req
        .uri()
        .authority()
        .map(ToString::to_string)
        .unwrap_or_default();

    let destination = match dial(&host, state.config.connect_timeout).await {
        Ok(stream) => stream,
        Err(e) => {
            tracing::error!(error = %e, host = %host, "error connecting host");
            return error_response(StatusCode::SERVICE_UNAVAILABLE);
        }
    };

    let Some(on_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
        tracing::error!(
            error = %ProxyError::UpgradeUnavailable,
            "error getting hijack interface"
        );
        return error_response(StatusCode::INTERNAL_SERVER_ERROR);
    };

    // Runs after hyper has written the 200 below and released the raw
    // connection; the request span is carried into the task by hand.
    let span = Span::current();
    tokio::spawn(
        async move {
            let client = match on_upgrade.await {
                Ok(upgraded) => TokioIo::new(upgraded),
                Err(e) => {
                    tracing::error!(
                        error = %ProxyError::Upgrade(e),
                        "error hijacking client connection"
                    );
                    return;
                }
            };

            match tunnel::transfer(client, destination).await {
                Ok(transferred) => tracing::debug!(
                    uri = %uri,
                    client_to_destination = transferred.client_to_destination,
                    destination_to_client = transferred.destination_to_client,
                    "tunnel closed"
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    uri = %uri,
                    "error copying request/response data"
                ),
            }
        }
        .instrument(span),
    );

    // Empty 200: hyper sends the status line and then hands the
    // connection to `on_upgrade`.
    Response::default()
}

async fn dial(host: &str, timeout: Duration) -> Result<TcpStream, ProxyError> {
    if host.is_empty() {
        return Err(ProxyError::MissingAuthority);
    }
    bounded(host, timeout, TcpStream::connect(host)).await
}

/// Maps the outcome of a connection attempt limited to `timeout`.
async fn bounded<T>(
    host: &str,
    timeout: Duration,
    connect: impl Future<Output = io::Result<T>>,
) -> Result<T, ProxyError> {
    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(source)) => Err(ProxyError::Dial {
            host: host.to_string(),
            source,
        }),
        Err(_) => Err(ProxyError::DialTimeout {
            host: host.to_string(),
            timeout,
        }),
    }
}
