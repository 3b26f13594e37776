//! Start the proxy server.
//!
//! Initializes logging, binds the listener, and serves the proxy with
//! graceful shutdown until Ctrl+C / SIGTERM.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::cli::Cli;
use crate::config::ProxyConfig;
use crate::error::SproxyError;
use crate::logging;
use crate::server::{self, AppState};

pub async fn execute(cli: Cli) -> Result<(), SproxyError> {
    let log_format = logging::resolve_format(cli.pretty, cli.json);
    logging::init(&cli.log_level, log_format);

    launch(&cli, server::shutdown_signal()).await
}

/// Binds and serves until `shutdown` resolves. Failures are logged before
/// being returned.
pub async fn launch<F>(cli: &Cli, shutdown: F) -> Result<(), SproxyError>
where
    F: Future<Output = ()>,
{
    let config = ProxyConfig::from(cli);
    tracing::info!(
        allow_remote_request_id = config.allow_remote_request_id,
        connect_timeout = ?config.connect_timeout,
        "starting service"
    );

    let listener = match bind(cli).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "error starting server");
            return Err(e);
        }
    };

    let router = server::build_router(Arc::new(AppState::new(config)));

    if let Err(e) = server::serve(listener, router, shutdown).await {
        let e = SproxyError::Io(e);
        tracing::error!(error = %e, "error running server");
        return Err(e);
    }

    tracing::info!("service stopped");
    Ok(())
}

async fn bind(cli: &Cli) -> Result<TcpListener, SproxyError> {
    let listener = TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .map_err(|source| SproxyError::Bind {
            addr: format!("{}:{}", cli.host, cli.port),
            source,
        })?;
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "service started");
    Ok(listener)
}
