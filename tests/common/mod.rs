//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use sproxy::config::ProxyConfig;
use sproxy::logging::{self, LogFormat, RequestIdLayer};
use sproxy::server::{self, AppState};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;

pub fn test_router(config: ProxyConfig) -> Router {
    server::build_router(Arc::new(AppState::new(config)))
}

/// Runs the proxy's own accept loop on an ephemeral port until the sender
/// fires.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = test_router(config);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        server::serve(listener, router, async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, shutdown_tx)
}

/// Serves an upstream `router` on an ephemeral port until the sender fires.
pub async fn serve(router: Router) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    (addr, shutdown_tx)
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Reads an HTTP response head byte by byte so no tunneled bytes are
/// consumed.
pub async fn read_head(stream: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).await.unwrap();
        assert_eq!(n, 1, "connection closed inside response head");
        head.push(byte[0]);
    }
    String::from_utf8(head).unwrap()
}

pub async fn send_connect(proxy: SocketAddr, target: SocketAddr) -> TcpStream {
    use tokio::io::AsyncWriteExt;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    stream
}

#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

pub struct BufferWriterHandle {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = BufferWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriterHandle {
            buffer: self.buffer.clone(),
        }
    }
}

impl Write for BufferWriterHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.buffer.lock().unwrap_or_else(|err| err.into_inner());
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Installs a JSON subscriber for the current thread, built from the
    /// same layers the binary uses.
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let filter = tracing_subscriber::filter::Targets::new()
            .with_target("sproxy", tracing::Level::TRACE);
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(RequestIdLayer)
            .with(logging::fmt_layer(LogFormat::Json, capture.clone()));
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn records(&self) -> Vec<serde_json::Value> {
        let guard = self.buffer.lock().unwrap_or_else(|err| err.into_inner());
        String::from_utf8_lossy(&guard)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub fn with_message(&self, message: &str) -> Vec<serde_json::Value> {
        self.records()
            .into_iter()
            .filter(|r| r["message"] == message)
            .collect()
    }
}
