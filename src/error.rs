//! Unified error types for sproxy.
//!
//! [`SproxyError`] covers process startup (binding and serving the
//! listener). [`ProxyError`] covers everything that can go wrong while
//! handling a single proxied request; none of its variants are fatal to
//! the process.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SproxyError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ProxyError {
    #[error("CONNECT request has no destination authority")]
    MissingAuthority,

    #[error("dial {host}: timed out after {}s", timeout.as_secs())]
    DialTimeout { host: String, timeout: Duration },

    #[error("dial {host}: {source}")]
    Dial {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection does not support takeover")]
    UpgradeUnavailable,

    #[error("connection takeover failed: {0}")]
    Upgrade(#[source] hyper::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}
