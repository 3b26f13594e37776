//! Runtime configuration shared by the middleware stack and the proxy.

use std::time::Duration;

use crate::cli::Cli;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Adopt a client-supplied `X-Request-ID` instead of always minting one.
    pub allow_remote_request_id: bool,
    /// Upper bound on dialing a `CONNECT` destination.
    pub connect_timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_remote_request_id: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl From<&Cli> for ProxyConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            allow_remote_request_id: cli.allow_remote_request_id,
            connect_timeout: Duration::from_secs(cli.connect_timeout),
        }
    }
}
