//! Command-line interface definitions using clap derive macros.
//!
//! Every flag has an environment variable equivalent for container
//! deployments.

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(
    name = "sproxy",
    version,
    about = "HTTP forward proxy with CONNECT tunnelling",
    after_help = "\x1b[1mExamples:\x1b[0m\n  \
        sproxy                                   Listen on localhost:8076\n  \
        sproxy --host 0.0.0.0 -p 3128            Listen on all interfaces\n  \
        sproxy --allow-remote-request-id         Trust upstream X-Request-ID\n\n  \
        curl -x http://localhost:8076 https://example.com"
)]
pub struct Cli {
    /// Listen address
    #[arg(long, env = "SPROXY_HOST", default_value = "localhost")]
    pub host: String,

    /// Listen port
    #[arg(short, long, env = "SPROXY_PORT", default_value_t = 8076)]
    pub port: u16,

    /// Adopt the client-supplied X-Request-ID header instead of minting one
    #[arg(long, env = "SPROXY_ALLOW_REMOTE_REQUEST_ID")]
    pub allow_remote_request_id: bool,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// CONNECT destination dial timeout in seconds
    #[arg(
        long,
        env = "SPROXY_CONNECT_TIMEOUT",
        default_value_t = 10,
        help_heading = "Tuning"
    )]
    pub connect_timeout: u64,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["sproxy"]).unwrap();
        assert_eq!(cli.host, "localhost");
        assert_eq!(cli.port, 8076);
        assert!(!cli.allow_remote_request_id);
        assert_eq!(cli.connect_timeout, 10);
    }

    #[test]
    fn pretty_and_json_conflict() {
        assert!(Cli::try_parse_from(["sproxy", "--pretty", "--json"]).is_err());
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "sproxy",
            "--host",
            "0.0.0.0",
            "-p",
            "3128",
            "--allow-remote-request-id",
            "--connect-timeout",
            "3",
            "-l",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 3128);
        assert!(cli.allow_remote_request_id);
        assert_eq!(cli.connect_timeout, 3);
        assert_eq!(cli.log_level.to_tracing_level(), tracing::Level::DEBUG);
    }
}
