//! Command-line and environment configuration.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::service::ServerConfig;
use crate::upstream::{UpstreamConfig, DEFAULT_BASE_URL};

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// MCP server exposing the Postman API as tools and resources over stdio.
#[derive(Parser)]
#[command(name = "postman-mcp", version)]
pub struct Cli {
    /// Postman API key.
    #[arg(long, env = "POSTMAN_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the Postman API.
    #[arg(long, env = "POSTMAN_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Deadline for one upstream HTTP request, in milliseconds.
    #[arg(long, env = "POSTMAN_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    pub request_timeout_ms: u64,

    /// Deadline for a whole tool call, in milliseconds.
    #[arg(long, env = "POSTMAN_OPERATION_TIMEOUT_MS", default_value_t = 45_000)]
    pub operation_timeout_ms: u64,

    /// How long shutdown waits for in-flight calls, in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub shutdown_grace_ms: u64,

    #[arg(
        long,
        value_enum,
        env = "POSTMAN_MCP_LOG_FORMAT",
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,
}

impl Cli {
    #[must_use]
    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig::new(self.api_key.clone())
            .with_base_url(self.base_url.clone())
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
    }

    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            operation_timeout_ms: self.operation_timeout_ms,
            shutdown_grace_ms: self.shutdown_grace_ms,
        }
    }
}
