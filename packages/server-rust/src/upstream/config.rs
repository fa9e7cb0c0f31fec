//! Upstream connection settings.

use std::fmt;
use std::time::Duration;

/// Postman public API.
pub const DEFAULT_BASE_URL: &str = "https://api.getpostman.com";

/// Settings fixed at startup and shared by every outbound call.
#[derive(Clone)]
pub struct UpstreamConfig {
    /// Base address every endpoint path is appended to.
    pub base_url: String,
    /// Sent as `X-Api-Key` on every request.
    pub api_key: String,
    /// Client-wide deadline covering connect, send and body read.
    pub request_timeout: Duration,
}

impl UpstreamConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
