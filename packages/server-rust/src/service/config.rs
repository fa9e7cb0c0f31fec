use std::time::Duration;

/// Server-level configuration for the operation pipeline.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline for a whole tool call, including compound upstream sequences.
    pub operation_timeout_ms: u64,
    /// How long shutdown waits for in-flight calls before abandoning them.
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 45_000,
            shutdown_grace_ms: 5_000,
        }
    }
}
