use postman_mcp_core::{ArgumentError, ErrorEnvelope, ErrorKind, UpstreamError, ValidationError};
use serde_json::{json, Value};

/// Context carried with every tool call through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub operation: String,
    pub timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            call_id,
            operation: operation.into(),
            timeout_ms,
        }
    }
}

/// One invocation entering the pipeline: the operation name and the raw,
/// unvalidated argument bag.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub ctx: OperationContext,
    pub arguments: Value,
}

impl ToolCall {
    #[must_use]
    pub fn new(ctx: OperationContext, arguments: Value) -> Self {
        Self { ctx, arguments }
    }

    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        &self.ctx
    }
}

/// Errors produced while routing or executing a tool call.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("Unknown tool: {name}")]
    UnknownOperation { name: String },
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },
    #[error("Tool {operation} cannot operate on resource {uri}")]
    ResourceNotHandled { operation: String, uri: String },
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for OperationError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidArguments {
            message: err.to_string(),
        }
    }
}

impl From<ArgumentError> for OperationError {
    fn from(err: ArgumentError) -> Self {
        Self::InvalidArguments {
            message: err.to_string(),
        }
    }
}

impl OperationError {
    /// Classifies this failure into the taxonomy surfaced at the boundary.
    #[must_use]
    pub fn into_envelope(self) -> ErrorEnvelope {
        match self {
            Self::UnknownOperation { ref name } => {
                let data = json!({ "name": name });
                ErrorEnvelope::new(ErrorKind::UnknownOperation, self.to_string()).with_data(data)
            }
            Self::InvalidArguments { .. } => {
                ErrorEnvelope::new(ErrorKind::InvalidArguments, self.to_string())
            }
            Self::ResourceNotHandled { ref uri, .. } => {
                let data = json!({ "uri": uri });
                ErrorEnvelope::new(ErrorKind::ResourceNotHandled, self.to_string()).with_data(data)
            }
            Self::Upstream(err) => err.into(),
            Self::Timeout { timeout_ms } => ErrorEnvelope::new(
                ErrorKind::TransportFailure,
                format!("No response from upstream: operation timed out after {timeout_ms}ms"),
            ),
            Self::Internal(err) => ErrorEnvelope::new(
                ErrorKind::UpstreamInternal,
                format!("Internal error: {err:#}"),
            ),
        }
    }
}
