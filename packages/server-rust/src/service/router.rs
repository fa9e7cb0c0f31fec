//! Tool routing: resolves a `ToolCall` to its registered handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use postman_mcp_core::schema::json_kind;
use serde_json::Value;
use tower::Service;

use super::operation::{OperationError, ToolCall};
use super::registry::OperationRegistry;

/// Optional argument naming a resource the call targets.
pub const RESOURCE_URI_ARG: &str = "resourceUri";

type BoxedFuture = Pin<Box<dyn Future<Output = Result<Value, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// ToolRouter
// ---------------------------------------------------------------------------

/// Innermost service of the pipeline.
///
/// Walks one call through `Received -> Validated -> Executing -> Completed`:
/// lookup by name, shape validation, the optional `resourceUri` capability
/// check, then the module handler. Any step can short-circuit with an
/// [`OperationError`].
#[derive(Debug, Clone)]
pub struct ToolRouter {
    registry: Arc<OperationRegistry>,
}

impl ToolRouter {
    #[must_use]
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self { registry }
    }
}

impl Service<ToolCall> for ToolRouter {
    type Response = Value;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, call: ToolCall) -> Self::Future {
        let registry = Arc::clone(&self.registry);
        Box::pin(async move {
            let ToolCall { ctx, arguments } = call;
            tracing::debug!(operation = %ctx.operation, call_id = ctx.call_id, "received");

            let op = registry
                .lookup(&ctx.operation)
                .ok_or_else(|| OperationError::UnknownOperation {
                    name: ctx.operation.clone(),
                })?;

            let args = op.definition.input_shape.validate_arguments(arguments)?;
            tracing::debug!(operation = %ctx.operation, call_id = ctx.call_id, "validated");

            match args.get(RESOURCE_URI_ARG) {
                None | Some(Value::Null) => {}
                Some(Value::String(uri)) => {
                    if !op.handler.handles_resource(uri) {
                        return Err(OperationError::ResourceNotHandled {
                            operation: ctx.operation.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                Some(other) => {
                    return Err(OperationError::InvalidArguments {
                        message: format!(
                            "invalid value for `{RESOURCE_URI_ARG}`: expected string, found {}",
                            json_kind(other)
                        ),
                    });
                }
            }

            tracing::debug!(
                operation = %ctx.operation,
                call_id = ctx.call_id,
                module = op.module(),
                "executing"
            );
            op.handler.call(&op.definition.name, args).await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
