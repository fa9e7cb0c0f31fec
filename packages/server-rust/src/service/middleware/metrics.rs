//! Call instrumentation via `tracing` spans.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use serde_json::Value;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{OperationError, ToolCall};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that records duration and outcome of every tool call.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<ToolCall> for MetricsService<S>
where
    S: Service<ToolCall, Response = Value, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = Value;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: ToolCall) -> Self::Future {
        let operation = call.ctx().operation.clone();
        let call_id = call.ctx().call_id;

        let span = info_span!(
            "tool_call",
            operation = %operation,
            call_id = call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(call);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;

                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(OperationError::UnknownOperation { .. }) => "unknown_operation",
                    Err(OperationError::InvalidArguments { .. }) => "invalid_arguments",
                    Err(OperationError::ResourceNotHandled { .. }) => "resource_not_handled",
                    Err(OperationError::Upstream(_)) => "upstream_error",
                    Err(OperationError::Timeout { .. }) => "timeout",
                    Err(OperationError::Internal(_)) => "internal_error",
                };

                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                match &result {
                    Ok(_) => tracing::info!(duration_ms, outcome, "operation complete"),
                    Err(err) => {
                        tracing::info!(duration_ms, outcome, error = %err, "operation failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
