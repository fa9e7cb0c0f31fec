//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use super::timeout::{TimeoutLayer, TimeoutService};
use crate::service::config::ServerConfig;
use crate::service::router::ToolRouter;

/// Concrete service stack produced by [`build_operation_pipeline`].
pub type OperationPipeline = TimeoutService<MetricsService<ToolRouter>>;

/// Build the operation pipeline by wrapping the `ToolRouter` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `TimeoutLayer` -- per-call deadline
/// 2. `MetricsLayer` -- timing and outcome, closest to the handler
///
/// The per-call deadline itself comes from each call's context, which the
/// dispatcher fills from `config.operation_timeout_ms`.
#[must_use]
pub fn build_operation_pipeline(router: ToolRouter, config: &ServerConfig) -> OperationPipeline {
    tracing::debug!(
        operation_timeout_ms = config.operation_timeout_ms,
        "building operation pipeline"
    );
    ServiceBuilder::new()
        .layer(TimeoutLayer)
        .layer(MetricsLayer)
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use postman_mcp_core::{Arguments, ObjectShape, OperationDefinition};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::{OperationContext, OperationError, ToolCall};
    use crate::service::registry::OperationRegistry;
    use crate::traits::ToolHandler;

    struct SleepyModule;

    #[async_trait]
    impl ToolHandler for SleepyModule {
        fn module(&self) -> &'static str {
            "monitors"
        }

        fn definitions(&self) -> Vec<OperationDefinition> {
            vec![
                OperationDefinition::new("run_monitor", "", ObjectShape::new()),
                OperationDefinition::new("get_monitor", "", ObjectShape::new()),
            ]
        }

        async fn call(&self, operation: &str, _args: Arguments) -> Result<Value, OperationError> {
            if operation == "run_monitor" {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
            Ok(json!({ "operation": operation }))
        }
    }

    fn pipeline() -> OperationPipeline {
        let mut registry = OperationRegistry::new();
        registry.register(Arc::new(SleepyModule)).unwrap();
        build_operation_pipeline(
            ToolRouter::new(Arc::new(registry)),
            &ServerConfig::default(),
        )
    }

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let call = ToolCall::new(OperationContext::new(42, "get_monitor", 5000), json!({}));
        let resp = pipeline().oneshot(call).await.unwrap();
        assert_eq!(resp, json!({ "operation": "get_monitor" }));
    }

    #[tokio::test]
    async fn pipeline_enforces_call_deadline() {
        let call = ToolCall::new(OperationContext::new(43, "run_monitor", 20), json!({}));
        let err = pipeline().oneshot(call).await.unwrap_err();
        assert!(matches!(err, OperationError::Timeout { timeout_ms: 20 }));
    }
}
