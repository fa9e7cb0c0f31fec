//! Boundary between the protocol layer and the operation pipeline.
//!
//! Every tool invocation ends here as either a [`ResponseEnvelope`] or a
//! protocol-level [`ErrorEnvelope`]; nothing else escapes, panics included.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use postman_mcp_core::{
    ErrorEnvelope, OperationDefinition, ResourceContents, ResourceDefinition,
    ResourceTemplateDefinition, ResponseEnvelope, TemplateError,
};
use serde_json::Value;
use tower::ServiceExt;

use super::config::ServerConfig;
use super::domain::build_registry;
use super::middleware::{build_operation_pipeline, OperationPipeline};
use super::operation::{OperationContext, OperationError, ToolCall};
use super::registry::{OperationRegistry, RegistryError};
use super::resources::{postman_router, ResourceCatalog};
use super::router::ToolRouter;
use crate::traits::Upstream;

/// Startup failure while assembling the catalog.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("invalid resource template: {0}")]
    Template(#[from] TemplateError),
}

/// Owns the registry, the pipeline and the resource catalog.
pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
    pipeline: OperationPipeline,
    resources: ResourceCatalog,
    config: ServerConfig,
    next_call_id: AtomicU64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<OperationRegistry>,
        resources: ResourceCatalog,
        config: ServerConfig,
    ) -> Self {
        let pipeline = build_operation_pipeline(ToolRouter::new(Arc::clone(&registry)), &config);
        Self {
            registry,
            pipeline,
            resources,
            config,
            next_call_id: AtomicU64::new(1),
        }
    }

    /// Builds every feature module and the resource router against one upstream.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] on a duplicate operation name or a bad
    /// resource template. Both are programming errors and abort startup.
    pub fn build(upstream: Arc<dyn Upstream>, config: ServerConfig) -> Result<Self, BuildError> {
        let registry = Arc::new(build_registry(&upstream)?);
        let resources = ResourceCatalog::new(postman_router()?, upstream);
        Ok(Self::new(registry, resources, config))
    }

    /// Runs one tool call to completion.
    ///
    /// # Errors
    ///
    /// Returns the envelope of a protocol-level failure (unknown operation,
    /// invalid arguments, unhandled resource). Soft failures come back as
    /// `Ok` with `is_error` set.
    pub async fn invoke(&self, name: &str, raw: Value) -> Result<ResponseEnvelope, ErrorEnvelope> {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let ctx = OperationContext::new(call_id, name, self.config.operation_timeout_ms);
        let call = self.pipeline.clone().oneshot(ToolCall::new(ctx, raw));

        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::error!(operation = name, call_id, reason, "handler panicked");
                let err = anyhow::anyhow!("handler panicked: {reason}");
                Err(OperationError::Internal(err))
            }
        };

        match result {
            Ok(value) => Ok(ResponseEnvelope::success(&value)),
            Err(err) => {
                let envelope = err.into_envelope();
                if envelope.is_protocol() {
                    Err(envelope)
                } else {
                    Ok(envelope.into_response())
                }
            }
        }
    }

    /// Operation descriptors in catalog order.
    #[must_use]
    pub fn list_operations(&self) -> Vec<&OperationDefinition> {
        self.registry.all().collect()
    }

    #[must_use]
    pub fn list_resources(&self) -> &[ResourceDefinition] {
        self.resources.list_resources()
    }

    #[must_use]
    pub fn list_resource_templates(&self) -> &[ResourceTemplateDefinition] {
        self.resources.list_templates()
    }

    /// # Errors
    ///
    /// Returns an `InvalidResource` envelope for an unroutable URI, or the
    /// classified upstream failure.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<ResourceContents>, ErrorEnvelope> {
        self.resources.read(uri).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use postman_mcp_core::{Arguments, ErrorKind, ObjectShape, UpstreamError};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::testing::FakeUpstream;
    use crate::traits::ToolHandler;

    fn dispatcher(upstream: Arc<FakeUpstream>) -> Dispatcher {
        Dispatcher::build(upstream, ServerConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn missing_required_field_is_invalid_arguments() {
        let upstream = Arc::new(FakeUpstream::ok());
        let err = dispatcher(upstream.clone())
            .invoke("get_workspace", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArguments);
        assert!(err.message.contains("workspace_id"), "{}", err.message);
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_protocol_error() {
        let err = dispatcher(Arc::new(FakeUpstream::ok()))
            .invoke("not_a_real_tool", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownOperation);
        assert_eq!(err.message, "Unknown tool: not_a_real_tool");
    }

    #[tokio::test]
    async fn upstream_not_found_is_soft() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Err(UpstreamError::NotFound {
                message: "environment not found".to_string(),
            })
        }));
        let envelope = dispatcher(upstream)
            .invoke("get_environment", json!({ "environment_id": "missing" }))
            .await
            .unwrap();
        assert!(envelope.is_error);
        let text = envelope.text().unwrap().to_lowercase();
        assert!(text.contains("not found"));
    }

    #[tokio::test]
    async fn create_environment_fills_variable_defaults() {
        let upstream = Arc::new(FakeUpstream::ok());
        let envelope = dispatcher(upstream.clone())
            .invoke(
                "create_environment",
                json!({ "environment": { "name": "e", "values": [{ "key": "k", "value": "v" }] } }),
            )
            .await
            .unwrap();
        assert!(!envelope.is_error);
        assert_eq!(
            upstream.last().body,
            Some(json!({
                "environment": {
                    "name": "e",
                    "values": [{ "key": "k", "value": "v", "type": "default", "enabled": true }]
                }
            }))
        );
    }

    #[tokio::test]
    async fn success_is_pretty_json_text() {
        let upstream = Arc::new(FakeUpstream::new(|_| Ok(json!({ "user": { "id": 7 } }))));
        let envelope = dispatcher(upstream)
            .invoke("get_authenticated_user", Value::Null)
            .await
            .unwrap();
        assert!(!envelope.is_error);
        assert_eq!(
            envelope.text(),
            Some("{\n  \"user\": {\n    \"id\": 7\n  }\n}")
        );
    }

    #[tokio::test]
    async fn foreign_resource_uri_is_rejected() {
        let upstream = Arc::new(FakeUpstream::ok());
        let err = dispatcher(upstream.clone())
            .invoke(
                "get_mock",
                json!({ "mock_id": "m-1", "resourceUri": "postman://collections/c-1" }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceNotHandled);
        assert!(upstream.requests().is_empty());
    }

    #[test]
    fn catalog_order_is_stable() {
        let dispatcher = dispatcher(Arc::new(FakeUpstream::ok()));
        let first: Vec<_> = dispatcher
            .list_operations()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        let second: Vec<_> = dispatcher
            .list_operations()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(first, second);
        assert_eq!(dispatcher.list_resources().len(), 7);
        assert_eq!(dispatcher.list_resource_templates().len(), 11);
    }

    #[tokio::test]
    async fn read_resource_delegates_to_catalog() {
        let upstream = Arc::new(FakeUpstream::ok());
        let dispatcher = dispatcher(upstream.clone());
        let contents = dispatcher.read_resource("postman://me").await.unwrap();
        assert_eq!(contents[0].uri, "postman://me");
        assert_eq!(upstream.last().path, "/me");

        let err = dispatcher
            .read_resource("https://example.com")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResource);
    }

    struct FaultyModule;

    #[async_trait]
    impl ToolHandler for FaultyModule {
        fn module(&self) -> &'static str {
            "faulty"
        }

        fn definitions(&self) -> Vec<OperationDefinition> {
            vec![
                OperationDefinition::new("explode", "Panics", ObjectShape::new()),
                OperationDefinition::new("stall", "Never finishes in time", ObjectShape::new()),
            ]
        }

        async fn call(&self, operation: &str, _args: Arguments) -> Result<Value, OperationError> {
            if operation == "explode" {
                panic!("boom");
            }
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Value::Null)
        }
    }

    fn faulty_dispatcher() -> Dispatcher {
        let mut registry = OperationRegistry::new();
        registry.register(Arc::new(FaultyModule)).unwrap();
        let resources = ResourceCatalog::new(
            postman_router().unwrap(),
            Arc::new(FakeUpstream::ok()),
        );
        let config = ServerConfig {
            operation_timeout_ms: 50,
            ..ServerConfig::default()
        };
        Dispatcher::new(Arc::new(registry), resources, config)
    }

    #[tokio::test]
    async fn handler_panic_becomes_soft_internal_error() {
        let envelope = faulty_dispatcher()
            .invoke("explode", json!({}))
            .await
            .unwrap();
        assert!(envelope.is_error);
        assert!(envelope.text().unwrap().contains("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_becomes_transport_failure() {
        let envelope = faulty_dispatcher()
            .invoke("stall", json!({}))
            .await
            .unwrap();
        assert!(envelope.is_error);
        assert!(envelope.text().unwrap().contains("timed out after 50ms"));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            any::<i64>().prop_map(Value::from),
            "[a-z0-9_/]{0,8}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z_]{1,12}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_name() -> impl Strategy<Value = String> {
        let known = dispatcher(Arc::new(FakeUpstream::ok()))
            .list_operations()
            .iter()
            .map(|d| d.name.clone())
            .collect::<Vec<_>>();
        prop_oneof![prop::sample::select(known), "[a-z_]{0,16}"]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn invoke_always_classifies(
            name in arb_name(),
            args in arb_json(),
            status in prop::sample::select(vec![0u16, 400, 401, 403, 404, 429, 500])
        ) {
            let upstream = Arc::new(FakeUpstream::new(move |_| match status {
                0 => Ok(json!({ "ok": true })),
                status => Err(UpstreamError::from_status(status, "")),
            }));
            let dispatcher = dispatcher(upstream);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            match runtime.block_on(dispatcher.invoke(&name, args)) {
                Ok(envelope) => prop_assert!(envelope.text().is_some()),
                Err(envelope) => prop_assert!(envelope.is_protocol()),
            }
        }
    }
}
