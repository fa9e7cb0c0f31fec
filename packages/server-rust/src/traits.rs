use async_trait::async_trait;
use postman_mcp_core::{resource_type, Arguments, OperationDefinition, UpstreamError};
use serde_json::Value;

use crate::service::operation::OperationError;
use crate::service::resources::SCHEME;
use crate::upstream::UpstreamRequest;

/// Outbound HTTP boundary shared by every feature module.
/// Implementations: `HttpUpstream` (reqwest), in-memory fakes (tests).
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Perform one request and return the decoded response body.
    async fn call(&self, request: UpstreamRequest) -> Result<Value, UpstreamError>;
}

/// One feature module's polymorphic handler.
///
/// The registry stores one handler per module and hands the operation name
/// back on every call; the handler switches on it internally.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Module name used in logs and duplicate-registration reports.
    fn module(&self) -> &'static str;

    /// Operations this module contributes, in catalog order.
    fn definitions(&self) -> Vec<OperationDefinition>;

    /// Resource type (first URI segment) this module can act on, if any.
    fn resource_type(&self) -> Option<&'static str> {
        None
    }

    /// Capability check for an optional `resourceUri` argument.
    fn handles_resource(&self, uri: &str) -> bool {
        self.resource_type()
            .is_some_and(|owned| resource_type(uri, SCHEME) == Some(owned))
    }

    /// Execute `operation` with arguments already validated against its shape.
    async fn call(&self, operation: &str, args: Arguments) -> Result<Value, OperationError>;
}
