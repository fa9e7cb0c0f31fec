use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{Arguments, ObjectShape, OperationDefinition};
use serde_json::Value;

use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const GET_AUTHENTICATED_USER: &str = "get_authenticated_user";

/// Handler for the identity of the API key's owner.
pub struct UserTools {
    upstream: Arc<dyn Upstream>,
}

impl UserTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl ToolHandler for UserTools {
    fn module(&self) -> &'static str {
        "users"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("me")
    }

    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![OperationDefinition::new(
            GET_AUTHENTICATED_USER,
            "Get the user and team that own the configured API key, with usage limits",
            ObjectShape::new(),
        )]
    }

    async fn call(&self, operation: &str, _args: Arguments) -> Result<Value, OperationError> {
        match operation {
            GET_AUTHENTICATED_USER => Ok(self.upstream.call(UpstreamRequest::get("/me")).await?),
            _ => Err(OperationError::UnknownOperation {
                name: operation.to_string(),
            }),
        }
    }
}
