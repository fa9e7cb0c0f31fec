//! Environments and their variables, forks and merges.

use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{endpoint, Arguments, ObjectShape, OperationDefinition, Shape};
use serde_json::{json, Value};

use super::{with_resource_uri, ENVIRONMENT_ID, WORKSPACE_ID};
use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const LIST_ENVIRONMENTS: &str = "list_environments";
pub const GET_ENVIRONMENT: &str = "get_environment";
pub const CREATE_ENVIRONMENT: &str = "create_environment";
pub const UPDATE_ENVIRONMENT: &str = "update_environment";
pub const DELETE_ENVIRONMENT: &str = "delete_environment";
pub const FORK_ENVIRONMENT: &str = "fork_environment";
pub const MERGE_ENVIRONMENT_FORK: &str = "merge_environment_fork";
pub const DUPLICATE_ENVIRONMENT: &str = "duplicate_environment";

fn environment_id() -> ObjectShape {
    ObjectShape::new().required(ENVIRONMENT_ID, Shape::string(), "Environment ID")
}

fn variable() -> ObjectShape {
    ObjectShape::new()
        .required("key", Shape::string(), "Variable name")
        .required("value", Shape::string(), "Variable value")
        .optional(
            "type",
            Shape::one_of(["default", "secret"]),
            "Variable type, `default` when omitted",
        )
        .optional(
            "enabled",
            Shape::boolean(),
            "Whether the variable is enabled, true when omitted",
        )
}

fn environment_document(name_required: bool) -> ObjectShape {
    let shape = ObjectShape::new();
    let shape = if name_required {
        shape.required("name", Shape::string(), "Environment name")
    } else {
        shape.optional("name", Shape::string(), "Environment name")
    };
    shape.optional("values", Shape::array(variable()), "Environment variables")
}

/// Fills in `type` and `enabled` on every variable that omits them.
fn with_variable_defaults(mut environment: Value) -> Value {
    if let Some(values) = environment.get_mut("values").and_then(Value::as_array_mut) {
        for variable in values.iter_mut().filter_map(Value::as_object_mut) {
            variable
                .entry("type")
                .or_insert_with(|| Value::String("default".to_string()));
            variable.entry("enabled").or_insert(Value::Bool(true));
        }
    }
    environment
}

/// Handler for the environment operations.
pub struct EnvironmentTools {
    upstream: Arc<dyn Upstream>,
}

impl EnvironmentTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Reads an environment and posts a copy of its name and variables.
    async fn duplicate(&self, args: &Arguments) -> Result<Value, OperationError> {
        let source_id = args.require_str(ENVIRONMENT_ID)?;
        let original = self
            .upstream
            .call(UpstreamRequest::get(endpoint(["environments", source_id])))
            .await?;
        let source = original.get("environment").unwrap_or(&original);

        let name = match args.str("name") {
            Some(name) => name.to_string(),
            None => {
                let original = source.get("name").and_then(Value::as_str);
                format!("{} Copy", original.unwrap_or(source_id))
            }
        };
        let values = source.get("values").cloned().unwrap_or_else(|| json!([]));
        tracing::debug!(source = source_id, name = %name, "duplicating environment");

        let request = UpstreamRequest::post("/environments")
            .query_opt("workspace", args.str(WORKSPACE_ID))
            .json(json!({ "environment": { "name": name, "values": values } }));
        Ok(self.upstream.call(request).await?)
    }
}

#[async_trait]
impl ToolHandler for EnvironmentTools {
    fn module(&self) -> &'static str {
        "environments"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("environments")
    }

    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![
            OperationDefinition::new(
                LIST_ENVIRONMENTS,
                "List environments, optionally limited to one workspace",
                ObjectShape::new().optional(
                    WORKSPACE_ID,
                    Shape::string(),
                    "Only return environments in this workspace",
                ),
            ),
            OperationDefinition::new(
                GET_ENVIRONMENT,
                "Get an environment and its variables",
                with_resource_uri(environment_id()),
            ),
            OperationDefinition::new(
                CREATE_ENVIRONMENT,
                "Create an environment",
                ObjectShape::new()
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the environment in",
                    )
                    .required(
                        "environment",
                        environment_document(true),
                        "Environment to create",
                    ),
            ),
            OperationDefinition::new(
                UPDATE_ENVIRONMENT,
                "Replace an environment's name or variables",
                environment_id().required(
                    "environment",
                    environment_document(false),
                    "Fields to replace",
                ),
            ),
            OperationDefinition::new(
                DELETE_ENVIRONMENT,
                "Delete an environment",
                environment_id(),
            ),
            OperationDefinition::new(
                FORK_ENVIRONMENT,
                "Fork an environment into a workspace",
                environment_id()
                    .required(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the fork in",
                    )
                    .required("label", Shape::string(), "Fork name"),
            ),
            OperationDefinition::new(
                MERGE_ENVIRONMENT_FORK,
                "Merge a forked environment back into its parent",
                environment_id()
                    .required("source", Shape::string(), "Forked environment UID")
                    .optional(
                        "delete_source",
                        Shape::boolean(),
                        "Delete the fork after merging",
                    ),
            ),
            OperationDefinition::new(
                DUPLICATE_ENVIRONMENT,
                "Copy an environment's variables into a new environment",
                environment_id()
                    .optional(
                        "name",
                        Shape::string(),
                        "Name of the copy, `<original> Copy` when omitted",
                    )
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the copy in",
                    ),
            ),
        ]
    }

    async fn call(&self, operation: &str, mut args: Arguments) -> Result<Value, OperationError> {
        let request = match operation {
            LIST_ENVIRONMENTS => UpstreamRequest::get("/environments")
                .query_opt("workspace", args.str(WORKSPACE_ID)),
            GET_ENVIRONMENT => {
                let id = args.require_str(ENVIRONMENT_ID)?;
                UpstreamRequest::get(endpoint(["environments", id]))
            }
            CREATE_ENVIRONMENT => {
                let environment = with_variable_defaults(args.require("environment")?);
                UpstreamRequest::post("/environments")
                    .query_opt("workspace", args.str(WORKSPACE_ID))
                    .json(json!({ "environment": environment }))
            }
            UPDATE_ENVIRONMENT => {
                let path = endpoint(["environments", args.require_str(ENVIRONMENT_ID)?]);
                let environment = with_variable_defaults(args.require("environment")?);
                UpstreamRequest::put(path).json(json!({ "environment": environment }))
            }
            DELETE_ENVIRONMENT => {
                let id = args.require_str(ENVIRONMENT_ID)?;
                UpstreamRequest::delete(endpoint(["environments", id]))
            }
            FORK_ENVIRONMENT => {
                let path = endpoint(["environments", args.require_str(ENVIRONMENT_ID)?, "forks"]);
                UpstreamRequest::post(path)
                    .query("workspace", args.require_str(WORKSPACE_ID)?)
                    .json(json!({ "forkName": args.require("label")? }))
            }
            MERGE_ENVIRONMENT_FORK => {
                let id = args.require_str(ENVIRONMENT_ID)?;
                let path = endpoint(["environments", id, "merges"]);
                let delete_source = args.bool("delete_source").unwrap_or(false);
                UpstreamRequest::post(path).json(json!({
                    "source": args.require("source")?,
                    "strategy": { "deleteSource": delete_source },
                }))
            }
            DUPLICATE_ENVIRONMENT => return self.duplicate(&args).await,
            _ => {
                return Err(OperationError::UnknownOperation {
                    name: operation.to_string(),
                })
            }
        };
        Ok(self.upstream.call(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use postman_mcp_core::UpstreamError;

    use super::*;
    use crate::testing::{invoke, FakeUpstream};

    fn tools() -> (EnvironmentTools, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::ok());
        (EnvironmentTools::new(upstream.clone()), upstream)
    }

    #[tokio::test]
    async fn create_environment_defaults_variable_fields() {
        let (tools, upstream) = tools();
        invoke(
            &tools,
            CREATE_ENVIRONMENT,
            json!({
                "workspace_id": "ws-1",
                "environment": {
                    "name": "Staging",
                    "values": [
                        { "key": "host", "value": "staging.example.com" },
                        { "key": "token", "value": "t", "type": "secret", "enabled": false }
                    ]
                }
            }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/environments");
        assert_eq!(
            request.query,
            vec![("workspace".to_string(), "ws-1".to_string())]
        );
        assert_eq!(
            request.body,
            Some(json!({
                "environment": {
                    "name": "Staging",
                    "values": [
                        {
                            "key": "host",
                            "value": "staging.example.com",
                            "type": "default",
                            "enabled": true
                        },
                        { "key": "token", "value": "t", "type": "secret", "enabled": false }
                    ]
                }
            }))
        );
    }

    #[tokio::test]
    async fn invalid_variable_type_is_rejected() {
        let (tools, upstream) = tools();
        let err = invoke(
            &tools,
            CREATE_ENVIRONMENT,
            json!({
                "environment": {
                    "name": "x",
                    "values": [{ "key": "k", "value": "v", "type": "hidden" }]
                }
            }),
        )
        .await
        .unwrap_err();
        match err {
            OperationError::InvalidArguments { message } => {
                assert!(message.contains("environment.values[0].type"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(upstream.requests().is_empty());
    }

    #[tokio::test]
    async fn fork_and_merge_bodies() {
        let (tools, upstream) = tools();
        invoke(
            &tools,
            FORK_ENVIRONMENT,
            json!({ "environment_id": "e-1", "workspace_id": "ws-1", "label": "mine" }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.path, "/environments/e-1/forks");
        assert_eq!(request.body, Some(json!({ "forkName": "mine" })));

        invoke(
            &tools,
            MERGE_ENVIRONMENT_FORK,
            json!({ "environment_id": "e-1", "source": "fork-uid" }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.path, "/environments/e-1/merges");
        assert_eq!(
            request.body,
            Some(json!({
                "source": "fork-uid",
                "strategy": { "deleteSource": false }
            }))
        );
    }

    #[tokio::test]
    async fn duplicate_reads_then_creates_copy() {
        let upstream = Arc::new(FakeUpstream::new(|request| {
            if request.method == Method::GET {
                Ok(json!({
                    "environment": {
                        "id": "e-1",
                        "name": "Staging",
                        "values": [
                            { "key": "host", "value": "h", "type": "default", "enabled": true }
                        ]
                    }
                }))
            } else {
                Ok(json!({ "environment": { "id": "e-2" } }))
            }
        }));
        let tools = EnvironmentTools::new(upstream.clone());

        let value = invoke(
            &tools,
            DUPLICATE_ENVIRONMENT,
            json!({ "environment_id": "e-1" }),
        )
        .await
        .unwrap();
        assert_eq!(value, json!({ "environment": { "id": "e-2" } }));

        let requests = upstream.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/environments/e-1");
        assert_eq!(requests[1].method, Method::POST);
        assert_eq!(
            requests[1].body,
            Some(json!({
                "environment": {
                    "name": "Staging Copy",
                    "values": [{ "key": "host", "value": "h", "type": "default", "enabled": true }]
                }
            }))
        );
    }

    #[tokio::test]
    async fn duplicate_stops_when_source_is_missing() {
        let upstream = Arc::new(FakeUpstream::new(|_| {
            Err(UpstreamError::NotFound {
                message: "environment not found".to_string(),
            })
        }));
        let tools = EnvironmentTools::new(upstream.clone());
        let err = invoke(
            &tools,
            DUPLICATE_ENVIRONMENT,
            json!({ "environment_id": "gone", "name": "x" }),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Upstream(UpstreamError::NotFound { .. })
        ));
        assert_eq!(upstream.requests().len(), 1);
    }
}
