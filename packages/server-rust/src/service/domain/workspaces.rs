//! Workspaces, workspace global variables and workspace roles.

use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{endpoint, Arguments, ObjectShape, OperationDefinition, Shape};
use serde_json::{json, Value};

use super::{with_resource_uri, WORKSPACE_ID};
use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const LIST_WORKSPACES: &str = "list_workspaces";
pub const GET_WORKSPACE: &str = "get_workspace";
pub const CREATE_WORKSPACE: &str = "create_workspace";
pub const UPDATE_WORKSPACE: &str = "update_workspace";
pub const DELETE_WORKSPACE: &str = "delete_workspace";
pub const GET_GLOBAL_VARIABLES: &str = "get_global_variables";
pub const UPDATE_GLOBAL_VARIABLES: &str = "update_global_variables";
pub const GET_WORKSPACE_ROLES: &str = "get_workspace_roles";
pub const UPDATE_WORKSPACE_ROLES: &str = "update_workspace_roles";

const WORKSPACE_TYPES: [&str; 5] = ["personal", "team", "private", "public", "partner"];

fn workspace_id() -> ObjectShape {
    ObjectShape::new().required(WORKSPACE_ID, Shape::string(), "Workspace ID")
}

fn global_variable() -> ObjectShape {
    ObjectShape::new()
        .required("key", Shape::string(), "Variable name")
        .required("value", Shape::string(), "Variable value")
        .optional(
            "type",
            Shape::one_of(["default", "secret"]),
            "Variable type",
        )
        .optional(
            "enabled",
            Shape::boolean(),
            "Whether the variable is enabled",
        )
}

fn role_change() -> ObjectShape {
    ObjectShape::new()
        .required("op", Shape::one_of(["add", "remove"]), "Patch operation")
        .required(
            "path",
            Shape::one_of(["/user", "/group", "/team"]),
            "Principal kind",
        )
        .required(
            "value",
            Shape::array(
                ObjectShape::new()
                    .required("id", Shape::any(), "User, group or team ID")
                    .required(
                        "role",
                        Shape::one_of(["VIEWER", "EDITOR", "ADMIN"]),
                        "Workspace role",
                    ),
            ),
            "Principals and the role each receives",
        )
}

/// Handler for the workspace operations.
pub struct WorkspaceTools {
    upstream: Arc<dyn Upstream>,
}

impl WorkspaceTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl ToolHandler for WorkspaceTools {
    fn module(&self) -> &'static str {
        "workspaces"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("workspaces")
    }

    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![
            OperationDefinition::new(
                LIST_WORKSPACES,
                "List all workspaces the authenticated user can access",
                ObjectShape::new()
                    .optional(
                        "type",
                        Shape::one_of(WORKSPACE_TYPES),
                        "Only return workspaces of this type",
                    )
                    .optional(
                        "created_by",
                        Shape::string(),
                        "Only return workspaces created by this user ID",
                    ),
            ),
            OperationDefinition::new(
                GET_WORKSPACE,
                "Get a workspace with its collections, environments, mocks, monitors and APIs",
                with_resource_uri(workspace_id()),
            ),
            OperationDefinition::new(
                CREATE_WORKSPACE,
                "Create a workspace",
                ObjectShape::new().required(
                    "workspace",
                    ObjectShape::new()
                        .required("name", Shape::string(), "Workspace name")
                        .required("type", Shape::one_of(WORKSPACE_TYPES), "Workspace type")
                        .optional("description", Shape::string(), "Workspace description"),
                    "Workspace to create",
                ),
            ),
            OperationDefinition::new(
                UPDATE_WORKSPACE,
                "Update a workspace's name, type or description",
                workspace_id().required(
                    "workspace",
                    ObjectShape::new()
                        .optional("name", Shape::string(), "Workspace name")
                        .optional("type", Shape::one_of(WORKSPACE_TYPES), "Workspace type")
                        .optional("description", Shape::string(), "Workspace description"),
                    "Fields to change",
                ),
            ),
            OperationDefinition::new(DELETE_WORKSPACE, "Delete a workspace", workspace_id()),
            OperationDefinition::new(
                GET_GLOBAL_VARIABLES,
                "Get a workspace's global variables",
                workspace_id(),
            ),
            OperationDefinition::new(
                UPDATE_GLOBAL_VARIABLES,
                "Replace a workspace's global variables",
                workspace_id().required(
                    "values",
                    Shape::array(global_variable()),
                    "Complete list of global variables",
                ),
            ),
            OperationDefinition::new(
                GET_WORKSPACE_ROLES,
                "Get the users, groups and teams with roles in a workspace",
                workspace_id(),
            ),
            OperationDefinition::new(
                UPDATE_WORKSPACE_ROLES,
                "Add or remove workspace roles for users, groups or teams",
                workspace_id().required(
                    "roles",
                    Shape::array(role_change()),
                    "Role changes to apply",
                ),
            ),
        ]
    }

    async fn call(&self, operation: &str, mut args: Arguments) -> Result<Value, OperationError> {
        let request = match operation {
            LIST_WORKSPACES => UpstreamRequest::get("/workspaces")
                .query_opt("type", args.str("type"))
                .query_opt("createdBy", args.str("created_by")),
            GET_WORKSPACE => {
                UpstreamRequest::get(endpoint(["workspaces", args.require_str(WORKSPACE_ID)?]))
            }
            CREATE_WORKSPACE => UpstreamRequest::post("/workspaces")
                .json(json!({ "workspace": args.require("workspace")? })),
            UPDATE_WORKSPACE => {
                let path = endpoint(["workspaces", args.require_str(WORKSPACE_ID)?]);
                UpstreamRequest::put(path).json(json!({ "workspace": args.require("workspace")? }))
            }
            DELETE_WORKSPACE => {
                UpstreamRequest::delete(endpoint(["workspaces", args.require_str(WORKSPACE_ID)?]))
            }
            GET_GLOBAL_VARIABLES => {
                let id = args.require_str(WORKSPACE_ID)?;
                UpstreamRequest::get(endpoint(["workspaces", id, "global-variables"]))
            }
            UPDATE_GLOBAL_VARIABLES => {
                let id = args.require_str(WORKSPACE_ID)?;
                let path = endpoint(["workspaces", id, "global-variables"]);
                UpstreamRequest::put(path).json(json!({ "values": args.require("values")? }))
            }
            GET_WORKSPACE_ROLES => {
                let id = args.require_str(WORKSPACE_ID)?;
                UpstreamRequest::get(endpoint(["workspaces", id, "roles"]))
            }
            UPDATE_WORKSPACE_ROLES => {
                let path = endpoint(["workspaces", args.require_str(WORKSPACE_ID)?, "roles"]);
                UpstreamRequest::patch(path).json(json!({ "roles": args.require("roles")? }))
            }
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

    use super::*;
    use crate::testing::{invoke, FakeUpstream};

    fn tools() -> (WorkspaceTools, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::ok());
        (WorkspaceTools::new(upstream.clone()), upstream)
    }

    #[tokio::test]
    async fn list_workspaces_passes_filters() {
        let (tools, upstream) = tools();
        let value = invoke(
            &tools,
            LIST_WORKSPACES,
            json!({ "type": "team", "created_by": "12345" }),
        )
        .await
        .unwrap();
        assert_eq!(value, json!({ "ok": true }));
        let request = upstream.last();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/workspaces");
        assert_eq!(
            request.query,
            vec![
                ("type".to_string(), "team".to_string()),
                ("createdBy".to_string(), "12345".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn create_workspace_wraps_body() {
        let (tools, upstream) = tools();
        let workspace = json!({ "name": "Team", "type": "team" });
        invoke(&tools, CREATE_WORKSPACE, json!({ "workspace": workspace }))
            .await
            .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(
            request.body,
            Some(json!({ "workspace": { "name": "Team", "type": "team" } }))
        );
    }

    #[tokio::test]
    async fn global_variables_and_roles_paths() {
        let (tools, upstream) = tools();
        invoke(
            &tools,
            UPDATE_GLOBAL_VARIABLES,
            json!({ "workspace_id": "ws/1", "values": [{ "key": "k", "value": "v" }] }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/workspaces/ws%2F1/global-variables");

        let roles = json!([
            { "op": "add", "path": "/user", "value": [{ "id": 1, "role": "EDITOR" }] }
        ]);
        invoke(
            &tools,
            UPDATE_WORKSPACE_ROLES,
            json!({ "workspace_id": "ws-1", "roles": roles }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.path, "/workspaces/ws-1/roles");
        assert_eq!(request.body, Some(json!({ "roles": roles })));
    }

    #[tokio::test]
    async fn role_values_are_enforced() {
        let (tools, upstream) = tools();
        let err = invoke(
            &tools,
            UPDATE_WORKSPACE_ROLES,
            json!({
                "workspace_id": "ws-1",
                "roles": [{ "op": "add", "path": "/user", "value": [{ "id": 1, "role": "OWNER" }] }]
            }),
        )
        .await
        .unwrap_err();
        match err {
            OperationError::InvalidArguments { message } => {
                assert!(message.contains("roles[0].value[0].role"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(upstream.requests().is_empty());
    }
}
