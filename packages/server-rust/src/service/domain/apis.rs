//! APIs, their versions, schemas and schema files.

use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{endpoint, Arguments, ObjectShape, OperationDefinition, Shape};
use serde_json::{json, Value};

use super::{with_resource_uri, WORKSPACE_ID};
use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const LIST_APIS: &str = "list_apis";
pub const GET_API: &str = "get_api";
pub const CREATE_API: &str = "create_api";
pub const UPDATE_API: &str = "update_api";
pub const DELETE_API: &str = "delete_api";
pub const LIST_API_VERSIONS: &str = "list_api_versions";
pub const GET_API_VERSION: &str = "get_api_version";
pub const CREATE_API_VERSION: &str = "create_api_version";
pub const GET_API_SCHEMA: &str = "get_api_schema";
pub const CREATE_API_SCHEMA: &str = "create_api_schema";
pub const LIST_API_SCHEMA_FILES: &str = "list_api_schema_files";

/// Media type the v10 APIs endpoints require in `Accept`.
pub const ACCEPT_V10: &str = "application/vnd.api.v10+json";

const API_ID: &str = "api_id";
const VERSION_ID: &str = "version_id";
const SCHEMA_ID: &str = "schema_id";
const INCLUDES: [&str; 4] = ["collections", "versions", "schemas", "gitInfo"];
const SCHEMA_TYPES: [&str; 6] = [
    "openapi:2",
    "openapi:3",
    "openapi:3_1",
    "asyncapi:2",
    "proto:2",
    "proto:3",
];

fn api_id() -> ObjectShape {
    ObjectShape::new().required(API_ID, Shape::string(), "API ID")
}

fn schema_file() -> ObjectShape {
    ObjectShape::new()
        .required("path", Shape::string(), "File path within the schema")
        .required("content", Shape::string(), "File contents")
}

/// `{ "id": ... }` reference to an existing element.
fn id_ref(description: &str) -> ObjectShape {
    ObjectShape::new().required("id", Shape::string(), description)
}

/// Handler for the API-definition operations.
pub struct ApiTools {
    upstream: Arc<dyn Upstream>,
}

impl ApiTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl ToolHandler for ApiTools {
    fn module(&self) -> &'static str {
        "apis"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("apis")
    }

    #[allow(clippy::too_many_lines)]
    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![
            OperationDefinition::new(
                LIST_APIS,
                "List the APIs in a workspace",
                ObjectShape::new()
                    .required(WORKSPACE_ID, Shape::string(), "Workspace ID")
                    .optional(
                        "created_by",
                        Shape::integer(),
                        "Only return APIs created by this user ID",
                    )
                    .optional(
                        "cursor",
                        Shape::string(),
                        "Pagination cursor from a previous response",
                    )
                    .optional("limit", Shape::integer(), "Maximum number of APIs")
                    .optional(
                        "description",
                        Shape::string(),
                        "Only return APIs whose description matches",
                    ),
            ),
            OperationDefinition::new(
                GET_API,
                "Get an API and optionally its collections, versions, schemas and git info",
                with_resource_uri(api_id()).optional(
                    "include",
                    Shape::array(Shape::one_of(INCLUDES)),
                    "Related elements to include",
                ),
            ),
            OperationDefinition::new(
                CREATE_API,
                "Create an API",
                ObjectShape::new()
                    .required(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the API in",
                    )
                    .required("name", Shape::string(), "API name")
                    .optional("summary", Shape::string(), "Short summary")
                    .optional("description", Shape::string(), "API description"),
            ),
            OperationDefinition::new(
                UPDATE_API,
                "Update an API's name, summary or description",
                api_id()
                    .optional("name", Shape::string(), "API name")
                    .optional("summary", Shape::string(), "Short summary")
                    .optional("description", Shape::string(), "API description"),
            ),
            OperationDefinition::new(DELETE_API, "Delete an API", api_id()),
            OperationDefinition::new(
                LIST_API_VERSIONS,
                "List the published versions of an API",
                api_id()
                    .optional(
                        "cursor",
                        Shape::string(),
                        "Pagination cursor from a previous response",
                    )
                    .optional("limit", Shape::integer(), "Maximum number of versions"),
            ),
            OperationDefinition::new(
                GET_API_VERSION,
                "Get one published version of an API",
                api_id().required(VERSION_ID, Shape::string(), "Version ID"),
            ),
            OperationDefinition::new(
                CREATE_API_VERSION,
                "Publish a new version of an API",
                api_id()
                    .required("name", Shape::string(), "Version name")
                    .optional("release_notes", Shape::string(), "Release notes")
                    .optional(
                        "schemas",
                        Shape::array(id_ref("Schema ID")),
                        "Schemas to include in the version",
                    )
                    .optional(
                        "collections",
                        Shape::array(id_ref("Collection ID")),
                        "Collections to include in the version",
                    ),
            ),
            OperationDefinition::new(
                GET_API_SCHEMA,
                "Get an API schema",
                api_id()
                    .required(SCHEMA_ID, Shape::string(), "Schema ID")
                    .optional(
                        "version_id",
                        Shape::string(),
                        "Read the schema as of this version",
                    )
                    .optional(
                        "bundled",
                        Shape::boolean(),
                        "Return the schema as a single bundled document",
                    ),
            ),
            OperationDefinition::new(
                CREATE_API_SCHEMA,
                "Add a schema to an API",
                api_id()
                    .required("type", Shape::one_of(SCHEMA_TYPES), "Schema format")
                    .required("files", Shape::array(schema_file()), "Schema files"),
            ),
            OperationDefinition::new(
                LIST_API_SCHEMA_FILES,
                "List the files of an API schema",
                api_id()
                    .required(SCHEMA_ID, Shape::string(), "Schema ID")
                    .optional(VERSION_ID, Shape::string(), "List files as of this version")
                    .optional(
                        "cursor",
                        Shape::string(),
                        "Pagination cursor from a previous response",
                    )
                    .optional("limit", Shape::integer(), "Maximum number of files"),
            ),
        ]
    }

    async fn call(&self, operation: &str, mut args: Arguments) -> Result<Value, OperationError> {
        let request = match operation {
            LIST_APIS => UpstreamRequest::get("/apis")
                .query("workspaceId", args.require_str(WORKSPACE_ID)?)
                .query_opt("createdBy", args.u64("created_by"))
                .query_opt("cursor", args.str("cursor"))
                .query_opt("limit", args.u64("limit"))
                .query_opt("description", args.str("description")),
            GET_API => {
                let include = args.get("include").and_then(Value::as_array).map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(",")
                });
                UpstreamRequest::get(endpoint(["apis", args.require_str(API_ID)?]))
                    .query_opt("include", include)
            }
            CREATE_API => {
                let workspace = args.require_str(WORKSPACE_ID)?.to_string();
                let body = json!({
                    "name": args.require("name")?,
                    "summary": args.take("summary"),
                    "description": args.take("description"),
                });
                UpstreamRequest::post("/apis")
                    .query("workspaceId", workspace)
                    .json(prune_nulls(body))
            }
            UPDATE_API => {
                let path = endpoint(["apis", args.require_str(API_ID)?]);
                let body = json!({
                    "name": args.take("name"),
                    "summary": args.take("summary"),
                    "description": args.take("description"),
                });
                UpstreamRequest::put(path).json(prune_nulls(body))
            }
            DELETE_API => UpstreamRequest::delete(endpoint(["apis", args.require_str(API_ID)?])),
            LIST_API_VERSIONS => {
                let id = args.require_str(API_ID)?;
                UpstreamRequest::get(endpoint(["apis", id, "versions"]))
                    .query_opt("cursor", args.str("cursor"))
                    .query_opt("limit", args.u64("limit"))
            }
            GET_API_VERSION => {
                let path = endpoint([
                    "apis",
                    args.require_str(API_ID)?,
                    "versions",
                    args.require_str(VERSION_ID)?,
                ]);
                UpstreamRequest::get(path)
            }
            CREATE_API_VERSION => {
                let path = endpoint(["apis", args.require_str(API_ID)?, "versions"]);
                let body = json!({
                    "name": args.require("name")?,
                    "releaseNotes": args.take("release_notes"),
                    "schemas": args.take("schemas"),
                    "collections": args.take("collections"),
                });
                UpstreamRequest::post(path).json(prune_nulls(body))
            }
            GET_API_SCHEMA => {
                let path = endpoint([
                    "apis",
                    args.require_str(API_ID)?,
                    "schemas",
                    args.require_str(SCHEMA_ID)?,
                ]);
                UpstreamRequest::get(path)
                    .query_opt("versionId", args.str(VERSION_ID))
                    .query_opt("bundled", args.bool("bundled"))
            }
            CREATE_API_SCHEMA => {
                let path = endpoint(["apis", args.require_str(API_ID)?, "schemas"]);
                UpstreamRequest::post(path).json(json!({
                    "type": args.require("type")?,
                    "files": args.require("files")?,
                }))
            }
            LIST_API_SCHEMA_FILES => {
                let path = endpoint([
                    "apis",
                    args.require_str(API_ID)?,
                    "schemas",
                    args.require_str(SCHEMA_ID)?,
                    "files",
                ]);
                UpstreamRequest::get(path)
                    .query_opt("versionId", args.str(VERSION_ID))
                    .query_opt("cursor", args.str("cursor"))
                    .query_opt("limit", args.u64("limit"))
            }
            _ => {
                return Err(OperationError::UnknownOperation {
                    name: operation.to_string(),
                })
            }
        };
        Ok(self.upstream.call(request.accept(ACCEPT_V10)).await?)
    }
}

/// Drops top-level `null` members so optional fields stay absent upstream.
fn prune_nulls(mut body: Value) -> Value {
    if let Some(map) = body.as_object_mut() {
        map.retain(|_, value| !value.is_null());
    }
    body
}
