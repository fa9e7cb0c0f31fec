//! Collections, their folders and requests, forks and merges.

use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{endpoint, Arguments, ObjectShape, OperationDefinition, Shape};
use serde_json::{json, Map, Value};

use super::{with_resource_uri, COLLECTION_ID, WORKSPACE_ID};
use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const LIST_COLLECTIONS: &str = "list_collections";
pub const GET_COLLECTION: &str = "get_collection";
pub const CREATE_COLLECTION: &str = "create_collection";
pub const UPDATE_COLLECTION: &str = "update_collection";
pub const PATCH_COLLECTION: &str = "patch_collection";
pub const DELETE_COLLECTION: &str = "delete_collection";
pub const FORK_COLLECTION: &str = "fork_collection";
pub const MERGE_COLLECTION_FORK: &str = "merge_collection_fork";
pub const CREATE_COLLECTION_FOLDER: &str = "create_collection_folder";
pub const GET_COLLECTION_FOLDER: &str = "get_collection_folder";
pub const DELETE_COLLECTION_FOLDER: &str = "delete_collection_folder";
pub const CREATE_COLLECTION_REQUEST: &str = "create_collection_request";
pub const GET_COLLECTION_REQUEST: &str = "get_collection_request";
pub const DELETE_COLLECTION_REQUEST: &str = "delete_collection_request";

/// Schema URL written into `info.schema` when the caller leaves it out.
pub const COLLECTION_SCHEMA_V21: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

const FOLDER_ID: &str = "folder_id";
const REQUEST_ID: &str = "request_id";
const MERGE_STRATEGIES: [&str; 2] = ["deleteSource", "updateSourceWithDestination"];
const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

fn collection_id() -> ObjectShape {
    ObjectShape::new().required(COLLECTION_ID, Shape::string(), "Collection ID")
}

fn collection_document() -> ObjectShape {
    ObjectShape::new()
        .required(
            "info",
            ObjectShape::new()
                .required("name", Shape::string(), "Collection name")
                .optional("description", Shape::string(), "Collection description")
                .optional("schema", Shape::string(), "Collection format schema URL"),
            "Collection metadata",
        )
        .optional("item", Shape::array(Shape::any()), "Folders and requests")
        .optional(
            "variable",
            Shape::array(Shape::any()),
            "Collection variables",
        )
        .optional("auth", Shape::any(), "Collection-level authorization")
        .optional(
            "event",
            Shape::array(Shape::any()),
            "Pre-request and test scripts",
        )
}

/// Fills in `info.schema` so the upstream accepts the document.
fn with_default_schema(mut collection: Value) -> Value {
    if let Some(info) = collection.get_mut("info").and_then(Value::as_object_mut) {
        info.entry("schema")
            .or_insert_with(|| Value::String(COLLECTION_SCHEMA_V21.to_string()));
    }
    collection
}

/// Handler for the collection operations.
pub struct CollectionTools {
    upstream: Arc<dyn Upstream>,
}

impl CollectionTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl ToolHandler for CollectionTools {
    fn module(&self) -> &'static str {
        "collections"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("collections")
    }

    #[allow(clippy::too_many_lines)]
    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![
            OperationDefinition::new(
                LIST_COLLECTIONS,
                "List collections, optionally limited to one workspace",
                ObjectShape::new()
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Only return collections in this workspace",
                    )
                    .optional(
                        "name",
                        Shape::string(),
                        "Only return collections with this name",
                    )
                    .optional("limit", Shape::integer(), "Maximum number of collections")
                    .optional("offset", Shape::integer(), "Number of collections to skip"),
            ),
            OperationDefinition::new(
                GET_COLLECTION,
                "Get a collection in Postman Collection Format v2.1",
                with_resource_uri(collection_id())
                    .optional(
                        "access_key",
                        Shape::string(),
                        "Collection read-only access key",
                    )
                    .optional(
                        "model",
                        Shape::one_of(["minimal"]),
                        "Return only the root-level item IDs",
                    ),
            ),
            OperationDefinition::new(
                CREATE_COLLECTION,
                "Create a collection",
                ObjectShape::new()
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the collection in",
                    )
                    .required("collection", collection_document(), "Collection to create"),
            ),
            OperationDefinition::new(
                UPDATE_COLLECTION,
                "Replace a collection's entire contents",
                collection_id().required(
                    "collection",
                    collection_document(),
                    "Complete replacement collection",
                ),
            ),
            OperationDefinition::new(
                PATCH_COLLECTION,
                "Update part of a collection's metadata, variables, auth or events",
                collection_id().required(
                    "collection",
                    ObjectShape::new()
                        .optional(
                            "info",
                            ObjectShape::new()
                                .optional("name", Shape::string(), "Collection name")
                                .optional("description", Shape::string(), "Collection description"),
                            "Metadata to change",
                        )
                        .optional(
                            "variable",
                            Shape::array(Shape::any()),
                            "Collection variables",
                        )
                        .optional("auth", Shape::any(), "Collection-level authorization")
                        .optional(
                            "event",
                            Shape::array(Shape::any()),
                            "Pre-request and test scripts",
                        ),
                    "Fields to change",
                ),
            ),
            OperationDefinition::new(DELETE_COLLECTION, "Delete a collection", collection_id()),
            OperationDefinition::new(
                FORK_COLLECTION,
                "Fork a collection into a workspace",
                collection_id()
                    .required(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the fork in",
                    )
                    .required("label", Shape::string(), "Fork label"),
            ),
            OperationDefinition::new(
                MERGE_COLLECTION_FORK,
                "Merge a forked collection back into its parent",
                ObjectShape::new()
                    .required("source", Shape::string(), "Forked collection UID")
                    .required("destination", Shape::string(), "Parent collection UID")
                    .optional(
                        "strategy",
                        Shape::one_of(MERGE_STRATEGIES),
                        "deleteSource drops the fork; updateSourceWithDestination keeps it",
                    ),
            ),
            OperationDefinition::new(
                CREATE_COLLECTION_FOLDER,
                "Create a folder in a collection",
                collection_id().required(
                    "folder",
                    ObjectShape::new()
                        .required("name", Shape::string(), "Folder name")
                        .optional("description", Shape::string(), "Folder description")
                        .optional("folder", Shape::string(), "Parent folder ID"),
                    "Folder to create",
                ),
            ),
            OperationDefinition::new(
                GET_COLLECTION_FOLDER,
                "Get a folder in a collection",
                collection_id().required(FOLDER_ID, Shape::string(), "Folder ID"),
            ),
            OperationDefinition::new(
                DELETE_COLLECTION_FOLDER,
                "Delete a folder in a collection",
                collection_id().required(FOLDER_ID, Shape::string(), "Folder ID"),
            ),
            OperationDefinition::new(
                CREATE_COLLECTION_REQUEST,
                "Create a request in a collection",
                collection_id()
                    .optional(
                        FOLDER_ID,
                        Shape::string(),
                        "Folder to create the request in",
                    )
                    .required(
                        "request",
                        ObjectShape::new()
                            .required("name", Shape::string(), "Request name")
                            .optional("method", Shape::one_of(HTTP_METHODS), "HTTP method")
                            .optional("url", Shape::string(), "Request URL")
                            .optional("description", Shape::string(), "Request description")
                            .optional("headerData", Shape::array(Shape::any()), "Request headers")
                            .optional("rawModeData", Shape::string(), "Raw request body"),
                        "Request to create",
                    ),
            ),
            OperationDefinition::new(
                GET_COLLECTION_REQUEST,
                "Get a request in a collection",
                collection_id().required(REQUEST_ID, Shape::string(), "Request ID"),
            ),
            OperationDefinition::new(
                DELETE_COLLECTION_REQUEST,
                "Delete a request in a collection",
                collection_id().required(REQUEST_ID, Shape::string(), "Request ID"),
            ),
        ]
    }

    async fn call(&self, operation: &str, mut args: Arguments) -> Result<Value, OperationError> {
        let request = match operation {
            LIST_COLLECTIONS => UpstreamRequest::get("/collections")
                .query_opt("workspace", args.str(WORKSPACE_ID))
                .query_opt("name", args.str("name"))
                .query_opt("limit", args.u64("limit"))
                .query_opt("offset", args.u64("offset")),
            GET_COLLECTION => {
                let id = args.require_str(COLLECTION_ID)?;
                UpstreamRequest::get(endpoint(["collections", id]))
                    .query_opt("access_key", args.str("access_key"))
                    .query_opt("model", args.str("model"))
            }
            CREATE_COLLECTION => {
                let collection = with_default_schema(args.require("collection")?);
                UpstreamRequest::post("/collections")
                    .query_opt("workspace", args.str(WORKSPACE_ID))
                    .json(json!({ "collection": collection }))
            }
            UPDATE_COLLECTION => {
                let path = endpoint(["collections", args.require_str(COLLECTION_ID)?]);
                let collection = with_default_schema(args.require("collection")?);
                UpstreamRequest::put(path).json(json!({ "collection": collection }))
            }
            PATCH_COLLECTION => {
                let path = endpoint(["collections", args.require_str(COLLECTION_ID)?]);
                UpstreamRequest::patch(path)
                    .json(json!({ "collection": args.require("collection")? }))
            }
            DELETE_COLLECTION => {
                UpstreamRequest::delete(endpoint(["collections", args.require_str(COLLECTION_ID)?]))
            }
            FORK_COLLECTION => {
                let path = endpoint(["collections", "fork", args.require_str(COLLECTION_ID)?]);
                UpstreamRequest::post(path)
                    .query("workspace", args.require_str(WORKSPACE_ID)?)
                    .json(json!({ "label": args.require("label")? }))
            }
            MERGE_COLLECTION_FORK => {
                let mut body = Map::new();
                body.insert("source".to_string(), args.require("source")?);
                body.insert("destination".to_string(), args.require("destination")?);
                if let Some(strategy) = args.take("strategy") {
                    body.insert("strategy".to_string(), strategy);
                }
                UpstreamRequest::post("/collections/merge").json(Value::Object(body))
            }
            CREATE_COLLECTION_FOLDER => {
                let path = endpoint(["collections", args.require_str(COLLECTION_ID)?, "folders"]);
                UpstreamRequest::post(path).json(args.require("folder")?)
            }
            GET_COLLECTION_FOLDER | DELETE_COLLECTION_FOLDER => {
                let path = endpoint([
                    "collections",
                    args.require_str(COLLECTION_ID)?,
                    "folders",
                    args.require_str(FOLDER_ID)?,
                ]);
                if operation == GET_COLLECTION_FOLDER {
                    UpstreamRequest::get(path)
                } else {
                    UpstreamRequest::delete(path)
                }
            }
            CREATE_COLLECTION_REQUEST => {
                let id = args.require_str(COLLECTION_ID)?;
                let path = endpoint(["collections", id, "requests"]);
                UpstreamRequest::post(path)
                    .query_opt("folder", args.str(FOLDER_ID))
                    .json(args.require("request")?)
            }
            GET_COLLECTION_REQUEST | DELETE_COLLECTION_REQUEST => {
                let path = endpoint([
                    "collections",
                    args.require_str(COLLECTION_ID)?,
                    "requests",
                    args.require_str(REQUEST_ID)?,
                ]);
                if operation == GET_COLLECTION_REQUEST {
                    UpstreamRequest::get(path)
                } else {
                    UpstreamRequest::delete(path)
                }
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
