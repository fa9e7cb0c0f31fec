//! Mock servers: lifecycle, publishing and call logs.

use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{endpoint, Arguments, ObjectShape, OperationDefinition, Shape};
use serde_json::{json, Value};

use super::{with_resource_uri, COLLECTION_ID, ENVIRONMENT_ID, WORKSPACE_ID};
use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const LIST_MOCKS: &str = "list_mocks";
pub const GET_MOCK: &str = "get_mock";
pub const CREATE_MOCK: &str = "create_mock";
pub const UPDATE_MOCK: &str = "update_mock";
pub const DELETE_MOCK: &str = "delete_mock";
pub const PUBLISH_MOCK: &str = "publish_mock";
pub const UNPUBLISH_MOCK: &str = "unpublish_mock";
pub const GET_MOCK_CALL_LOGS: &str = "get_mock_call_logs";

const MOCK_ID: &str = "mock_id";

fn mock_id() -> ObjectShape {
    ObjectShape::new().required(MOCK_ID, Shape::string(), "Mock server ID")
}

/// Handler for the mock server operations.
pub struct MockTools {
    upstream: Arc<dyn Upstream>,
}

impl MockTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl ToolHandler for MockTools {
    fn module(&self) -> &'static str {
        "mocks"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("mocks")
    }

    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![
            OperationDefinition::new(
                LIST_MOCKS,
                "List mock servers, optionally by workspace or collection",
                ObjectShape::new()
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Only return mocks in this workspace",
                    )
                    .optional(
                        COLLECTION_ID,
                        Shape::string(),
                        "Only return mocks of this collection UID",
                    ),
            ),
            OperationDefinition::new(GET_MOCK, "Get a mock server", with_resource_uri(mock_id())),
            OperationDefinition::new(
                CREATE_MOCK,
                "Create a mock server for a collection",
                ObjectShape::new()
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the mock in",
                    )
                    .required(
                        "mock",
                        ObjectShape::new()
                            .required("collection", Shape::string(), "Collection UID to mock")
                            .optional("name", Shape::string(), "Mock server name")
                            .optional(
                                "environment",
                                Shape::string(),
                                "Environment UID the mock resolves variables from",
                            )
                            .optional(
                                "private",
                                Shape::boolean(),
                                "Require an API key to call the mock",
                            ),
                        "Mock server to create",
                    ),
            ),
            OperationDefinition::new(
                UPDATE_MOCK,
                "Update a mock server",
                mock_id().required(
                    "mock",
                    ObjectShape::new()
                        .optional("name", Shape::string(), "Mock server name")
                        .optional("environment", Shape::string(), "Environment UID")
                        .optional("description", Shape::string(), "Mock server description")
                        .optional(
                            "private",
                            Shape::boolean(),
                            "Require an API key to call the mock",
                        )
                        .optional("versionTag", Shape::string(), "API version tag"),
                    "Fields to change",
                ),
            ),
            OperationDefinition::new(DELETE_MOCK, "Delete a mock server", mock_id()),
            OperationDefinition::new(PUBLISH_MOCK, "Make a mock server public", mock_id()),
            OperationDefinition::new(UNPUBLISH_MOCK, "Make a mock server private", mock_id()),
            OperationDefinition::new(
                GET_MOCK_CALL_LOGS,
                "Get the calls a mock server received, newest first by default",
                mock_id()
                    .optional("limit", Shape::integer(), "Maximum number of log entries")
                    .optional(
                        "cursor",
                        Shape::string(),
                        "Pagination cursor from a previous response",
                    )
                    .optional(
                        "until",
                        Shape::string(),
                        "Only return calls before this ISO 8601 time",
                    )
                    .optional(
                        "since",
                        Shape::string(),
                        "Only return calls after this ISO 8601 time",
                    )
                    .optional(
                        "response_status_code",
                        Shape::integer(),
                        "Only return calls answered with this status",
                    )
                    .optional(
                        "request_method",
                        Shape::string(),
                        "Only return calls with this HTTP method",
                    )
                    .optional(
                        "direction",
                        Shape::one_of(["asc", "desc"]),
                        "Sort direction",
                    ),
            ),
        ]
    }

    async fn call(&self, operation: &str, mut args: Arguments) -> Result<Value, OperationError> {
        let request = match operation {
            LIST_MOCKS => UpstreamRequest::get("/mocks")
                .query_opt("workspace", args.str(WORKSPACE_ID))
                .query_opt("collection", args.str(COLLECTION_ID)),
            GET_MOCK => UpstreamRequest::get(endpoint(["mocks", args.require_str(MOCK_ID)?])),
            CREATE_MOCK => UpstreamRequest::post("/mocks")
                .query_opt("workspace", args.str(WORKSPACE_ID))
                .json(json!({ "mock": args.require("mock")? })),
            UPDATE_MOCK => {
                let path = endpoint(["mocks", args.require_str(MOCK_ID)?]);
                UpstreamRequest::put(path).json(json!({ "mock": args.require("mock")? }))
            }
            DELETE_MOCK => UpstreamRequest::delete(endpoint(["mocks", args.require_str(MOCK_ID)?])),
            PUBLISH_MOCK => {
                let id = args.require_str(MOCK_ID)?;
                UpstreamRequest::post(endpoint(["mocks", id, "publish"]))
            }
            UNPUBLISH_MOCK => {
                let id = args.require_str(MOCK_ID)?;
                UpstreamRequest::delete(endpoint(["mocks", id, "unpublish"]))
            }
            GET_MOCK_CALL_LOGS => {
                UpstreamRequest::get(endpoint(["mocks", args.require_str(MOCK_ID)?, "call-logs"]))
                    .query_opt("limit", args.u64("limit"))
                    .query_opt("cursor", args.str("cursor"))
                    .query_opt("until", args.str("until"))
                    .query_opt("since", args.str("since"))
                    .query_opt("responseStatusCode", args.u64("response_status_code"))
                    .query_opt("requestMethod", args.str("request_method"))
                    .query_opt("direction", args.str("direction"))
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

    fn tools() -> (MockTools, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::ok());
        (MockTools::new(upstream.clone()), upstream)
    }

    #[tokio::test]
    async fn publish_and_unpublish_use_distinct_methods() {
        let (tools, upstream) = tools();
        invoke(&tools, PUBLISH_MOCK, json!({ "mock_id": "m-1" }))
            .await
            .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/mocks/m-1/publish");

        invoke(&tools, UNPUBLISH_MOCK, json!({ "mock_id": "m-1" }))
            .await
            .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.path, "/mocks/m-1/unpublish");
    }

    #[tokio::test]
    async fn call_log_filters_map_to_upstream_names() {
        let (tools, upstream) = tools();
        invoke(
            &tools,
            GET_MOCK_CALL_LOGS,
            json!({
                "mock_id": "m-1",
                "limit": 10,
                "response_status_code": 404,
                "direction": "asc"
            }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.path, "/mocks/m-1/call-logs");
        assert_eq!(
            request.query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("responseStatusCode".to_string(), "404".to_string()),
                ("direction".to_string(), "asc".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn create_mock_requires_collection() {
        let (tools, upstream) = tools();
        let err = invoke(&tools, CREATE_MOCK, json!({ "mock": { "name": "m" } }))
            .await
            .unwrap_err();
        match err {
            OperationError::InvalidArguments { message } => {
                assert!(message.contains("mock.collection"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(upstream.requests().is_empty());
    }
}
