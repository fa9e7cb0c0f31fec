//! Monitors: scheduled collection runs.

use std::sync::Arc;

use async_trait::async_trait;
use postman_mcp_core::{endpoint, Arguments, ObjectShape, OperationDefinition, Shape};
use serde_json::{json, Value};

use super::{with_resource_uri, WORKSPACE_ID};
use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

pub const LIST_MONITORS: &str = "list_monitors";
pub const GET_MONITOR: &str = "get_monitor";
pub const CREATE_MONITOR: &str = "create_monitor";
pub const UPDATE_MONITOR: &str = "update_monitor";
pub const DELETE_MONITOR: &str = "delete_monitor";
pub const RUN_MONITOR: &str = "run_monitor";

const MONITOR_ID: &str = "monitor_id";

fn monitor_id() -> ObjectShape {
    ObjectShape::new().required(MONITOR_ID, Shape::string(), "Monitor ID")
}

fn schedule() -> ObjectShape {
    ObjectShape::new()
        .required(
            "cron",
            Shape::string(),
            "Cron expression for the run schedule",
        )
        .required(
            "timezone",
            Shape::string(),
            "IANA time zone the schedule runs in",
        )
}

/// Handler for the monitor operations.
pub struct MonitorTools {
    upstream: Arc<dyn Upstream>,
}

impl MonitorTools {
    #[must_use]
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }
}

#[async_trait]
impl ToolHandler for MonitorTools {
    fn module(&self) -> &'static str {
        "monitors"
    }

    fn resource_type(&self) -> Option<&'static str> {
        Some("monitors")
    }

    fn definitions(&self) -> Vec<OperationDefinition> {
        vec![
            OperationDefinition::new(
                LIST_MONITORS,
                "List monitors, optionally limited to one workspace",
                ObjectShape::new().optional(
                    WORKSPACE_ID,
                    Shape::string(),
                    "Only return monitors in this workspace",
                ),
            ),
            OperationDefinition::new(
                GET_MONITOR,
                "Get a monitor",
                with_resource_uri(monitor_id()),
            ),
            OperationDefinition::new(
                CREATE_MONITOR,
                "Create a monitor that runs a collection on a schedule",
                ObjectShape::new()
                    .optional(
                        WORKSPACE_ID,
                        Shape::string(),
                        "Workspace to create the monitor in",
                    )
                    .required(
                        "monitor",
                        ObjectShape::new()
                            .required("name", Shape::string(), "Monitor name")
                            .required("collection", Shape::string(), "Collection UID to run")
                            .optional(
                                "environment",
                                Shape::string(),
                                "Environment UID to run with",
                            )
                            .required("schedule", schedule(), "Run schedule"),
                        "Monitor to create",
                    ),
            ),
            OperationDefinition::new(
                UPDATE_MONITOR,
                "Update a monitor's name or schedule",
                monitor_id().required(
                    "monitor",
                    ObjectShape::new()
                        .optional("name", Shape::string(), "Monitor name")
                        .optional("schedule", schedule(), "Run schedule"),
                    "Fields to change",
                ),
            ),
            OperationDefinition::new(DELETE_MONITOR, "Delete a monitor", monitor_id()),
            OperationDefinition::new(
                RUN_MONITOR,
                "Run a monitor now and wait for its results",
                monitor_id(),
            ),
        ]
    }

    async fn call(&self, operation: &str, mut args: Arguments) -> Result<Value, OperationError> {
        let request = match operation {
            LIST_MONITORS => UpstreamRequest::get("/monitors")
                .query_opt("workspace", args.str(WORKSPACE_ID)),
            GET_MONITOR => {
                UpstreamRequest::get(endpoint(["monitors", args.require_str(MONITOR_ID)?]))
            }
            CREATE_MONITOR => UpstreamRequest::post("/monitors")
                .query_opt("workspace", args.str(WORKSPACE_ID))
                .json(json!({ "monitor": args.require("monitor")? })),
            UPDATE_MONITOR => {
                let path = endpoint(["monitors", args.require_str(MONITOR_ID)?]);
                UpstreamRequest::put(path).json(json!({ "monitor": args.require("monitor")? }))
            }
            DELETE_MONITOR => {
                UpstreamRequest::delete(endpoint(["monitors", args.require_str(MONITOR_ID)?]))
            }
            RUN_MONITOR => {
                let id = args.require_str(MONITOR_ID)?;
                UpstreamRequest::post(endpoint(["monitors", id, "run"]))
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

    fn tools() -> (MonitorTools, Arc<FakeUpstream>) {
        let upstream = Arc::new(FakeUpstream::ok());
        (MonitorTools::new(upstream.clone()), upstream)
    }

    #[tokio::test]
    async fn create_monitor_wraps_body() {
        let (tools, upstream) = tools();
        let monitor = json!({
            "name": "Nightly",
            "collection": "123-abc",
            "schedule": { "cron": "0 0 * * *", "timezone": "UTC" }
        });
        invoke(
            &tools,
            CREATE_MONITOR,
            json!({ "workspace_id": "ws-1", "monitor": monitor.clone() }),
        )
        .await
        .unwrap();
        let request = upstream.last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/monitors");
        assert_eq!(request.body, Some(json!({ "monitor": monitor })));
    }

    #[tokio::test]
    async fn schedule_needs_timezone() {
        let (tools, _) = tools();
        let err = invoke(
            &tools,
            CREATE_MONITOR,
            json!({
                "monitor": { "name": "n", "collection": "c", "schedule": { "cron": "* * * * *" } }
            }),
        )
        .await
        .unwrap_err();
        match err {
            OperationError::InvalidArguments { message } => {
                assert!(message.contains("monitor.schedule.timezone"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_monitor_posts() {
        let (tools, upstream) = tools();
        invoke(&tools, RUN_MONITOR, json!({ "monitor_id": "mon-1" }))
            .await
            .unwrap();
        let request = upstream.last();
        assert_eq!(
            (request.method, request.path.as_str()),
            (Method::POST, "/monitors/mon-1/run")
        );
    }
}
