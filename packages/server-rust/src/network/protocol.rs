//! MCP method handling on top of the dispatcher.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::jsonrpc::{Request, Response, RpcError, INTERNAL_ERROR, JSONRPC_VERSION};
use crate::service::Dispatcher;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "postman-mcp";

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReadParams {
    uri: String,
}

/// Answers MCP requests using one shared [`Dispatcher`].
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    #[must_use]
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Handles one message. Notifications produce no response.
    pub async fn handle(&self, request: Request) -> Option<Response> {
        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };
        let outcome = if request.jsonrpc == JSONRPC_VERSION {
            self.dispatch(&request.method, request.params).await
        } else {
            Err(RpcError::invalid_request(format!(
                "unsupported jsonrpc version `{}`",
                request.jsonrpc
            )))
        };
        Some(match outcome {
            Ok(result) => Response::success(id, result),
            Err(error) => {
                tracing::debug!(method = %request.method, code = error.code, "request failed");
                Response::failure(id, error)
            }
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false },
                    "resources": { "subscribe": false, "listChanged": false },
                },
                "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({
                "tools": to_value(self.dispatcher.list_operations())?
            })),
            "tools/call" => {
                let params: ToolCallParams = parse_params(params)?;
                match self.dispatcher.invoke(&params.name, params.arguments).await {
                    Ok(envelope) => to_value(envelope),
                    Err(envelope) => Err(envelope.into()),
                }
            }
            "resources/list" => Ok(json!({
                "resources": to_value(self.dispatcher.list_resources())?
            })),
            "resources/templates/list" => Ok(json!({
                "resourceTemplates": to_value(self.dispatcher.list_resource_templates())?
            })),
            "resources/read" => {
                let params: ReadParams = parse_params(params)?;
                let contents = self.dispatcher.read_resource(&params.uri).await?;
                Ok(json!({ "contents": to_value(contents)? }))
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, RpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|err| RpcError::invalid_params(format!("invalid params: {err}")))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| RpcError::new(INTERNAL_ERROR, err.to_string()))
}
