//! In-memory upstream used by unit tests across the crate.

use std::sync::Mutex;

use async_trait::async_trait;
use postman_mcp_core::UpstreamError;
use serde_json::{json, Value};

use crate::service::operation::OperationError;
use crate::traits::{ToolHandler, Upstream};
use crate::upstream::UpstreamRequest;

type Responder = Box<dyn Fn(&UpstreamRequest) -> Result<Value, UpstreamError> + Send + Sync>;

/// Records every request and answers through a scripted responder.
pub(crate) struct FakeUpstream {
    responder: Responder,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl FakeUpstream {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&UpstreamRequest) -> Result<Value, UpstreamError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with `{"ok": true}`.
    pub(crate) fn ok() -> Self {
        Self::new(|_| Ok(json!({ "ok": true })))
    }

    pub(crate) fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> UpstreamRequest {
        self.requests()
            .pop()
            .expect("at least one upstream request")
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn call(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let response = (self.responder)(&request);
        self.requests.lock().unwrap().push(request);
        response
    }
}

/// Validates `raw` against the handler's declared shape for `operation`,
/// then calls the handler, as the router would.
pub(crate) async fn invoke(
    handler: &dyn ToolHandler,
    operation: &str,
    raw: Value,
) -> Result<Value, OperationError> {
    let definition = handler
        .definitions()
        .into_iter()
        .find(|d| d.name == operation)
        .expect("operation is declared by the handler");
    let args = definition.input_shape.validate_arguments(raw)?;
    handler.call(operation, args).await
}
