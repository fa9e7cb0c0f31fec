//! Uniform response and error envelopes returned at the outer boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::UpstreamError;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Failure classes surfaced by the dispatcher.
///
/// Protocol kinds describe a malformed request ("you asked wrong") and abort
/// the call with a structured error. Every other kind is a soft failure that
/// is returned inside a normal envelope with `isError: true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownOperation,
    InvalidArguments,
    ResourceNotHandled,
    InvalidResource,
    UpstreamRejected,
    UpstreamUnauthorized,
    UpstreamForbidden,
    UpstreamNotFound,
    UpstreamInternal,
    TransportFailure,
}

impl ErrorKind {
    /// Whether this kind is reported as a protocol-level error.
    #[must_use]
    pub const fn is_protocol(self) -> bool {
        matches!(
            self,
            Self::UnknownOperation
                | Self::InvalidArguments
                | Self::ResourceNotHandled
                | Self::InvalidResource
        )
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownOperation => "UnknownOperation",
            Self::InvalidArguments => "InvalidArguments",
            Self::ResourceNotHandled => "ResourceNotHandled",
            Self::InvalidResource => "InvalidResource",
            Self::UpstreamRejected => "UpstreamRejected",
            Self::UpstreamUnauthorized => "UpstreamUnauthorized",
            Self::UpstreamForbidden => "UpstreamForbidden",
            Self::UpstreamNotFound => "UpstreamNotFound",
            Self::UpstreamInternal => "UpstreamInternal",
            Self::TransportFailure => "TransportFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ErrorEnvelope
// ---------------------------------------------------------------------------

/// Classified failure produced by the dispatcher from any error source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        self.kind.is_protocol()
    }

    /// Converts a soft failure into the envelope callers branch on.
    #[must_use]
    pub fn into_response(self) -> ResponseEnvelope {
        ResponseEnvelope::error(self.message)
    }
}

impl From<UpstreamError> for ErrorEnvelope {
    fn from(err: UpstreamError) -> Self {
        let envelope = Self::new(err.kind(), err.to_string());
        match err.status() {
            Some(status) => envelope.with_data(json!({ "status": status })),
            None => envelope,
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseEnvelope
// ---------------------------------------------------------------------------

/// One content item of a response. Only text is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// Uniform output of every tool invocation, successful or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl ResponseEnvelope {
    /// Wraps a handler payload as pretty-printed JSON text.
    #[must_use]
    pub fn success(payload: &Value) -> Self {
        Self {
            content: vec![Content::Text {
                text: to_pretty_json(payload),
            }],
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Text of the first content item.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            Content::Text { text } => text.as_str(),
        })
    }
}

/// Contents of a read resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

#[must_use]
pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_wire_shape() {
        let envelope = ResponseEnvelope::success(&json!({ "id": "e-1" }));
        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            wire,
            json!({
                "content": [{ "type": "text", "text": "{\n  \"id\": \"e-1\"\n}" }],
                "isError": false
            })
        );
    }

    #[test]
    fn soft_error_becomes_is_error_envelope() {
        let envelope: ErrorEnvelope = UpstreamError::NotFound {
            message: "no such environment".to_string(),
        }
        .into();
        assert_eq!(envelope.kind, ErrorKind::UpstreamNotFound);
        assert_eq!(envelope.data, Some(json!({ "status": 404 })));
        assert!(!envelope.is_protocol());

        let response = envelope.into_response();
        assert!(response.is_error);
        assert_eq!(
            response.text(),
            Some("Resource not found: no such environment")
        );
    }

    #[test]
    fn protocol_kinds() {
        assert!(ErrorKind::UnknownOperation.is_protocol());
        assert!(ErrorKind::InvalidArguments.is_protocol());
        assert!(ErrorKind::ResourceNotHandled.is_protocol());
        assert!(ErrorKind::InvalidResource.is_protocol());
        assert!(!ErrorKind::UpstreamRejected.is_protocol());
        assert!(!ErrorKind::TransportFailure.is_protocol());
    }

    #[test]
    fn error_envelope_serialization_omits_empty_data() {
        let envelope = ErrorEnvelope::new(ErrorKind::UnknownOperation, "Unknown tool: nope");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "kind": "UnknownOperation", "message": "Unknown tool: nope" })
        );
        assert_eq!(envelope.to_string(), "UnknownOperation: Unknown tool: nope");
    }
}
