//! Upstream failure taxonomy.
//!
//! This is the only place HTTP statuses are turned into failure classes.
//! Feature modules never branch on status codes themselves.

use http::StatusCode;
use serde_json::Value;

use crate::envelope::ErrorKind;

/// Every way a single upstream call can fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// 400 or 422: the upstream rejected the request as malformed.
    #[error("Bad request ({status}): {message}")]
    BadRequest { status: u16, message: String },
    /// 401: missing or invalid API key.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },
    /// 403: the key lacks permission for this resource.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },
    /// 404.
    #[error("Resource not found: {message}")]
    NotFound { message: String },
    /// 429. Passed through for the caller to react to.
    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },
    /// 5xx or any status not listed above.
    #[error("Upstream error ({status}): {message}")]
    Internal { status: u16, message: String },
    /// The request was sent but no response arrived (network failure, timeout).
    #[error("No response from upstream: {message}")]
    NoResponse { message: String },
    /// The request could not be built or sent (e.g. malformed URL).
    #[error("Failed to prepare upstream request: {message}")]
    RequestSetup { message: String },
}

impl UpstreamError {
    /// Classifies a non-success HTTP response.
    ///
    /// The message is taken from the upstream error body when it carries
    /// one; otherwise the canonical reason phrase is used. The raw body is
    /// never echoed.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| reason_phrase(status));
        match status {
            400 | 422 => Self::BadRequest { status, message },
            401 => Self::Unauthorized { message },
            403 => Self::Forbidden { message },
            404 => Self::NotFound { message },
            429 => Self::RateLimited { message },
            _ => Self::Internal { status, message },
        }
    }

    /// The error-envelope class this failure maps to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::BadRequest { .. } | Self::RateLimited { .. } => ErrorKind::UpstreamRejected,
            Self::Unauthorized { .. } => ErrorKind::UpstreamUnauthorized,
            Self::Forbidden { .. } => ErrorKind::UpstreamForbidden,
            Self::NotFound { .. } => ErrorKind::UpstreamNotFound,
            Self::Internal { .. } => ErrorKind::UpstreamInternal,
            Self::NoResponse { .. } | Self::RequestSetup { .. } => ErrorKind::TransportFailure,
        }
    }

    /// HTTP status of the upstream response, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::BadRequest { status, .. } | Self::Internal { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::NoResponse { .. } | Self::RequestSetup { .. } => None,
        }
    }
}

/// Pulls a human-readable message out of an upstream error body.
///
/// Recognizes `{"error": {"message": ..}}`, `{"error": {"name": ..}}`,
/// `{"message": ..}`, `{"error": ".."}`, `{"detail": ..}` and `{"title": ..}`.
#[must_use]
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error");
    let message = [
        error.and_then(|e| e.get("message")),
        error.and_then(|e| e.get("name")),
        value.get("message"),
        error,
        value.get("detail"),
        value.get("title"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .map(str::trim)
    .find(|s| !s.is_empty())
    .map(str::to_string);
    message
}

fn reason_phrase(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unrecognized status")
        .to_string()
}
