//! Postman MCP core: shape validation, resource URI routing, error taxonomy
//! and the response envelopes shared by every operation.

pub mod args;
pub mod envelope;
pub mod error;
pub mod operation;
pub mod path;
pub mod schema;
pub mod uri;

pub use args::{ArgumentError, Arguments};
pub use envelope::{
    to_pretty_json, Content, ErrorEnvelope, ErrorKind, ResourceContents, ResponseEnvelope,
};
pub use error::UpstreamError;
pub use operation::{
    OperationDefinition, ResourceDefinition, ResourceTemplateDefinition, JSON_MIME_TYPE,
};
pub use path::endpoint;
pub use schema::{Field, ObjectShape, Primitive, Problem, Shape, ValidationError};
pub use uri::{
    resource_type, EndpointBuilder, ResourceRouter, RouteFailure, RouteMatch, RouteParams,
    TemplateError, UriPattern,
};
