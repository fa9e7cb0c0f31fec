//! Catalog descriptors advertised to callers.

use serde::Serialize;

use crate::schema::ObjectShape;

/// MIME type of every resource this adapter serves.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Immutable descriptor of a callable operation.
///
/// Serializes to the catalog wire form `{name, description, inputSchema}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_shape: ObjectShape,
}

impl OperationDefinition {
    #[must_use]
    pub fn new(name: &str, description: &str, input_shape: ObjectShape) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_shape,
        }
    }
}

/// A fixed, directly addressable resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// A parameterized resource, addressed through a URI template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDefinition {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}
