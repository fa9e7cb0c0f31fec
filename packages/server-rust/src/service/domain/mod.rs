//! Feature modules: one [`ToolHandler`] per area of the Postman API.
//!
//! Each module declares its operations (name, description, input shape) and
//! maps validated arguments to upstream requests. Modules never classify
//! HTTP statuses; that happens once in the upstream client.

pub mod apis;
pub mod collections;
pub mod environments;
pub mod mocks;
pub mod monitors;
pub mod users;
pub mod workspaces;

use std::sync::Arc;

use postman_mcp_core::{ObjectShape, Shape};

pub use apis::ApiTools;
pub use collections::CollectionTools;
pub use environments::EnvironmentTools;
pub use mocks::MockTools;
pub use monitors::MonitorTools;
pub use users::UserTools;
pub use workspaces::WorkspaceTools;

use super::registry::{OperationRegistry, RegistryError};
use super::router::RESOURCE_URI_ARG;
use crate::traits::{ToolHandler, Upstream};

pub(crate) const WORKSPACE_ID: &str = "workspace_id";
pub(crate) const COLLECTION_ID: &str = "collection_id";
pub(crate) const ENVIRONMENT_ID: &str = "environment_id";

/// Adds the optional `resourceUri` argument to a single-entity read.
pub(crate) fn with_resource_uri(shape: ObjectShape) -> ObjectShape {
    shape.optional(
        RESOURCE_URI_ARG,
        Shape::string(),
        "postman:// URI of the resource this call refers to",
    )
}

/// Builds the registry with every feature module, in catalog order.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateOperation`] if two modules declare the
/// same operation name.
pub fn build_registry(upstream: &Arc<dyn Upstream>) -> Result<OperationRegistry, RegistryError> {
    let modules: [Arc<dyn ToolHandler>; 7] = [
        Arc::new(WorkspaceTools::new(Arc::clone(upstream))),
        Arc::new(CollectionTools::new(Arc::clone(upstream))),
        Arc::new(EnvironmentTools::new(Arc::clone(upstream))),
        Arc::new(ApiTools::new(Arc::clone(upstream))),
        Arc::new(MockTools::new(Arc::clone(upstream))),
        Arc::new(MonitorTools::new(Arc::clone(upstream))),
        Arc::new(UserTools::new(Arc::clone(upstream))),
    ];

    let mut registry = OperationRegistry::new();
    for module in modules {
        registry.register(module)?;
    }
    tracing::info!(
        operations = registry.len(),
        modules = registry.modules().len(),
        "operation registry built"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::testing::FakeUpstream;

    fn registry() -> OperationRegistry {
        let upstream: Arc<dyn Upstream> = Arc::new(FakeUpstream::ok());
        build_registry(&upstream).unwrap()
    }

    #[test]
    fn modules_register_in_catalog_order() {
        assert_eq!(
            registry().modules(),
            &["workspaces", "collections", "environments", "apis", "mocks", "monitors", "users"]
        );
    }

    #[test]
    fn catalog_names_are_unique_and_snake_case() {
        let registry = registry();
        let names: Vec<_> = registry.all().map(|d| d.name.clone()).collect();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert!(names
            .iter()
            .all(|n| n.chars().all(|c| c.is_ascii_lowercase() || c == '_')));
        assert_eq!(names.first().map(String::as_str), Some("list_workspaces"));
        assert_eq!(
            names.last().map(String::as_str),
            Some("get_authenticated_user")
        );
    }

    #[test]
    fn every_input_schema_is_an_object() {
        for def in registry().all() {
            let schema = def.input_shape.to_json_schema();
            assert_eq!(schema["type"], "object", "{}", def.name);
            assert!(!def.description.is_empty(), "{}", def.name);
        }
    }
}
