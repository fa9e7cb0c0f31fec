use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use postman_mcp_core::OperationDefinition;

use crate::traits::ToolHandler;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Startup failure while merging feature modules into one namespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("operation `{name}` from `{module}` is already registered by `{existing_module}`")]
    DuplicateOperation {
        name: String,
        existing_module: &'static str,
        module: &'static str,
    },
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// A definition paired with the module handler that executes it.
#[derive(Clone)]
pub struct RegisteredOperation {
    pub definition: OperationDefinition,
    pub handler: Arc<dyn ToolHandler>,
}

impl RegisteredOperation {
    #[must_use]
    pub fn module(&self) -> &'static str {
        self.handler.module()
    }
}

impl std::fmt::Debug for RegisteredOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredOperation")
            .field("name", &self.definition.name)
            .field("module", &self.module())
            .finish()
    }
}

/// Flat operation namespace built from per-module contributions.
///
/// Modules are registered once at startup; names must be unique across all
/// of them. Catalog order is the concatenation of module orders, so two
/// registries built the same way list operations identically.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    operations: Vec<RegisteredOperation>,
    by_name: HashMap<String, usize>,
    modules: Vec<&'static str>,
}

impl OperationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every definition of `handler` to the namespace.
    ///
    /// Nothing is added if any name collides, with an earlier module or
    /// within the module itself.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateOperation`] on the first collision.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<(), RegistryError> {
        let module = handler.module();
        let definitions = handler.definitions();

        let mut incoming = HashSet::with_capacity(definitions.len());
        for def in &definitions {
            if let Some(existing) = self.lookup(&def.name) {
                return Err(RegistryError::DuplicateOperation {
                    name: def.name.clone(),
                    existing_module: existing.module(),
                    module,
                });
            }
            if !incoming.insert(def.name.as_str()) {
                return Err(RegistryError::DuplicateOperation {
                    name: def.name.clone(),
                    existing_module: module,
                    module,
                });
            }
        }

        tracing::debug!(module, operations = definitions.len(), "registering module");
        for definition in definitions {
            self.by_name.insert(definition.name.clone(), self.operations.len());
            self.operations.push(RegisteredOperation {
                definition,
                handler: Arc::clone(&handler),
            });
        }
        self.modules.push(module);
        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&RegisteredOperation> {
        self.by_name.get(name).map(|&idx| &self.operations[idx])
    }

    /// Every definition, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &OperationDefinition> {
        self.operations.iter().map(|op| &op.definition)
    }

    /// Names of registered modules, in registration order.
    #[must_use]
    pub fn modules(&self) -> &[&'static str] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
