//! Operation catalog and execution.
//!
//! 1. **Registry** (`registry`): operation name -> module handler, built once
//! 2. **Routing** (`router`): lookup, validation, resource capability check
//! 3. **Middleware** (`middleware`): Tower layers (timeout, metrics)
//! 4. **Domain modules** (`domain`): one handler per area of the Postman API
//! 5. **Resources** (`resources`): `postman://` URI listings and reads
//! 6. **Dispatcher** (`dispatcher`): classifies every outcome into an envelope

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod resources;
pub mod router;

pub use config::ServerConfig;
pub use dispatcher::{BuildError, Dispatcher};
pub use operation::{OperationContext, OperationError, ToolCall};
pub use registry::{OperationRegistry, RegisteredOperation, RegistryError};
pub use resources::{postman_router, ResourceCatalog, SCHEME};
pub use router::ToolRouter;
