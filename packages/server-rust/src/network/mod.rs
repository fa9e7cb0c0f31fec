//! MCP transport: JSON-RPC framing over stdio, method handling, shutdown.

pub mod jsonrpc;
pub mod protocol;
pub mod shutdown;
pub mod stdio;

pub use jsonrpc::{Request, Response, RpcError};
pub use protocol::{McpServer, PROTOCOL_VERSION};
pub use shutdown::{HealthState, InFlightGuard, ShutdownController};
pub use stdio::serve;
