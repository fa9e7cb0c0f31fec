//! Tower middleware layers for the operation pipeline.
//!
//! - [`timeout`]: Per-call deadline enforcement
//! - [`metrics`]: Call timing and outcome via `tracing` spans
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use metrics::MetricsLayer;
pub use pipeline::{build_operation_pipeline, OperationPipeline};
pub use timeout::TimeoutLayer;
