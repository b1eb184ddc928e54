//! Tower middleware layers for the operation pipeline.
//!
//! - [`metrics`]: Per-call span and completion event
//! - [`timeout`]: Per-operation deadlines
//! - [`pipeline`]: Composes the layers over the router

pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use metrics::{CallOutcome, MetricsLayer};
pub use pipeline::{build_operation_pipeline, OperationPipeline, PipelineService};
pub use timeout::{Deadlines, TimeoutLayer};
