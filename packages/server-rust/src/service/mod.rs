//! Operation routing and execution framework.
//!
//! This module implements the service-oriented operation pipeline:
//!
//! 1. **Routing** (`router`): Dispatch a `JsonRequest` to its registered handler
//! 2. **Admission** (`admission`): Execution slots bounding concurrent handlers
//! 3. **Middleware** (`middleware`): Tower layers (call logging, deadlines)
//! 4. **Errors** (`operation`): Transport-level failures and their responses
//! 5. **Configuration** (`config`): Node identity, timeouts, concurrency limits

pub mod admission;
pub mod config;
pub mod middleware;
pub mod operation;
pub mod router;

// Re-export key types for convenient access.
pub use admission::{OperationPermit, OperationPermits};
pub use config::ServerConfig;
pub use middleware::{build_operation_pipeline, OperationPipeline, PipelineService};
pub use operation::OperationError;
pub use router::{OperationRouter, SharedHandler};
