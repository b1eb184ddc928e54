//! Pipeline composition: the router behind the call-logging and deadline layers.

use tower::ServiceBuilder;

use super::metrics::{MetricsLayer, MetricsService};
use super::timeout::{Deadlines, TimeoutLayer, TimeoutService};
use crate::handler::{JsonRequest, JsonResponse};
use crate::service::config::ServerConfig;
use crate::service::operation::OperationError;
use crate::service::router::OperationRouter;

/// Build the operation pipeline by wrapping the `OperationRouter` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- span and completion event for every call, including
///    timed-out and shed ones
/// 2. `TimeoutLayer` -- per-operation deadline
///
/// Admission (execution slots) happens inside the router, where the slot can
/// travel with the blocking work.
#[must_use]
pub fn build_operation_pipeline(
    router: OperationRouter,
    config: &ServerConfig,
) -> impl tower::Service<JsonRequest, Response = JsonResponse, Error = OperationError> {
    OperationPipeline::new(router, config).service()
}

/// The fully layered operation service.
pub type PipelineService = MetricsService<TimeoutService<OperationRouter>>;

/// Cloneable pipeline handle for transports that need one service per request.
///
/// Clones share the router, and with it the execution slots.
#[derive(Clone)]
pub struct OperationPipeline {
    router: OperationRouter,
    timeout: TimeoutLayer,
}

impl OperationPipeline {
    /// Deadlines come from `config`; execution slots belong to the router.
    #[must_use]
    pub fn new(router: OperationRouter, config: &ServerConfig) -> Self {
        Self {
            router,
            timeout: TimeoutLayer::new(Deadlines::from_config(config)),
        }
    }

    #[must_use]
    pub fn router(&self) -> &OperationRouter {
        &self.router
    }

    /// A fresh layered service over the shared router.
    #[must_use]
    pub fn service(&self) -> PipelineService {
        ServiceBuilder::new()
            .layer(MetricsLayer)
            .layer(self.timeout.clone())
            .service(self.router.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
