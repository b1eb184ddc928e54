//! Deadline middleware.
//!
//! Each call gets the deadline configured for its operation name, or the
//! server-wide default. When the deadline passes the caller is answered with
//! `OperationError::Timeout`; the handler keeps its execution slot until it
//! actually returns (see `service::admission`).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::{Layer, Service};
use tracing::warn;

use crate::handler::{JsonRequest, JsonResponse};
use crate::service::config::ServerConfig;
use crate::service::operation::OperationError;

/// Deadline table: a default plus per-operation overrides, in milliseconds.
#[derive(Debug, Clone)]
pub struct Deadlines {
    default_ms: u64,
    overrides: Arc<HashMap<String, u64>>,
}

impl Deadlines {
    #[must_use]
    pub fn new(default_ms: u64) -> Self {
        Self {
            default_ms,
            overrides: Arc::default(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            default_ms: config.default_operation_timeout_ms,
            overrides: Arc::new(config.operation_timeouts_ms.clone()),
        }
    }

    /// Sets the deadline for one operation.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>, timeout_ms: u64) -> Self {
        Arc::make_mut(&mut self.overrides).insert(operation.into(), timeout_ms);
        self
    }

    #[must_use]
    pub fn for_operation(&self, operation: &str) -> u64 {
        self.overrides
            .get(operation)
            .copied()
            .unwrap_or(self.default_ms)
    }
}

/// Tower layer applying [`Deadlines`] to every call.
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    deadlines: Deadlines,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(deadlines: Deadlines) -> Self {
        Self { deadlines }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            deadlines: self.deadlines.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    deadlines: Deadlines,
}

impl<S> Service<JsonRequest> for TimeoutService<S>
where
    S: Service<JsonRequest, Response = JsonResponse, Error = OperationError>,
    S::Future: Send + 'static,
{
    type Response = JsonResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<JsonResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: JsonRequest) -> Self::Future {
        let timeout_ms = self.deadlines.for_operation(&request.operation);
        let operation = request.operation.clone();
        let call = self.inner.call(request);
        Box::pin(async move {
            tokio::time::timeout(Duration::from_millis(timeout_ms), call)
                .await
                .unwrap_or_else(|_elapsed| {
                    warn!(operation = %operation, timeout_ms, "operation deadline exceeded");
                    Err(OperationError::Timeout { timeout_ms })
                })
        })
    }
}
