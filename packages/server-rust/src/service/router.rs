//! Operation routing: dispatches a `JsonRequest` to the handler registered
//! under its operation name.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use opgate_core::RequestContext;
use tower::Service;
use uuid::Uuid;

use super::admission::OperationPermits;
use super::config::ServerConfig;
use super::operation::OperationError;
use crate::handler::{JsonDelegate, JsonRequest, JsonResponse, RequestHandler, ResponseSender};

/// A registered handler, shared across clones of the router.
pub type SharedHandler = Arc<dyn RequestHandler<RequestContext, JsonDelegate>>;

type BoxedFuture = Pin<Box<dyn Future<Output = Result<JsonResponse, OperationError>> + Send>>;

// ---------------------------------------------------------------------------
// OperationRouter
// ---------------------------------------------------------------------------

/// Routes `JsonRequest` values to operation handlers by operation name.
///
/// Handlers are registered up front; clones share the handler table and the
/// call-id counter. Each call claims an execution slot, builds a fresh
/// `RequestContext` and runs the (synchronous, possibly blocking) handler on
/// tokio's blocking pool. The slot is held until the handler returns, even if
/// the caller has stopped waiting.
#[derive(Clone)]
pub struct OperationRouter {
    handlers: Arc<HashMap<String, SharedHandler>>,
    delegate: JsonDelegate,
    node_id: Arc<str>,
    call_id_counter: Arc<AtomicU64>,
    permits: OperationPermits,
}

impl OperationRouter {
    /// Create a new empty router for the configured node.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            handlers: Arc::new(HashMap::new()),
            delegate: JsonDelegate,
            node_id: Arc::from(config.node_id.as_str()),
            call_id_counter: Arc::new(AtomicU64::new(1)),
            permits: OperationPermits::new(config.max_concurrent_operations),
        }
    }

    /// Register a handler for the given operation name. Re-registering a name
    /// replaces the previous handler.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H)
    where
        H: RequestHandler<RequestContext, JsonDelegate> + 'static,
    {
        self.register_shared(name, Arc::new(handler));
    }

    /// Register an already shared handler.
    pub fn register_shared(&mut self, name: impl Into<String>, handler: SharedHandler) {
        let name = name.into();
        tracing::debug!(operation = %name, "registering operation handler");
        Arc::make_mut(&mut self.handlers).insert(name, handler);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Names of all registered operations, sorted.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Operations whose handlers are still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.permits.in_flight()
    }

    /// Generate a unique call ID for each operation.
    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn make_ctx(&self, request: &JsonRequest) -> RequestContext {
        let trace_id = request
            .trace_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        RequestContext::new(
            self.node_id.as_ref(),
            self.next_call_id(),
            request.operation.as_str(),
            trace_id,
        )
    }
}

impl Default for OperationRouter {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}

impl Service<JsonRequest> for OperationRouter {
    type Response = JsonResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: JsonRequest) -> Self::Future {
        let Some(handler) = self.handlers.get(&request.operation).cloned() else {
            let name = request.operation;
            return Box::pin(async move { Err(OperationError::UnknownOperation { name }) });
        };

        let permit = match self.permits.try_admit(&request.operation) {
            Ok(permit) => permit,
            Err(err) => return Box::pin(async move { Err(err) }),
        };

        let ctx = self.make_ctx(&request);
        let delegate = self.delegate;
        Box::pin(async move {
            let (responder, response) = ResponseSender::channel();
            tokio::task::spawn_blocking(move || {
                handler.handle_request(request, ctx, &delegate, responder);
                drop(permit);
            })
            .await
            .map_err(|err| anyhow::Error::new(err).context("operation task failed"))?;

            response.await.map_err(|_| {
                OperationError::Internal(anyhow::anyhow!(
                    "operation finished without writing a response"
                ))
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
