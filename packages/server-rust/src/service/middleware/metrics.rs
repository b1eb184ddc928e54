//! Call logging for the operation pipeline.
//!
//! Every call runs inside an `operation` span carrying its name and trace id.
//! On completion one event is emitted with the latency, the HTTP status and a
//! coarse outcome class. Failures on the server side are logged at `warn`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info, info_span, warn, Instrument};

use crate::handler::{JsonRequest, JsonResponse};
use crate::service::operation::OperationError;

/// Coarse class of a finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// 2xx answer from the operation.
    Success,
    /// 4xx answer: whitelisted error, invalid or undecodable input.
    Rejected,
    /// 5xx answer from the operation, or a pipeline internal error.
    Failed,
    /// The operation's deadline passed.
    TimedOut,
    /// No execution slot was free.
    Shed,
    /// No handler is registered under the requested name.
    Unrouted,
}

impl CallOutcome {
    #[must_use]
    pub fn of(result: &Result<JsonResponse, OperationError>) -> Self {
        match result {
            Ok(resp) if resp.status.is_success() => Self::Success,
            Ok(resp) if resp.status.is_client_error() => Self::Rejected,
            Ok(_) | Err(OperationError::Internal(_)) => Self::Failed,
            Err(OperationError::Timeout { .. }) => Self::TimedOut,
            Err(OperationError::Overloaded) => Self::Shed,
            Err(OperationError::UnknownOperation { .. }) => Self::Unrouted,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Shed => "shed",
            Self::Unrouted => "unrouted",
        }
    }

    fn is_server_fault(self) -> bool {
        matches!(self, Self::Failed | Self::TimedOut)
    }
}

/// Tower layer wrapping each call in an `operation` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<JsonRequest> for MetricsService<S>
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
        let span = info_span!(
            "operation",
            operation = %request.operation,
            trace_id = request.trace_id.as_deref().unwrap_or(""),
        );
        let started = Instant::now();
        let call = span.in_scope(|| self.inner.call(request));

        Box::pin(
            async move {
                let result = call.await;
                log_completion(&result, started);
                result
            }
            .instrument(span),
        )
    }
}

fn log_completion(result: &Result<JsonResponse, OperationError>, started: Instant) {
    let outcome = CallOutcome::of(result);
    let status = match result {
        Ok(resp) => resp.status,
        Err(err) => err.to_response().status,
    };
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if outcome.is_server_fault() {
        warn!(
            outcome = outcome.as_str(),
            status = status.as_u16(),
            elapsed_ms,
            "operation call failed"
        );
    } else {
        info!(
            outcome = outcome.as_str(),
            status = status.as_u16(),
            elapsed_ms,
            "operation call finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::handler::json::{error_response, internal_error_response};

    /// Echoes the request body with 200.
    struct Echo;

    impl Service<JsonRequest> for Echo {
        type Response = JsonResponse;
        type Error = OperationError;
        type Future =
            Pin<Box<dyn Future<Output = Result<JsonResponse, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: JsonRequest) -> Self::Future {
            Box::pin(async move {
                Ok(JsonResponse {
                    status: StatusCode::OK,
                    body: request.body,
                })
            })
        }
    }

    #[tokio::test]
    async fn passes_response_through() {
        let resp = MetricsLayer
            .layer(Echo)
            .oneshot(JsonRequest::new("Echo", "[1,2]").with_trace_id("t-1"))
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, Bytes::from_static(b"[1,2]"));
    }

    #[test]
    fn outcome_classes() {
        let cases = [
            (Ok(error_response(StatusCode::OK, "x", None)), CallOutcome::Success),
            (
                Ok(error_response(StatusCode::NOT_FOUND, "NotFound", None)),
                CallOutcome::Rejected,
            ),
            (Ok(internal_error_response()), CallOutcome::Failed),
            (
                Err(OperationError::Timeout { timeout_ms: 5 }),
                CallOutcome::TimedOut,
            ),
            (Err(OperationError::Overloaded), CallOutcome::Shed),
            (
                Err(OperationError::UnknownOperation {
                    name: "Nope".to_string(),
                }),
                CallOutcome::Unrouted,
            ),
        ];
        for (result, expected) in cases {
            assert_eq!(CallOutcome::of(&result), expected, "{}", expected.as_str());
        }
    }
}
