//! `POST /{operation}` handler: feeds the request body through the operation
//! pipeline and writes back whatever the delegate produced.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tower::ServiceExt;
use tracing::warn;

use super::AppState;
use crate::handler::{JsonRequest, JsonResponse};
use crate::network::middleware::REQUEST_ID_HEADER;
use crate::service::OperationError;

impl IntoResponse for JsonResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

impl IntoResponse for OperationError {
    fn into_response(self) -> Response {
        self.to_response().into_response()
    }
}

/// Invokes the named operation with the JSON request body.
///
/// The `x-request-id` header, set by the HTTP middleware when absent,
/// becomes the operation's trace id.
pub async fn operation_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut request = JsonRequest::new(operation, body);
    if let Some(trace_id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        request = request.with_trace_id(trace_id);
    }

    match state.pipeline.service().oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            warn!(error = %err, "operation rejected by pipeline");
            err.into_response()
        }
    }
}
