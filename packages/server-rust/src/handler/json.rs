//! JSON delegate: decodes inputs and writes responses with `serde_json`.
//!
//! Error responses share one body shape, `{"__type": ..., "message": ...}`,
//! with `message` omitted for internal errors.

use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use super::delegate::{DecodeError, OperationDelegate, OperationFailureResponse};

pub const INTERNAL_ERROR_TYPE: &str = "InternalError";
pub const VALIDATION_ERROR_TYPE: &str = "ValidationError";
pub const DECODING_ERROR_TYPE: &str = "SerializationException";
pub const INVALID_OPERATION_TYPE: &str = "InvalidOperation";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// An operation request with a JSON body, as handed over by the transport.
#[derive(Debug, Clone)]
pub struct JsonRequest {
    /// Name of the operation to invoke.
    pub operation: String,
    /// Raw JSON payload. An empty body decodes as `null`.
    pub body: Bytes,
    /// Trace identifier propagated from the transport, if any.
    pub trace_id: Option<String>,
}

impl JsonRequest {
    #[must_use]
    pub fn new(operation: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            operation: operation.into(),
            body: body.into(),
            trace_id: None,
        }
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

/// A fully serialized response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl JsonResponse {
    /// Parses the body back into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body is not valid JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.body)
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "__type")]
    pub error_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Builds an error response with the shared body shape.
#[must_use]
pub fn error_response(status: StatusCode, error_type: &str, message: Option<&str>) -> JsonResponse {
    let body = ErrorBody {
        error_type: error_type.to_string(),
        message: message.map(ToString::to_string),
    };
    // Serializing two strings cannot fail.
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    JsonResponse {
        status,
        body: Bytes::from(bytes),
    }
}

/// The fixed, detail-free response for internal failures.
#[must_use]
pub fn internal_error_response() -> JsonResponse {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_TYPE, None)
}

// ---------------------------------------------------------------------------
// ResponseSender
// ---------------------------------------------------------------------------

/// Single-use sink for a `JsonResponse`.
#[derive(Debug)]
pub struct ResponseSender(oneshot::Sender<JsonResponse>);

impl ResponseSender {
    /// Creates a sender and the receiver the transport awaits.
    #[must_use]
    pub fn channel() -> (Self, oneshot::Receiver<JsonResponse>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    pub fn send(self, response: JsonResponse) {
        if self.0.send(response).is_err() {
            debug!("response receiver dropped before the response was written");
        }
    }
}

// ---------------------------------------------------------------------------
// JsonDelegate
// ---------------------------------------------------------------------------

/// Default delegate for JSON-over-HTTP operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDelegate;

impl OperationDelegate for JsonDelegate {
    type Request = JsonRequest;
    type ResponseHandler = ResponseSender;

    fn decode_input<I: DeserializeOwned>(&self, request: &Self::Request) -> Result<I, DecodeError> {
        let body: &[u8] = if request.body.is_empty() {
            b"null"
        } else {
            &request.body
        };
        serde_json::from_slice(body).map_err(|e| DecodeError::new(e.to_string()))
    }

    fn handle_success<O: Serialize>(
        &self,
        request: &Self::Request,
        output: &O,
        responder: Self::ResponseHandler,
    ) {
        match serde_json::to_vec(output) {
            Ok(bytes) => responder.send(JsonResponse {
                status: StatusCode::OK,
                body: Bytes::from(bytes),
            }),
            Err(err) => {
                error!(
                    operation = %request.operation,
                    error = %err,
                    "failed to serialize operation output"
                );
                self.handle_internal_error(request, responder);
            }
        }
    }

    fn handle_operation_failure(
        &self,
        request: &Self::Request,
        failure: &OperationFailureResponse,
        responder: Self::ResponseHandler,
    ) {
        let status = StatusCode::from_u16(failure.code)
            .ok()
            .filter(|status| status.is_client_error() || status.is_server_error())
            .unwrap_or_else(|| {
                warn!(
                    operation = %request.operation,
                    code = failure.code,
                    "allowed error code is not a 4xx/5xx HTTP status, answering 500"
                );
                StatusCode::INTERNAL_SERVER_ERROR
            });
        responder.send(error_response(
            status,
            &failure.identity,
            Some(failure.description.as_str()),
        ));
    }

    fn handle_validation_error(
        &self,
        _request: &Self::Request,
        reason: &str,
        responder: Self::ResponseHandler,
    ) {
        responder.send(error_response(
            StatusCode::BAD_REQUEST,
            VALIDATION_ERROR_TYPE,
            Some(reason),
        ));
    }

    fn handle_decoding_error(
        &self,
        _request: &Self::Request,
        reason: &str,
        responder: Self::ResponseHandler,
    ) {
        responder.send(error_response(
            StatusCode::BAD_REQUEST,
            DECODING_ERROR_TYPE,
            Some(reason),
        ));
    }

    fn handle_internal_error(&self, _request: &Self::Request, responder: Self::ResponseHandler) {
        responder.send(internal_error_response());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
