//! Transport-level errors raised by the operation pipeline itself.

use http::StatusCode;

use crate::handler::json::{
    error_response, internal_error_response, JsonResponse, INVALID_OPERATION_TYPE,
};

/// Errors from routing and middleware, before or around an operation handler.
///
/// Handler outcomes never appear here: the handler answers every call itself.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OperationError {
    /// Renders the error as a client-facing response.
    ///
    /// Only `UnknownOperation` carries a message; internal causes are never
    /// exposed.
    #[must_use]
    pub fn to_response(&self) -> JsonResponse {
        match self {
            Self::UnknownOperation { name } => {
                let message = format!("unknown operation: {name}");
                error_response(
                    StatusCode::BAD_REQUEST,
                    INVALID_OPERATION_TYPE,
                    Some(message.as_str()),
                )
            }
            Self::Timeout { .. } => {
                error_response(StatusCode::GATEWAY_TIMEOUT, "Timeout", None)
            }
            Self::Overloaded => {
                error_response(StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable", None)
            }
            Self::Internal(_) => internal_error_response(),
        }
    }
}
