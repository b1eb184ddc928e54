//! Delegate contract: the request/response plumbing an operation handler
//! reports its outcome through.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A whitelisted error, resolved to its external code, ready to be written
/// as a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailureResponse {
    /// Numeric code from the operation's `AllowedErrors` table.
    pub code: u16,
    /// Stable identity of the error (the whitelist key).
    pub identity: String,
    /// Caller-facing description of the error.
    pub description: String,
}

/// Failure to decode an operation input from the request payload.
#[derive(Debug, thiserror::Error)]
#[error("failed to decode input: {reason}")]
pub struct DecodeError {
    pub reason: String,
}

impl DecodeError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Request/response plumbing for operation handlers.
///
/// A delegate knows the wire format: how to decode an input from a
/// `Request` and how to turn each kind of outcome into a response written
/// through a `ResponseHandler`. Every `handle_*` method consumes the
/// responder, so exactly one response is written per invocation.
///
/// One delegate is configured framework-wide and passed to every call;
/// individual operations may carry their own override.
pub trait OperationDelegate: Send + Sync + 'static {
    /// Transport request as seen by the delegate.
    type Request: Send + 'static;
    /// Single-use sink the response is written to.
    type ResponseHandler: Send + 'static;

    /// Decode an operation input from the request payload.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError` if the payload does not match the input shape.
    fn decode_input<I: DeserializeOwned>(&self, request: &Self::Request) -> Result<I, DecodeError>;

    /// Write a successful response carrying `output`.
    fn handle_success<O: Serialize>(
        &self,
        request: &Self::Request,
        output: &O,
        responder: Self::ResponseHandler,
    );

    /// Write an error response for a whitelisted operation error.
    fn handle_operation_failure(
        &self,
        request: &Self::Request,
        failure: &OperationFailureResponse,
        responder: Self::ResponseHandler,
    );

    /// Write a client-error response carrying `reason` verbatim.
    fn handle_validation_error(
        &self,
        request: &Self::Request,
        reason: &str,
        responder: Self::ResponseHandler,
    );

    /// Write a client-error response for an undecodable payload.
    fn handle_decoding_error(
        &self,
        request: &Self::Request,
        reason: &str,
        responder: Self::ResponseHandler,
    );

    /// Write a generic failure response with no detail.
    fn handle_internal_error(&self, request: &Self::Request, responder: Self::ResponseHandler);
}
