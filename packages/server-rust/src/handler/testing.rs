//! Recording delegate shared by the handler tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;

use super::delegate::{DecodeError, OperationDelegate, OperationFailureResponse};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Success(serde_json::Value),
    Failure(OperationFailureResponse),
    Validation(String),
    Decoding(String),
    Internal,
}

/// What a `RecordingDelegate` was asked to write, and which delegate wrote it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Recorded {
    pub delegate: &'static str,
    pub outcome: Outcome,
}

/// Delegate whose requests are raw JSON values and whose responses are
/// captured on a oneshot channel.
pub(crate) struct RecordingDelegate {
    pub name: &'static str,
}

impl RecordingDelegate {
    pub(crate) fn named(name: &'static str) -> Self {
        Self { name }
    }

    fn send(&self, responder: oneshot::Sender<Recorded>, outcome: Outcome) {
        let _ = responder.send(Recorded {
            delegate: self.name,
            outcome,
        });
    }
}

impl OperationDelegate for RecordingDelegate {
    type Request = serde_json::Value;
    type ResponseHandler = oneshot::Sender<Recorded>;

    fn decode_input<I: DeserializeOwned>(&self, request: &Self::Request) -> Result<I, DecodeError> {
        serde_json::from_value(request.clone()).map_err(|e| DecodeError::new(e.to_string()))
    }

    fn handle_success<O: Serialize>(
        &self,
        _request: &Self::Request,
        output: &O,
        responder: Self::ResponseHandler,
    ) {
        let value = serde_json::to_value(output).unwrap_or(serde_json::Value::Null);
        self.send(responder, Outcome::Success(value));
    }

    fn handle_operation_failure(
        &self,
        _request: &Self::Request,
        failure: &OperationFailureResponse,
        responder: Self::ResponseHandler,
    ) {
        self.send(responder, Outcome::Failure(failure.clone()));
    }

    fn handle_validation_error(
        &self,
        _request: &Self::Request,
        reason: &str,
        responder: Self::ResponseHandler,
    ) {
        self.send(responder, Outcome::Validation(reason.to_string()));
    }

    fn handle_decoding_error(
        &self,
        _request: &Self::Request,
        reason: &str,
        responder: Self::ResponseHandler,
    ) {
        self.send(responder, Outcome::Decoding(reason.to_string()));
    }

    fn handle_internal_error(&self, _request: &Self::Request, responder: Self::ResponseHandler) {
        self.send(responder, Outcome::Internal);
    }
}

/// Creates a responder and returns a closure that yields what was written to it.
pub(crate) fn responder() -> (oneshot::Sender<Recorded>, impl FnOnce() -> Recorded) {
    let (tx, mut rx) = oneshot::channel();
    (tx, move || rx.try_recv().expect("delegate wrote no response"))
}
