//! Handler results and their dispatch to a delegate.

use std::sync::Arc;

use opgate_core::{AllowedErrors, IdentifiableError};
use serde::Serialize;
use tracing::{debug, error};

use super::delegate::{OperationDelegate, OperationFailureResponse};

/// Outcome of one operation invocation.
///
/// Created once per call and consumed by [`dispatch`]; never retried or
/// replayed.
#[derive(Debug)]
pub enum HandlerResult<O, E> {
    /// The operation returned normally.
    Success(O),
    /// The operation failed with an error it marked as returnable. Carries
    /// the operation's whitelist so the code can be resolved at dispatch.
    ReturnableError(E, Arc<AllowedErrors>),
    /// The input, or the operation itself, reported a validation failure.
    ValidationError(String),
    /// Any other failure. The cause is logged, never exposed.
    InternalError(anyhow::Error),
}

impl<O, E> HandlerResult<O, E> {
    /// Short label of the variant, for logging and metrics.
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::ReturnableError(..) => "returnable_error",
            Self::ValidationError(_) => "validation_error",
            Self::InternalError(_) => "internal_error",
        }
    }
}

/// Forward a handler result to the delegate as exactly one response.
///
/// Returnable errors whose identity is missing from the whitelist are answered
/// exactly like internal errors.
pub fn dispatch<O, E, D>(
    result: HandlerResult<O, E>,
    delegate: &D,
    request: &D::Request,
    responder: D::ResponseHandler,
) where
    O: Serialize,
    E: IdentifiableError,
    D: OperationDelegate,
{
    match result {
        HandlerResult::Success(output) => {
            delegate.handle_success(request, &output, responder);
        }
        HandlerResult::ReturnableError(err, allowed_errors) => {
            let identity = err.identity().into_owned();
            if let Some(code) = allowed_errors.lookup(&err) {
                debug!(identity = %identity, code, "returning whitelisted operation error");
                let failure = OperationFailureResponse {
                    code,
                    identity,
                    description: err.description(),
                };
                delegate.handle_operation_failure(request, &failure, responder);
            } else {
                error!(
                    identity = %identity,
                    error = %err,
                    "operation returned an error not in its allowed errors"
                );
                delegate.handle_internal_error(request, responder);
            }
        }
        HandlerResult::ValidationError(reason) => {
            debug!(reason = %reason, "operation validation failed");
            delegate.handle_validation_error(request, &reason, responder);
        }
        HandlerResult::InternalError(err) => {
            error!(error = %format!("{err:#}"), "operation failed with an internal error");
            delegate.handle_internal_error(request, responder);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
