//! Type-erased entry point the transport calls for a registered operation.

use opgate_core::{IdentifiableError, ValidatableCodable};
use tracing::debug;

use super::adapter::OperationHandler;
use super::delegate::OperationDelegate;

/// An operation handler with its input, output and error types erased.
///
/// The transport only knows the context and delegate types; decoding the
/// typed input from the request is the handler's job.
pub trait RequestHandler<C, D: OperationDelegate>: Send + Sync {
    /// Decode the input from `request`, run the operation and write exactly
    /// one response through `responder`.
    fn handle_request(
        &self,
        request: D::Request,
        context: C,
        default_delegate: &D,
        responder: D::ResponseHandler,
    );
}

impl<I, O, E, C, D> RequestHandler<C, D> for OperationHandler<I, O, E, C, D>
where
    I: ValidatableCodable,
    O: ValidatableCodable,
    E: IdentifiableError,
    D: OperationDelegate,
    Self: Send + Sync,
{
    fn handle_request(
        &self,
        request: D::Request,
        context: C,
        default_delegate: &D,
        responder: D::ResponseHandler,
    ) {
        let delegate = self.effective_delegate(default_delegate);
        match delegate.decode_input::<I>(&request) {
            Ok(input) => self.handle(input, &request, &context, default_delegate, responder),
            Err(err) => {
                debug!(reason = %err.reason, "operation input could not be decoded");
                delegate.handle_decoding_error(&request, &err.reason, responder);
            }
        }
    }
}
