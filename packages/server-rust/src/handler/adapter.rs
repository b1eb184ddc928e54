//! Operation adapter: binds a typed business function and its error whitelist
//! into a handler that classifies every outcome into a [`HandlerResult`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use opgate_core::{AllowedErrors, IdentifiableError, OperationFailure, Validatable};
use serde::Serialize;
use tracing::{debug, error};

use super::delegate::OperationDelegate;
use super::result::{dispatch, HandlerResult};

/// Business function signature wrapped by an [`OperationHandler`].
pub type OperationFn<I, O, E, C> = dyn Fn(I, &C) -> Result<O, OperationFailure<E>> + Send + Sync;

/// Whether outputs are validated before being handed to the delegate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputValidation {
    /// Validate every output; a failure is reported as an internal error.
    #[default]
    Validate,
    /// Hand outputs to the delegate unchecked.
    Skip,
}

/// Adapter around one business operation.
///
/// Invoking the handler never fails: the input is validated, the operation
/// runs at most once, and whatever happens (including a panic) becomes
/// exactly one [`HandlerResult`] that is dispatched to the delegate.
///
/// Classification priority is fixed: returnable errors first, then
/// validation failures, then everything else as internal.
pub struct OperationHandler<I, O, E, C, D> {
    operation: Box<OperationFn<I, O, E, C>>,
    allowed_errors: Arc<AllowedErrors>,
    delegate: Option<D>,
    output_validation: OutputValidation,
}

impl<I, O, E, C, D> OperationHandler<I, O, E, C, D>
where
    I: Validatable,
    O: Validatable + Serialize,
    E: IdentifiableError,
    D: OperationDelegate,
{
    /// Wraps `operation`, exposing only the errors listed in `allowed_errors`.
    pub fn new<F>(operation: F, allowed_errors: impl Into<Arc<AllowedErrors>>) -> Self
    where
        F: Fn(I, &C) -> Result<O, OperationFailure<E>> + Send + Sync + 'static,
    {
        Self {
            operation: Box::new(operation),
            allowed_errors: allowed_errors.into(),
            delegate: None,
            output_validation: OutputValidation::default(),
        }
    }

    /// Uses `delegate` for this operation instead of the framework default.
    #[must_use]
    pub fn with_delegate(mut self, delegate: D) -> Self {
        self.delegate = Some(delegate);
        self
    }

    #[must_use]
    pub fn with_output_validation(mut self, mode: OutputValidation) -> Self {
        self.output_validation = mode;
        self
    }

    #[must_use]
    pub fn allowed_errors(&self) -> &AllowedErrors {
        &self.allowed_errors
    }

    /// Resolves the delegate for one call: the operation's override if set,
    /// otherwise the default passed in by the transport.
    pub fn effective_delegate<'a>(&'a self, default_delegate: &'a D) -> &'a D {
        self.delegate.as_ref().unwrap_or(default_delegate)
    }

    /// Validate `input`, run the operation and classify its outcome.
    ///
    /// A panic anywhere in validation or in the operation itself is caught
    /// and classified as an internal error.
    pub fn classify(&self, input: I, context: &C) -> HandlerResult<O, E> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run(input, context))).unwrap_or_else(
            |payload| {
                HandlerResult::InternalError(anyhow::anyhow!(
                    "operation panicked: {}",
                    panic_message(payload.as_ref())
                ))
            },
        )
    }

    fn run(&self, input: I, context: &C) -> HandlerResult<O, E> {
        if let Err(err) = input.validate() {
            return HandlerResult::ValidationError(err.reason);
        }

        match (self.operation)(input, context) {
            Ok(output) => self.check_output(output),
            Err(failure) => {
                debug!(kind = failure.kind(), "operation failed");
                match failure {
                    OperationFailure::Returnable(err) => {
                        HandlerResult::ReturnableError(err, Arc::clone(&self.allowed_errors))
                    }
                    OperationFailure::Validation { reason } => HandlerResult::ValidationError(reason),
                    OperationFailure::Internal(err) => HandlerResult::InternalError(err),
                }
            }
        }
    }

    fn check_output(&self, output: O) -> HandlerResult<O, E> {
        if self.output_validation == OutputValidation::Skip {
            return HandlerResult::Success(output);
        }
        match output.validate() {
            Ok(()) => HandlerResult::Success(output),
            Err(err) => HandlerResult::InternalError(
                anyhow::Error::new(err).context("operation produced an invalid output"),
            ),
        }
    }

    /// Run the operation for `input` and write exactly one response through
    /// `responder`.
    ///
    /// Never unwinds. If the delegate itself panics while answering, the
    /// responder is dropped unanswered and the panic is logged.
    pub fn handle(
        &self,
        input: I,
        request: &D::Request,
        context: &C,
        default_delegate: &D,
        responder: D::ResponseHandler,
    ) {
        let delegate = self.effective_delegate(default_delegate);
        let result = self.classify(input, context);
        debug!(outcome = result.outcome(), "operation classified");
        let dispatched = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatch(result, delegate, request, responder);
        }));
        if let Err(payload) = dispatched {
            error!(
                panic = panic_message(payload.as_ref()),
                "delegate panicked while writing the response"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use opgate_core::{RequestContext, ValidationError};
    use proptest::prelude::*;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::handler::delegate::OperationFailureResponse;
    use crate::handler::testing::{responder, Outcome, Recorded, RecordingDelegate};

    #[derive(Debug, thiserror::Error)]
    enum ItemError {
        #[error("NotFound")]
        NotFound,
        #[error("Conflict")]
        Conflict,
    }

    impl IdentifiableError for ItemError {}

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Lookup {
        id: u32,
    }

    impl Validatable for Lookup {
        fn validate(&self) -> Result<(), ValidationError> {
            if self.id == 0 {
                return Err(ValidationError::new("id must be non-zero"));
            }
            Ok(())
        }
    }

    #[derive(Debug, Serialize)]
    struct Even(u32);

    impl Validatable for Even {
        fn validate(&self) -> Result<(), ValidationError> {
            if self.0 % 2 != 0 {
                return Err(ValidationError::new("value must be even"));
            }
            Ok(())
        }
    }

    type Handler<O> = OperationHandler<Lookup, O, ItemError, RequestContext, RecordingDelegate>;

    fn ctx() -> RequestContext {
        RequestContext::new("node-1", 1, "GetItem", "trace-1")
    }

    fn not_found_table() -> AllowedErrors {
        AllowedErrors::from_errors([(ItemError::NotFound, 404)])
    }

    fn invoke<O: Validatable + Serialize>(handler: &Handler<O>, id: u32) -> Recorded {
        let (tx, recorded) = responder();
        handler.handle(
            Lookup { id },
            &json!({ "id": id }),
            &ctx(),
            &RecordingDelegate::named("default"),
            tx,
        );
        recorded()
    }

    #[test]
    fn success_yields_returned_value() {
        let handler: Handler<u32> = OperationHandler::new(|_input, _ctx| Ok(42), AllowedErrors::new());
        assert!(matches!(handler.classify(Lookup { id: 1 }, &ctx()), HandlerResult::Success(42)));
        assert_eq!(invoke(&handler, 1).outcome, Outcome::Success(json!(42)));
    }

    #[test]
    fn whitelisted_error_returns_its_code() {
        let handler: Handler<u32> = OperationHandler::new(
            |_input, _ctx| Err(OperationFailure::returnable(ItemError::NotFound)),
            not_found_table(),
        );
        assert_eq!(
            invoke(&handler, 1).outcome,
            Outcome::Failure(OperationFailureResponse {
                code: 404,
                identity: "NotFound".to_string(),
                description: "NotFound".to_string(),
            })
        );
    }

    #[test]
    fn unlisted_returnable_error_is_generic() {
        let handler: Handler<u32> = OperationHandler::new(
            |_input, _ctx| Err(OperationFailure::returnable(ItemError::Conflict)),
            not_found_table(),
        );
        assert!(matches!(
            handler.classify(Lookup { id: 1 }, &ctx()),
            HandlerResult::ReturnableError(ItemError::Conflict, _)
        ));
        assert_eq!(invoke(&handler, 1).outcome, Outcome::Internal);
    }

    #[test]
    fn operation_validation_failure_keeps_reason() {
        let handler: Handler<u32> = OperationHandler::new(
            |_input, _ctx| Err(OperationFailure::validation("missing field x")),
            AllowedErrors::new(),
        );
        assert_eq!(
            invoke(&handler, 1).outcome,
            Outcome::Validation("missing field x".to_string())
        );
    }

    #[test]
    fn unrelated_failure_is_generic() {
        let handler: Handler<u32> = OperationHandler::new(
            |_input, _ctx| Err(anyhow::anyhow!("resource unavailable: db-primary").into()),
            not_found_table(),
        );
        let recorded = invoke(&handler, 1);
        assert_eq!(recorded.outcome, Outcome::Internal);
        assert!(!format!("{recorded:?}").contains("db-primary"));
    }

    #[test]
    fn invalid_input_never_reaches_operation() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let handler: Handler<u32> = OperationHandler::new(
            move |_input, _ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            },
            AllowedErrors::new(),
        );

        assert_eq!(
            invoke(&handler, 0).outcome,
            Outcome::Validation("id must be non-zero".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        invoke(&handler, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_becomes_internal_error() {
        let handler: Handler<u32> = OperationHandler::new(
            |input: Lookup, _ctx: &RequestContext| -> Result<u32, OperationFailure<ItemError>> {
                panic!("boom on {}", input.id)
            },
            AllowedErrors::new(),
        );
        match handler.classify(Lookup { id: 9 }, &ctx()) {
            HandlerResult::InternalError(err) => assert!(err.to_string().contains("boom on 9")),
            other => panic!("expected internal error, got {}", other.outcome()),
        }
        assert_eq!(invoke(&handler, 9).outcome, Outcome::Internal);
    }

    /// Validation that panics on `i64::MIN`, as `abs()` does with overflow checks.
    #[derive(Debug, Serialize, Deserialize)]
    struct Amount(i64);

    impl Validatable for Amount {
        fn validate(&self) -> Result<(), ValidationError> {
            let magnitude = self.0.checked_abs().expect("amount magnitude overflows");
            if magnitude > 1_000_000 {
                return Err(ValidationError::new("amount out of range"));
            }
            Ok(())
        }
    }

    #[test]
    fn panicking_input_validation_is_internal() {
        let handler: OperationHandler<Amount, u32, ItemError, RequestContext, RecordingDelegate> =
            OperationHandler::new(|_input, _ctx| Ok(1), AllowedErrors::new());
        let (tx, recorded) = responder();
        handler.handle(
            Amount(i64::MIN),
            &json!(i64::MIN),
            &ctx(),
            &RecordingDelegate::named("default"),
            tx,
        );
        assert_eq!(recorded().outcome, Outcome::Internal);
    }

    #[test]
    fn panicking_output_validation_is_internal() {
        let handler: Handler<Amount> =
            OperationHandler::new(|_input, _ctx| Ok(Amount(i64::MIN)), AllowedErrors::new());
        assert!(matches!(
            handler.classify(Lookup { id: 1 }, &ctx()),
            HandlerResult::InternalError(_)
        ));
        assert_eq!(invoke(&handler, 1).outcome, Outcome::Internal);
    }

    /// Delegate that panics on every response.
    struct Exploding;

    impl OperationDelegate for Exploding {
        type Request = serde_json::Value;
        type ResponseHandler = tokio::sync::oneshot::Sender<Recorded>;

        fn decode_input<T: serde::de::DeserializeOwned>(
            &self,
            request: &Self::Request,
        ) -> Result<T, crate::handler::DecodeError> {
            serde_json::from_value(request.clone())
                .map_err(|e| crate::handler::DecodeError::new(e.to_string()))
        }

        fn handle_success<T: Serialize>(&self, _: &Self::Request, _: &T, _: Self::ResponseHandler) {
            panic!("response writer failed");
        }

        fn handle_operation_failure(
            &self,
            _: &Self::Request,
            _: &OperationFailureResponse,
            _: Self::ResponseHandler,
        ) {
            panic!("response writer failed");
        }

        fn handle_validation_error(&self, _: &Self::Request, _: &str, _: Self::ResponseHandler) {
            panic!("response writer failed");
        }

        fn handle_decoding_error(&self, _: &Self::Request, _: &str, _: Self::ResponseHandler) {
            panic!("response writer failed");
        }

        fn handle_internal_error(&self, _: &Self::Request, _: Self::ResponseHandler) {
            panic!("response writer failed");
        }
    }

    #[test]
    fn panicking_delegate_does_not_unwind_out_of_handle() {
        let handler: OperationHandler<Lookup, u32, ItemError, RequestContext, Exploding> =
            OperationHandler::new(|_input, _ctx| Ok(1), AllowedErrors::new());
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        handler.handle(Lookup { id: 1 }, &json!({ "id": 1 }), &ctx(), &Exploding, tx);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn invalid_output_is_internal_unless_skipped() {
        let handler: Handler<Even> =
            OperationHandler::new(|input: Lookup, _ctx: &RequestContext| Ok(Even(input.id)), AllowedErrors::new());
        assert_eq!(invoke(&handler, 3).outcome, Outcome::Internal);
        assert_eq!(invoke(&handler, 4).outcome, Outcome::Success(json!(4)));

        let lenient = handler.with_output_validation(OutputValidation::Skip);
        assert_eq!(invoke(&lenient, 3).outcome, Outcome::Success(json!(3)));
    }

    #[test]
    fn override_delegate_takes_precedence() {
        let handler: Handler<u32> = OperationHandler::new(|_input, _ctx| Ok(7), AllowedErrors::new())
            .with_delegate(RecordingDelegate::named("override"));
        assert_eq!(invoke(&handler, 1).delegate, "override");

        let plain: Handler<u32> = OperationHandler::new(|_input, _ctx| Ok(7), AllowedErrors::new());
        assert_eq!(invoke(&plain, 1).delegate, "default");
    }

    #[test]
    fn operation_sees_context() {
        let handler: Handler<String> = OperationHandler::new(
            |_input, ctx: &RequestContext| Ok(ctx.trace_id.clone()),
            AllowedErrors::new(),
        );
        assert_eq!(invoke(&handler, 1).outcome, Outcome::Success(json!("trace-1")));
    }

    proptest! {
        #[test]
        fn success_is_identity_preserving(value in any::<u32>(), id in 1_u32..) {
            let handler: Handler<u32> =
                OperationHandler::new(move |_input, _ctx| Ok(value), AllowedErrors::new());
            prop_assert_eq!(invoke(&handler, id).outcome, Outcome::Success(json!(value)));
        }

        #[test]
        fn classification_is_idempotent(kind in 0_u8..4) {
            let handler: Handler<u32> = OperationHandler::new(
                move |_input, _ctx| match kind {
                    0 => Ok(1),
                    1 => Err(OperationFailure::returnable(ItemError::NotFound)),
                    2 => Err(OperationFailure::validation("bad")),
                    _ => Err(anyhow::anyhow!("down").into()),
                },
                not_found_table(),
            );
            let first = handler.classify(Lookup { id: 1 }, &ctx()).outcome();
            let second = handler.classify(Lookup { id: 1 }, &ctx()).outcome();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn internal_shape_is_independent_of_cause(cause in ".*") {
            let handler: Handler<u32> = OperationHandler::new(
                move |_input, _ctx| Err(anyhow::anyhow!(cause.clone()).into()),
                not_found_table(),
            );
            prop_assert_eq!(invoke(&handler, 1).outcome, Outcome::Internal);
        }
    }
}
