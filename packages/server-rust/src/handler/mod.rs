//! Operation handlers: adapt typed business functions into uniform handlers.
//!
//! 1. **Adapter** (`adapter`): validates input, runs the operation, classifies the outcome
//! 2. **Result** (`result`): the closed `HandlerResult` set and its dispatch
//! 3. **Delegate** (`delegate`): request/response plumbing contract
//! 4. **Request** (`request`): type-erased handler invoked by the transport
//! 5. **JSON** (`json`): `serde_json` delegate used by the HTTP surface

pub mod adapter;
pub mod delegate;
pub mod json;
pub mod request;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{OperationFn, OperationHandler, OutputValidation};
pub use delegate::{DecodeError, OperationDelegate, OperationFailureResponse};
pub use json::{JsonDelegate, JsonRequest, JsonResponse, ResponseSender};
pub use request::RequestHandler;
pub use result::{dispatch, HandlerResult};
