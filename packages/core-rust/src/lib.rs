//! `opgate` Core — capability contracts shared by business operations and the server:
//! self-validating values, identifiable errors, allowed-error whitelists and the
//! failure sum type operations return.

pub mod allowed_errors;
pub mod context;
pub mod failure;
pub mod identity;
pub mod validation;

pub use allowed_errors::AllowedErrors;
pub use context::RequestContext;
pub use failure::OperationFailure;
pub use identity::IdentifiableError;
pub use validation::{Validatable, ValidatableCodable, ValidationError};
