use std::fmt;

use crate::validation::ValidationError;

/// Every way a business operation can fail.
///
/// Business functions return `Result<Output, OperationFailure<E>>` where `E`
/// is their domain error type. The variant chosen decides what the caller
/// gets to see:
///
/// - `Returnable`: exposed with its whitelisted code, if the operation's
///   `AllowedErrors` lists it; otherwise handled as internal.
/// - `Validation`: the reason is exposed verbatim as a client error.
/// - `Internal`: only logged; the caller gets a generic failure.
#[derive(Debug)]
pub enum OperationFailure<E> {
    Returnable(E),
    Validation { reason: String },
    Internal(anyhow::Error),
}

impl<E> OperationFailure<E> {
    #[must_use]
    pub fn returnable(error: E) -> Self {
        Self::Returnable(error)
    }

    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Wraps any error as an opaque internal failure.
    #[must_use]
    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self::Internal(error.into())
    }

    /// Short label of the failure kind, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Returnable(_) => "returnable",
            Self::Validation { .. } => "validation",
            Self::Internal(_) => "internal",
        }
    }
}

impl<E> From<ValidationError> for OperationFailure<E> {
    fn from(err: ValidationError) -> Self {
        Self::Validation { reason: err.reason }
    }
}

impl<E> From<anyhow::Error> for OperationFailure<E> {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl<E: fmt::Display> fmt::Display for OperationFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returnable(err) => write!(f, "returnable error: {err}"),
            Self::Validation { reason } => write!(f, "validation failed: {reason}"),
            Self::Internal(err) => write!(f, "internal error: {err:#}"),
        }
    }
}
