use serde::de::DeserializeOwned;
use serde::Serialize;

/// A semantic constraint violation found while validating a value.
///
/// The `reason` is shown to the caller verbatim, so it must never carry
/// server-internal detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {reason}")]
pub struct ValidationError {
    /// Human-readable description of the violated constraint.
    pub reason: String,
}

impl ValidationError {
    /// Creates a validation error carrying the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Self-validating value.
///
/// Every operation input and output implements this. Decoding from the wire
/// only checks shape; `validate` checks ranges, required fields and
/// cross-field consistency afterwards.
pub trait Validatable {
    /// Inspect the semantic constraints of this value.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first violated constraint.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// A validatable value that round-trips through the wire format.
///
/// Blanket-implemented; operation handlers bound their input and output
/// types on this.
pub trait ValidatableCodable: Validatable + Serialize + DeserializeOwned {}

impl<T> ValidatableCodable for T where T: Validatable + Serialize + DeserializeOwned {}

/// Implements `Validatable` as a no-op for types with no semantic constraints.
macro_rules! always_valid {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Validatable for $ty {
                fn validate(&self) -> Result<(), ValidationError> {
                    Ok(())
                }
            }
        )*
    };
}

always_valid!(
    (),
    bool,
    String,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    isize,
    f32,
    f64,
);

impl<T: Validatable> Validatable for Vec<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        self.iter().try_for_each(Validatable::validate)
    }
}

impl<T: Validatable> Validatable for Option<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Some(value) => value.validate(),
            None => Ok(()),
        }
    }
}

impl<T: Validatable + ?Sized> Validatable for Box<T> {
    fn validate(&self) -> Result<(), ValidationError> {
        (**self).validate()
    }
}
