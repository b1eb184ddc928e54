use std::borrow::Cow;
use std::fmt::Display;

/// Domain error with a stable, human-readable identity.
///
/// The identity is the lookup key against an `AllowedErrors` table. By default
/// it is the error's description (its `Display` output), so an enum of unit
/// variants displayed by name gets identities like `"NotFound"` for free.
/// Errors whose description carries per-instance detail should override
/// `identity` with something stable.
pub trait IdentifiableError: Display {
    /// Returns the identity used for whitelist lookups.
    fn identity(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    /// Returns the description shown to the caller when this error is
    /// whitelisted.
    fn description(&self) -> String {
        self.to_string()
    }
}
