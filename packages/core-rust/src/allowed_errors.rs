use std::collections::HashMap;

use crate::identity::IdentifiableError;

/// Whitelist of errors an operation may expose to callers, with their codes.
///
/// Entries keep their registration order. Identities should be unique; when
/// they are not, the last-registered entry wins on lookup. The table is built
/// once per operation and shared read-only across invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedErrors {
    entries: Vec<(String, u16)>,
    index: HashMap<String, u16>,
}

impl AllowedErrors {
    /// Creates an empty table. Every returnable error is then treated as internal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from example error values and their codes.
    pub fn from_errors<E, I>(errors: I) -> Self
    where
        E: IdentifiableError,
        I: IntoIterator<Item = (E, u16)>,
    {
        errors
            .into_iter()
            .map(|(err, code)| (err.identity().into_owned(), code))
            .collect()
    }

    /// Appends an entry, returning the extended table.
    #[must_use]
    pub fn with(mut self, identity: impl Into<String>, code: u16) -> Self {
        self.push(identity.into(), code);
        self
    }

    fn push(&mut self, identity: String, code: u16) {
        self.index.insert(identity.clone(), code);
        self.entries.push((identity, code));
    }

    /// Returns the code registered for `identity`, if any.
    #[must_use]
    pub fn code_for(&self, identity: &str) -> Option<u16> {
        self.index.get(identity).copied()
    }

    /// Returns the code registered for the error's identity, if any.
    #[must_use]
    pub fn lookup<E: IdentifiableError + ?Sized>(&self, error: &E) -> Option<u16> {
        self.code_for(&error.identity())
    }

    /// Iterates over the entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> {
        self.entries.iter().map(|(id, code)| (id.as_str(), *code))
    }

    /// Number of registered entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u16)> for AllowedErrors {
    fn from_iter<T: IntoIterator<Item = (S, u16)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (identity, code) in iter {
            table.push(identity.into(), code);
        }
        table
    }
}
