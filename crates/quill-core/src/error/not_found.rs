use super::Error;

/// Error when an operation targeting a unique filter matched zero rows.
#[derive(Debug)]
pub(super) struct NotFound {
    model: Box<str>,
    operation: Box<str>,
}

impl std::error::Error for NotFound {}

impl core::fmt::Display for NotFound {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "record not found: {}.{}", self.model, self.operation)
    }
}

impl Error {
    /// Creates a not found error for `model.operation`.
    pub fn not_found(model: impl Into<String>, operation: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::NotFound(NotFound {
            model: model.into().into(),
            operation: operation.into().into(),
        }))
    }

    /// Returns `true` if this error is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::NotFound(_)))
    }
}
