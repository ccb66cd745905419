use super::Error;

/// An invariant was violated at runtime.
///
/// Reaching one of these indicates a bug in quill rather than bad input, for
/// example a column reference that no scope can resolve during name mapping.
#[derive(Debug)]
pub(super) struct InternalError {
    message: Box<str>,
}

impl std::error::Error for InternalError {}

impl core::fmt::Display for InternalError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "internal error: {}", self.message)
    }
}

impl Error {
    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::Internal(InternalError {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an internal error.
    pub fn is_internal(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::Internal(_)))
    }
}
