use super::Error;

/// A write succeeded but its result could not be read back by the same call.
///
/// Distinct from [`Error::not_found`]: the row exists, but a collaborating
/// plugin (or a concurrent change) hid it from the read-back.
#[derive(Debug)]
pub(super) struct RejectedByPolicy {
    model: Box<str>,
    operation: Box<str>,
}

impl std::error::Error for RejectedByPolicy {}

impl core::fmt::Display for RejectedByPolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "result of {}.{} is not allowed to be read back",
            self.model, self.operation
        )
    }
}

impl Error {
    /// Creates a rejected-by-policy error.
    pub fn rejected_by_policy(model: impl Into<String>, operation: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::RejectedByPolicy(RejectedByPolicy {
            model: model.into().into(),
            operation: operation.into().into(),
        }))
    }

    /// Returns `true` if this error is a rejected-by-policy error.
    pub fn is_rejected_by_policy(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::RejectedByPolicy(_)))
    }
}
