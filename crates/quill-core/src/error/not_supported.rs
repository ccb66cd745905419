use super::Error;

/// Error when the active provider cannot express a requested feature.
///
/// Raised while building SQL, before anything is sent to the database. Examples
/// are native array filters on SQLite or `DISTINCT ON` on MySQL.
#[derive(Debug)]
pub(super) struct NotSupported {
    feature: Box<str>,
    provider: Box<str>,
}

impl std::error::Error for NotSupported {}

impl core::fmt::Display for NotSupported {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{} is not supported by the \"{}\" provider",
            self.feature, self.provider
        )
    }
}

impl Error {
    /// Creates a not supported error.
    pub fn not_supported(feature: impl Into<String>, provider: impl core::fmt::Display) -> Error {
        Error::from(super::ErrorKind::NotSupported(NotSupported {
            feature: feature.into().into(),
            provider: provider.to_string().into(),
        }))
    }

    /// Returns `true` if this error is a not supported error.
    pub fn is_not_supported(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::NotSupported(_)))
    }
}
