use super::Error;

/// Error when query arguments fail structural validation.
///
/// All violations found in one pass are collected so the caller sees every
/// problem at once.
#[derive(Debug)]
pub(super) struct InvalidInput {
    model: Box<str>,
    operation: Box<str>,
    violations: Vec<Violation>,
}

/// A single validation failure, located by a dotted path into the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Violation {
        Violation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for InvalidInput {}

impl core::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid {} args for model \"{}\": ",
            self.operation, self.model
        )?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            core::fmt::Display::fmt(violation, f)?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates an invalid input error listing every violation.
    pub fn invalid_input(
        model: impl Into<String>,
        operation: impl Into<String>,
        violations: Vec<Violation>,
    ) -> Error {
        Error::from(super::ErrorKind::InvalidInput(InvalidInput {
            model: model.into().into(),
            operation: operation.into().into(),
            violations,
        }))
    }

    /// Returns `true` if this error is an invalid input error.
    pub fn is_invalid_input(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::InvalidInput(_)))
    }

    /// The violations carried by an invalid input error.
    pub fn violations(&self) -> Option<&[Violation]> {
        self.chain().find_map(|err| match err.kind() {
            super::ErrorKind::InvalidInput(e) => Some(&e.violations[..]),
            _ => None,
        })
    }
}
