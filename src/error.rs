//! The crate-wide error type.
//!
//! Internal functions build errors with `anyhow` and attach context as they go. At the command
//! boundary those errors are classified with an [`ErrorType`] so that callers (the CLI and the
//! MCP server) can report a stable kind alongside the message.

use serde::Serialize;
use std::fmt::{Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an error for reporting at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Malformed or out-of-range input. Nothing was persisted.
    Validation,
    /// A referenced identifier does not exist.
    NotFound,
    /// The operation conflicts with existing state, e.g. a duplicate template name.
    Conflict,
    /// A file could not be read or written.
    Io,
    /// The configuration directory or its files are missing or invalid.
    Config,
    /// A database operation failed.
    Database,
    /// The MCP service itself failed to start or run.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// An error paired with its [`ErrorType`] classification.
#[derive(Debug)]
pub struct Error {
    error_type: ErrorType,
    source: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, source: anyhow::Error) -> Self {
        Self { error_type, source }
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The human-readable message without the kind prefix.
    pub fn message(&self) -> String {
        self.source.to_string()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_type, self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

/// Converts an internal `anyhow`-style result into the public [`Result`] by assigning an
/// [`ErrorType`].
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e.into()))
    }
}

/// Shorthand for a [`Validation`](ErrorType::Validation) error.
pub(crate) fn validation(message: impl Into<String>) -> Error {
    Error::new(ErrorType::Validation, anyhow::anyhow!(message.into()))
}

/// Shorthand for a [`NotFound`](ErrorType::NotFound) error.
pub(crate) fn not_found(message: impl Into<String>) -> Error {
    Error::new(ErrorType::NotFound, anyhow::anyhow!(message.into()))
}

/// Shorthand for a [`Conflict`](ErrorType::Conflict) error.
pub(crate) fn conflict(message: impl Into<String>) -> Error {
    Error::new(ErrorType::Conflict, anyhow::anyhow!(message.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_kind() {
        let e = validation("amount must be positive");
        assert_eq!(e.to_string(), "validation: amount must be positive");
        assert_eq!(e.error_type(), ErrorType::Validation);
        assert_eq!(e.message(), "amount must be positive");
    }

    #[test]
    fn pub_result_classifies() {
        let r: anyhow::Result<()> = Err(anyhow::anyhow!("boom"));
        let e = r.pub_result(ErrorType::Database).unwrap_err();
        assert_eq!(e.error_type(), ErrorType::Database);
    }
}
