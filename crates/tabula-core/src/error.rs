//! Error types for Tabula.
//!
//! Every fallible session operation reports through [`Error`]. Partial restore
//! failures are deliberately absent: they are warnings carried by the restore
//! report, not errors.

use thiserror::Error;

/// Result type alias using the Tabula error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Tabula.
#[derive(Error, Debug)]
pub enum Error {
    /// Named session is absent from the store
    #[error("Session not found: {0}")]
    NotFound(String),

    /// Stored snapshot is structurally malformed
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Reading or writing the backing storage failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The user declined an unsaved-changes prompt
    #[error("Operation cancelled")]
    OperationCancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected input, such as an unusable session name
    #[error("Validation error: {0}")]
    Validation(String),

    /// A host collaborator call failed
    #[error("Host error: {0}")]
    Host(String),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::NotFound(_) => Some("Use 'tabula session list' to see available sessions"),
            Error::InvalidSnapshot(_) => {
                Some("The session file may be damaged; export it and inspect the JSON")
            }
            Error::Io(_) => Some("Check that the session directory exists and is writable"),
            Error::Config(_) => Some("Check your config file at ~/.config/tabula/config.toml"),
            Error::Validation(_) => Some(
                "Session names must be non-empty, not '.' or '..', and not padded with spaces",
            ),
            Error::OperationCancelled | Error::Host(_) => None,
        }
    }

    /// Shorthand for an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Error::InvalidSnapshot(message.into())
    }

    /// Shorthand for a host failure.
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_has_suggestion() {
        let err = Error::NotFound("work".to_string());
        assert!(err.to_string().contains("work"));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_cancelled_has_no_suggestion() {
        let err = Error::OperationCancelled;
        assert!(err.recovery_suggestion().is_none());
        assert_eq!(format_error_with_suggestion(&err), "Operation cancelled");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(format_error_with_suggestion(&err).contains("Suggestion"));
    }
}
