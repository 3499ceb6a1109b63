//! Error types for acvloose

use thiserror::Error;

/// Main error type for loose-loading operations
///
/// [`Error::User`] marks problems the user can fix themselves (wrong
/// path, missing directory, still-encrypted files). The driver prints
/// those without diagnostic noise and moves on to the next argument.
/// Every other variant is an internal fault and aborts the run with
/// full detail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    User(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {format} file: {reason}")]
    Format { format: &'static str, reason: String },

    #[error("Decryption error: {0}")]
    Decryption(String),
}

impl Error {
    /// Build a user-facing error from anything displayable
    pub fn user(msg: impl Into<String>) -> Self {
        Error::User(msg.into())
    }

    /// Build a format error for the named container format
    pub fn format(format: &'static str, reason: impl Into<String>) -> Self {
        Error::Format {
            format,
            reason: reason.into(),
        }
    }

    /// Whether this error should be shown as a friendly message and
    /// end only the current argument
    pub fn is_user(&self) -> bool {
        matches!(self, Error::User(_))
    }
}

/// Result type alias for loose-loading operations
pub type Result<T> = std::result::Result<T, Error>;
