/// Uniql Error Module
///
/// This module defines the uniform error taxonomy every layer of uniql
/// reports through. Backend-native failures never leave the session layer
/// as-is: they are decoded by the active driver into a [`DriverError`] and
/// surfaced as [`UniqlError::Backend`] or [`UniqlError::Authentication`].
use std::fmt;
use thiserror::Error;

/// A backend failure after it has been passed through the driver's error
/// decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    /// Canonical name of the driver that produced the error
    pub driver: String,
    /// Backend specific error code, empty when the backend has none
    pub code: String,
    /// Human readable message
    pub message: String,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            write!(f, "{}: {}", self.driver, self.message)
        } else {
            write!(f, "{}: {}: {}", self.driver, self.code, self.message)
        }
    }
}

/// Comprehensive error type for uniql.
///
/// Configuration and pre-flight errors are fatal and never retried.
/// `Authentication` is the single retryable class. End of input and user
/// interrupts are not errors at all; see [`crate::input::Read`].
#[derive(Error, Debug)]
pub enum UniqlError {
    /// The DSN named a backend that has no registered driver
    #[error("{0}: driver not available")]
    DriverNotAvailable(String),

    #[error("not connected")]
    NotConnected,

    #[error("missing dsn")]
    MissingDsn,

    #[error("invalid dsn: {0}")]
    InvalidDsn(String),

    #[error("no previous transaction exists")]
    NoPreviousTransactionExists,

    #[error("previous transaction exists")]
    PreviousTransactionExists,

    #[error("--single-transaction cannot be used with interactive mode")]
    SingleTransactionCannotBeUsedWithInteractiveMode,

    #[error("\\password not supported by driver")]
    PasswordNotSupportedByDriver,

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("password attempts exhausted")]
    PasswordAttemptsExhausted,

    #[error("cannot include directories")]
    CannotIncludeDirectories,

    #[error("no such file or directory")]
    NoSuchFileOrDirectory,

    #[error("missing required argument")]
    MissingRequiredArgument,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Decoded backend failure
    #[error("{0}")]
    Backend(DriverError),

    /// Decoded backend failure that the driver recognised as a rejected password
    #[error("{0}")]
    Authentication(DriverError),

    /// File system and terminal I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UniqlError {
    /// Returns true when the error is a rejected password, the only failure
    /// the orchestrator retries.
    pub fn is_password_error(&self) -> bool {
        matches!(self, UniqlError::Authentication(_))
    }

    /// Returns the decoded backend error, if this is one.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            UniqlError::Backend(e) | UniqlError::Authentication(e) => Some(e),
            _ => None,
        }
    }
}

/// Type alias for Result to use UniqlError as the error type.
pub type Result<T> = std::result::Result<T, UniqlError>;
