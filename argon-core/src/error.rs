//! Error types for the Argon engine.

use thiserror::Error;

/// Main error type for the Argon engine.
#[derive(Error, Debug)]
pub enum ArgonError {
    /// A token could not be converted to the parameter's declared type
    #[error("invalid value for '{param}': {reason}")]
    Conversion { param: String, reason: String },

    /// A converted value was rejected by one or more validation rules
    #[error("validation failed for '{param}': {message}")]
    Validation { param: String, message: String },

    /// An argument name that no parameter declares
    #[error("argument name not found: {0}")]
    UnknownArgument(String),

    /// A required parameter was never supplied
    #[error("required argument not specified: {0}")]
    MissingArgument(String),

    /// No command in the table matches the requested path
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// The invocation was cancelled before completing
    #[error("operation was cancelled")]
    Cancelled { forced: bool },

    /// The engine was configured inconsistently before dispatch
    #[error("configuration error: {0}")]
    Config(String),

    /// Anything raised by a command body or filter that the engine
    /// does not recognize
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Argon operations
pub type Result<T> = std::result::Result<T, ArgonError>;

impl ArgonError {
    /// Whether this is a framework-recognized error kind.
    ///
    /// Recognized kinds are logged message-only by the dispatcher;
    /// anything else gets full diagnostic detail.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, ArgonError::Other(_))
    }
}
