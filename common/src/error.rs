//! Error handling for the rddviz-common crate.

use thiserror::Error;

/// Common error type that abstracts over underlying library errors.
///
/// Each variant carries a human readable message and, where one exists, the
/// underlying error as its source.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid configuration: {message}")]
    ConfigurationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("IO operation failed: {message}")]
    IoError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Deserialization failed: {message}")]
    DeserializationError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Malformed input: {message}")]
    ParseError {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

impl CommonError {
    /// Create a configuration error with a custom message.
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error with a custom message and source error.
    pub fn io_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::IoError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a deserialization error with a custom message and source error.
    pub fn deserialization_error_with_source<S: Into<String>, E: Into<anyhow::Error>>(
        message: S,
        source: E,
    ) -> Self {
        Self::DeserializationError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a parse error with a custom message.
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        Self::ParseError {
            message: message.into(),
            source: None,
        }
    }

    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            CommonError::ConfigurationError { message, .. }
            | CommonError::IoError { message, .. }
            | CommonError::DeserializationError { message, .. }
            | CommonError::ParseError { message, .. } => message,
        }
    }
}

impl From<std::io::Error> for CommonError {
    fn from(error: std::io::Error) -> Self {
        CommonError::io_error_with_source(error.to_string(), error)
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(error: serde_json::Error) -> Self {
        CommonError::deserialization_error_with_source(error.to_string(), error)
    }
}
