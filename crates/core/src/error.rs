//! Error types for the bid-stack engine.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the bid-stack engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied argument failed validation. Raised before any computation.
    #[error("Invalid argument `{argument}`: {message}")]
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// A bid price fell outside every configured price bin.
    #[error("Price {0} is not covered by any price bin")]
    PriceOutOfRange(f64),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or inconsistent input tables).
    #[error("Data error: {0}")]
    Data(String),

    /// Persisted store error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(argument: &'static str, msg: impl Into<String>) -> Self {
        Error::InvalidArgument {
            argument,
            message: msg.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Name of the offending argument, if this is a validation error.
    pub fn argument(&self) -> Option<&'static str> {
        match self {
            Error::InvalidArgument { argument, .. } => Some(argument),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_names_argument() {
        let err = Error::invalid_argument("start_time", "not a timestamp");
        assert_eq!(err.argument(), Some("start_time"));
        assert!(err.to_string().contains("start_time"));
    }

    #[test]
    fn test_other_errors_have_no_argument() {
        assert_eq!(Error::PriceOutOfRange(20000.0).argument(), None);
        assert_eq!(Error::database("locked").argument(), None);
    }
}
