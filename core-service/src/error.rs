//! Error handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised across the ingestion and classification pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Bad bind address, port or other setting
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Mid-stream read or decode failure on a client connection
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Missing, empty or wrongly typed input, or a series shorter than one window
    #[error("Validation error: {0}")]
    Validation(String),

    /// Scoring function could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Scoring function failed on a window
    #[error("Model error: {0}")]
    Model(String),

    /// Sink write or read failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Short taxonomy name, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "ConfigurationError",
            Error::Protocol(_) => "ProtocolError",
            Error::Validation(_) => "ValidationError",
            Error::ModelLoad(_) => "ModelLoadError",
            Error::Model(_) => "ModelError",
            Error::Persistence(_) => "PersistenceError",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
