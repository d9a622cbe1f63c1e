//! Error types for Cinder CI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Workflow definition errors
    #[error("Invalid workflow definition: {0}")]
    InvalidWorkflow(String),

    // Step execution errors
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Process terminated abnormally: {reason}")]
    AbnormalTermination { reason: String },

    #[error("Step timed out after {seconds} seconds")]
    ExecutionTimeout { seconds: u64 },

    #[error("Cancelled by request")]
    CancelledByRequest,

    // Scheduling errors
    #[error("No capable execution environment for instance: {0}")]
    NoCapableEnvironment(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
