use crate::types::Capability;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CogniCodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to initialize {capability} worker: {reason}")]
    WorkerInitialization {
        capability: Capability,
        reason: String,
    },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config_manager::ConfigError),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, CogniCodeError>;
