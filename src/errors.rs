use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for the schedule, generation, storage, and config layers.
#[derive(Error, Debug)]
pub enum RecurringError {
    #[error("Recurring template not found: {0}")]
    RecordNotFound(String),
    #[error("Invalid recurring template: {0}")]
    InvalidRecord(String),
    #[error("Unsupported frequency `{0}`")]
    UnsupportedFrequency(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = StdResult<T, RecurringError>;

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] RecurringError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for RecurringError {
    fn from(err: std::io::Error) -> Self {
        RecurringError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for RecurringError {
    fn from(err: serde_json::Error) -> Self {
        RecurringError::StorageError(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Core(RecurringError::from(err))
    }
}
