//! Worker error types.

use thiserror::Error;

use reel_models::RecordId;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Record {record_id} is missing {what}")]
    MissingInput { record_id: RecordId, what: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    #[error("Record store error: {0}")]
    Records(#[from] reel_records::RecordError),

    #[error("Provider error: {0}")]
    Provider(#[from] reel_providers::ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),
}

impl WorkerError {
    pub fn missing_input(record_id: &RecordId, what: impl Into<String>) -> Self {
        Self::MissingInput {
            record_id: record_id.clone(),
            what: what.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Check if running the stage again could succeed without changing the record.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Records(e) => e.is_retryable(),
            WorkerError::Provider(e) => e.is_rate_limited() || e.is_transport(),
            _ => false,
        }
    }
}
