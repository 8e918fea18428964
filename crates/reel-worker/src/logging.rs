//! Structured stage logging utilities.
//!
//! Provides consistent, structured logging for pipeline stages with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use reel_models::RecordId;

/// Stage logger for structured logging with consistent formatting.
///
/// Every event carries the record ID and the stage name.
#[derive(Debug, Clone)]
pub struct StageLogger {
    record_id: String,
    stage: String,
}

impl StageLogger {
    /// Create a new logger for a record and stage (e.g. "qualify", "audio").
    pub fn new(record_id: &RecordId, stage: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            stage: stage.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            record_id = %self.record_id,
            stage = %self.stage,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            record_id = %self.record_id,
            stage = %self.stage,
            "Stage progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            record_id = %self.record_id,
            stage = %self.stage,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            record_id = %self.record_id,
            stage = %self.stage,
            "Stage error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            record_id = %self.record_id,
            stage = %self.stage,
            "Stage completed: {}", message
        );
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Create a tracing span for this stage run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "stage",
            record_id = %self.record_id,
            stage = %self.stage
        )
    }
}
