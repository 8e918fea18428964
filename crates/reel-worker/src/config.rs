//! Worker configuration.

use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Qualifying results a variant needs before it is accepted
    pub min_qualifying: usize,
    /// Review count a search result needs to qualify
    pub min_reviews_per_result: u64,
    /// Candidates checked concurrently per batch
    pub batch_size: usize,
    /// Pause between candidate batches
    pub batch_pause: Duration,
    /// Ranked results written back to a record
    pub top_n: usize,
    /// Synthesis calls allowed in flight across all records
    pub max_concurrent_synthesis: usize,
    /// Retries for a rate-limited synthesis call
    pub synthesis_max_retries: u32,
    /// First synthesis backoff; doubles per retry
    pub synthesis_base_backoff: Duration,
    /// Time between render status checks
    pub render_poll_interval: Duration,
    /// Wait after submission before the first status check
    pub render_initial_delay: Duration,
    /// Status checks made before a render is declared timed out
    pub render_max_polls: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            min_qualifying: 3,
            min_reviews_per_result: 50,
            batch_size: 3,
            batch_pause: Duration::from_secs(1),
            top_n: 5,
            max_concurrent_synthesis: 2,
            synthesis_max_retries: 3,
            synthesis_base_backoff: Duration::from_millis(500),
            render_poll_interval: Duration::from_secs(15),
            render_initial_delay: Duration::from_secs(120), // renders take minutes to start
            render_max_polls: 40,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// Unset or unparsable variables fall back to defaults; values that
    /// parse but cannot work (a zero batch size, say) are rejected.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();
        let config = Self {
            min_qualifying: env_parse("REEL_MIN_QUALIFYING").unwrap_or(defaults.min_qualifying),
            min_reviews_per_result: env_parse("REEL_MIN_REVIEWS")
                .unwrap_or(defaults.min_reviews_per_result),
            batch_size: env_parse("REEL_BATCH_SIZE").unwrap_or(defaults.batch_size),
            batch_pause: env_parse("REEL_BATCH_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.batch_pause),
            top_n: env_parse("REEL_TOP_N").unwrap_or(defaults.top_n),
            max_concurrent_synthesis: env_parse("REEL_MAX_CONCURRENT_SYNTHESIS")
                .unwrap_or(defaults.max_concurrent_synthesis),
            synthesis_max_retries: env_parse("REEL_SYNTHESIS_MAX_RETRIES")
                .unwrap_or(defaults.synthesis_max_retries),
            synthesis_base_backoff: env_parse("REEL_SYNTHESIS_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.synthesis_base_backoff),
            render_poll_interval: env_parse("REEL_RENDER_POLL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_poll_interval),
            render_initial_delay: env_parse("REEL_RENDER_INITIAL_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.render_initial_delay),
            render_max_polls: env_parse("REEL_RENDER_MAX_POLLS")
                .unwrap_or(defaults.render_max_polls),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WorkerResult<()> {
        if self.batch_size == 0 {
            return Err(WorkerError::config_error("batch size must be at least 1"));
        }
        if self.max_concurrent_synthesis == 0 {
            return Err(WorkerError::config_error(
                "max concurrent synthesis must be at least 1",
            ));
        }
        if self.render_max_polls == 0 {
            return Err(WorkerError::config_error("render max polls must be at least 1"));
        }
        if self.top_n == 0 {
            return Err(WorkerError::config_error("top n must be at least 1"));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
