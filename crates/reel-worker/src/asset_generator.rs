//! Bounded narration generation.
//!
//! Every segment present on a record becomes one task. All tasks are
//! dispatched at once, but each synthesis call first takes a permit from a
//! shared pool, which caps in-flight calls to the speech provider across
//! everything that shares the pool. A permit covers one call only and is
//! released before any backoff sleep.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use reel_models::{GenerationTask, RecordId, SegmentKey, WorkRecord};
use reel_providers::{SpeechProvider, SpeechRequest, VoiceSettings};
use reel_storage::AssetStore;

use crate::metrics::{record_synthesis_attempt, record_synthesis_retry};
use crate::script::fit_task;

/// Retry policy for rate-limited synthesis calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisRetry {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for SynthesisRetry {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl SynthesisRetry {
    /// Backoff before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Result for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssetOutcome {
    Generated { url: String, attempts: u32 },
    Failed { reason: String, attempts: u32 },
}

impl AssetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AssetOutcome::Generated { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AssetOutcome::Generated { url, .. } => Some(url),
            AssetOutcome::Failed { .. } => None,
        }
    }
}

/// Outcome of generating every segment of one record.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub record_id: RecordId,
    pub outcomes: BTreeMap<SegmentKey, AssetOutcome>,
    /// `k/n`: successful segments over segments attempted.
    pub success_count: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl GenerationReport {
    fn new(
        record_id: RecordId,
        outcomes: BTreeMap<SegmentKey, AssetOutcome>,
        elapsed: Duration,
    ) -> Self {
        let successes = outcomes.values().filter(|o| o.is_success()).count();
        Self {
            record_id,
            success_count: format!("{}/{}", successes, outcomes.len()),
            outcomes,
            elapsed,
        }
    }

    pub fn successes(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.successes()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Asset field updates for the record, one per generated segment.
    pub fn field_updates(&self) -> Map<String, Value> {
        self.outcomes
            .iter()
            .filter_map(|(segment, outcome)| {
                outcome
                    .url()
                    .map(|url| (segment.asset_field(), Value::String(url.to_string())))
            })
            .collect()
    }
}

/// Synthesizes and stores narration for a record's segments.
pub struct AssetGenerator {
    speech: Arc<dyn SpeechProvider>,
    assets: Arc<dyn AssetStore>,
    voice: VoiceSettings,
    retry: SynthesisRetry,
}

impl AssetGenerator {
    pub fn new(speech: Arc<dyn SpeechProvider>, assets: Arc<dyn AssetStore>) -> Self {
        Self {
            speech,
            assets,
            voice: VoiceSettings::default(),
            retry: SynthesisRetry::default(),
        }
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_retry(mut self, retry: SynthesisRetry) -> Self {
        self.retry = retry;
        self
    }

    /// Build one task per segment whose source text is present, with text
    /// fitted to the segment's word budget.
    pub fn tasks_for(record: &WorkRecord) -> Vec<GenerationTask> {
        SegmentKey::all()
            .into_iter()
            .filter_map(|segment| {
                record
                    .text(&segment.text_field())
                    .map(|text| fit_task(GenerationTask::new(segment, text)))
            })
            .collect()
    }

    /// Generate every segment with a pool of `max_concurrent` permits
    /// private to this call.
    pub async fn generate_all(&self, record: &WorkRecord, max_concurrent: usize) -> GenerationReport {
        let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        self.generate_all_with_permits(record, permits).await
    }

    /// Generate every segment, drawing permits from a pool that may be
    /// shared with other records.
    pub async fn generate_all_with_permits(
        &self,
        record: &WorkRecord,
        permits: Arc<Semaphore>,
    ) -> GenerationReport {
        let start = Instant::now();
        let tasks = Self::tasks_for(record);

        info!(
            record_id = %record.id,
            segments = tasks.len(),
            available_permits = permits.available_permits(),
            "Generating narration"
        );

        let results = join_all(
            tasks
                .into_iter()
                .map(|task| self.run_task(&record.id, task, &permits)),
        )
        .await;

        let report = GenerationReport::new(
            record.id.clone(),
            results.into_iter().collect(),
            start.elapsed(),
        );

        info!(
            record_id = %record.id,
            success = %report.success_count,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Narration generation finished"
        );

        report
    }

    async fn run_task(
        &self,
        record_id: &RecordId,
        task: GenerationTask,
        permits: &Semaphore,
    ) -> (SegmentKey, AssetOutcome) {
        let segment = task.segment;
        let slug = segment.slug();
        let request = SpeechRequest {
            text: task.text,
            voice: self.voice.clone(),
        };

        let mut attempts = 0;
        let audio = loop {
            attempts += 1;

            let result = {
                let _permit = match permits.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            segment,
                            AssetOutcome::Failed {
                                reason: "permit pool closed".to_string(),
                                attempts,
                            },
                        )
                    }
                };
                self.speech.synthesize(&request).await
            };

            match result {
                Ok(audio) => {
                    record_synthesis_attempt(&slug, "success");
                    break audio;
                }
                Err(e) if e.is_rate_limited() && attempts <= self.retry.max_retries => {
                    record_synthesis_attempt(&slug, "rate_limited");
                    record_synthesis_retry(&slug);
                    let delay = self.retry.backoff(attempts);
                    warn!(
                        record_id = %record_id,
                        segment = %slug,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Synthesis rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let outcome = if e.is_rate_limited() { "exhausted" } else { "error" };
                    record_synthesis_attempt(&slug, outcome);
                    warn!(
                        record_id = %record_id,
                        segment = %slug,
                        attempt = attempts,
                        error = %e,
                        "Synthesis failed"
                    );
                    return (
                        segment,
                        AssetOutcome::Failed {
                            reason: e.to_string(),
                            attempts,
                        },
                    );
                }
            }
        };

        match self.assets.put_audio(record_id, segment, audio).await {
            Ok(url) => {
                debug!(record_id = %record_id, segment = %slug, url = %url, "Segment stored");
                (segment, AssetOutcome::Generated { url, attempts })
            }
            Err(e) => {
                warn!(record_id = %record_id, segment = %slug, error = %e, "Audio upload failed");
                (
                    segment,
                    AssetOutcome::Failed {
                        reason: format!("upload failed: {}", e),
                        attempts,
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let retry = SynthesisRetry::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(2), Duration::from_millis(1000));
        assert_eq!(retry.backoff(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_tasks_only_for_present_segments() {
        let record = WorkRecord::new("rec1")
            .with_field("Intro Text", "Welcome to the list.")
            .with_field("Item 2 Text", "   ")
            .with_field("Item 3 Text", "A solid pick for small kitchens.")
            .with_field("Outro Text", "Thanks.");

        let segments: Vec<_> = AssetGenerator::tasks_for(&record)
            .into_iter()
            .map(|t| t.segment)
            .collect();
        assert_eq!(
            segments,
            vec![SegmentKey::Intro, SegmentKey::Item(3), SegmentKey::Outro]
        );
    }

    #[test]
    fn test_report_ratio_and_field_updates() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            SegmentKey::Intro,
            AssetOutcome::Generated {
                url: "https://cdn/intro.mp3".to_string(),
                attempts: 1,
            },
        );
        outcomes.insert(
            SegmentKey::Item(1),
            AssetOutcome::Failed {
                reason: "quota".to_string(),
                attempts: 1,
            },
        );

        let report = GenerationReport::new(RecordId::from("rec1"), outcomes, Duration::ZERO);
        assert_eq!(report.success_count, "1/2");
        assert_eq!(report.failures(), 1);

        let updates = report.field_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates["Intro Audio"], "https://cdn/intro.mp3");
    }
}
