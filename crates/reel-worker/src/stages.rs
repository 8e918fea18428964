//! Stage wiring: read a record, run an engine, write the results back.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::Instrument;

use reel_models::segment::MAX_ITEMS;
use reel_models::{fields, RecordId, RecordStatus, ScoredResult, WorkRecord};
use reel_providers::{
    RenderClient, RenderProvider, SearchClient, SearchProvider, SpeechClient, SpeechProvider,
    VoiceSettings,
};
use reel_records::{RecordClient, RecordStore};
use reel_storage::{AssetStore, R2Client};

use crate::asset_generator::{AssetGenerator, GenerationReport, SynthesisRetry};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::StageLogger;
use crate::metrics::record_stage_duration;
use crate::render_monitor::{RenderMonitor, RenderOutcome, RenderReport};
use crate::render_spec::build_render_spec;
use crate::variant_qualifier::{VariantCriteria, VariantQualifier, VariantReport};

/// A pipeline stage that can be run for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Qualify,
    Audio,
    Render,
    /// Every stage in order, stopping when one leaves nothing to build on.
    All,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Qualify => "qualify",
            Stage::Audio => "audio",
            Stage::Render => "render",
            Stage::All => "all",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qualify" => Ok(Stage::Qualify),
            "audio" => Ok(Stage::Audio),
            "render" => Ok(Stage::Render),
            "all" => Ok(Stage::All),
            _ => Err(WorkerError::UnknownStage(s.to_string())),
        }
    }
}

/// Runs stages against records in a record store.
///
/// The synthesis permit pool is shared by every record this runner
/// processes, so concurrent records stay under one provider ceiling.
pub struct StageRunner {
    config: WorkerConfig,
    store: Arc<dyn RecordStore>,
    qualifier: VariantQualifier,
    generator: AssetGenerator,
    monitor: RenderMonitor,
    permits: Arc<Semaphore>,
}

impl StageRunner {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn RecordStore>,
        search: Arc<dyn SearchProvider>,
        speech: Arc<dyn SpeechProvider>,
        assets: Arc<dyn AssetStore>,
        render: Arc<dyn RenderProvider>,
    ) -> Self {
        let qualifier = VariantQualifier::new(search).with_batch_pause(config.batch_pause);
        let generator = AssetGenerator::new(speech, assets).with_retry(SynthesisRetry {
            max_retries: config.synthesis_max_retries,
            base_backoff: config.synthesis_base_backoff,
        });
        let permits = Arc::new(Semaphore::new(config.max_concurrent_synthesis.max(1)));

        Self {
            config,
            store,
            qualifier,
            generator,
            monitor: RenderMonitor::new(render),
            permits,
        }
    }

    /// Build a runner with HTTP clients configured from the environment.
    pub fn from_env(config: WorkerConfig) -> WorkerResult<Self> {
        let runner = Self::new(
            config,
            Arc::new(RecordClient::from_env()?),
            Arc::new(SearchClient::from_env()?),
            Arc::new(SpeechClient::from_env()?),
            Arc::new(R2Client::from_env()?),
            Arc::new(RenderClient::from_env()?),
        );
        Ok(runner.with_voice(VoiceSettings::from_env()))
    }

    pub fn with_voice(mut self, voice: VoiceSettings) -> Self {
        self.generator = self.generator.with_voice(voice);
        self
    }

    /// Run `stage` for one record.
    pub async fn run(&self, stage: Stage, id: &RecordId) -> WorkerResult<()> {
        match stage {
            Stage::Qualify => self.qualify_record(id).await.map(|_| ()),
            Stage::Audio => self.generate_record_audio(id).await.map(|_| ()),
            Stage::Render => self.render_record(id).await.map(|_| ()),
            Stage::All => {
                let logger = StageLogger::new(id, Stage::All.as_str());
                if self.qualify_record(id).await?.best_variant.is_none() {
                    logger.log_warning("no qualifying variant, stopping");
                    return Ok(());
                }
                if self.generate_record_audio(id).await?.successes() == 0 {
                    logger.log_warning("no narration generated, stopping");
                    return Ok(());
                }
                self.render_record(id).await.map(|_| ())
            }
        }
    }

    /// Pick a search variant for the record and write back the ranked items.
    pub async fn qualify_record(&self, id: &RecordId) -> WorkerResult<VariantReport> {
        let logger = StageLogger::new(id, Stage::Qualify.as_str());
        let span = logger.create_span();

        async {
            let start = Instant::now();
            let record = self.store.get(id).await?;
            let candidates = variant_candidates(&record);
            if candidates.is_empty() {
                return Err(WorkerError::missing_input(id, "search variants or title"));
            }

            logger.log_start(&format!("{} candidate(s)", candidates.len()));

            let criteria = VariantCriteria {
                min_qualifying: self.config.min_qualifying,
                min_reviews_per_result: self.config.min_reviews_per_result,
                batch_size: self.config.batch_size,
            };
            let report = self.qualifier.find_best_variant(&candidates, &criteria).await;

            let mut updates = Map::new();
            updates.insert(fields::VARIANT_SUMMARY.to_string(), json!(report.summary()));

            match &report.best_variant {
                Some(best) => {
                    let top_n = self.config.top_n.min(MAX_ITEMS as usize);
                    let ranked = self
                        .qualifier
                        .rank_results(best, top_n, criteria.min_reviews_per_result)
                        .await;
                    if let Some(err) = &ranked.error {
                        logger.log_warning(&format!("ranking failed: {}", err));
                    }

                    updates.insert(fields::SEARCH_TERM.to_string(), json!(best));
                    updates.insert(fields::STATUS.to_string(), json!(RecordStatus::VariantFound));
                    item_fields(&ranked.results, &mut updates);

                    logger.log_completion(&format!(
                        "variant '{}' with {} ranked item(s)",
                        best,
                        ranked.results.len()
                    ));
                }
                None => {
                    updates.insert(fields::STATUS.to_string(), json!(RecordStatus::NoVariant));
                    logger.log_warning("no candidate qualified");
                }
            }

            self.store.update(id, updates).await?;
            record_stage_duration(Stage::Qualify.as_str(), start.elapsed().as_secs_f64());
            Ok::<_, WorkerError>(report)
        }
        .instrument(span)
        .await
    }

    /// Synthesize narration for every segment and write back asset URLs.
    pub async fn generate_record_audio(&self, id: &RecordId) -> WorkerResult<GenerationReport> {
        let logger = StageLogger::new(id, Stage::Audio.as_str());
        let span = logger.create_span();

        async {
            let start = Instant::now();
            let record = self.store.get(id).await?;
            if AssetGenerator::tasks_for(&record).is_empty() {
                return Err(WorkerError::missing_input(id, "segment text"));
            }

            logger.log_start("generating narration");
            let report = self
                .generator
                .generate_all_with_permits(&record, Arc::clone(&self.permits))
                .await;

            let status = if report.successes() == report.total() {
                RecordStatus::AudioReady
            } else if report.successes() == 0 {
                RecordStatus::AudioFailed
            } else {
                RecordStatus::AudioPartial
            };

            let mut updates = report.field_updates();
            updates.insert(fields::AUDIO_SUCCESS.to_string(), json!(report.success_count));
            updates.insert(fields::STATUS.to_string(), json!(status));

            self.store.update(id, updates).await?;

            if report.failures() > 0 {
                logger.log_warning(&format!("{} segment(s) failed", report.failures()));
            }
            logger.log_completion(&format!("{} segments generated", report.success_count));
            record_stage_duration(Stage::Audio.as_str(), start.elapsed().as_secs_f64());
            Ok::<_, WorkerError>(report)
        }
        .instrument(span)
        .await
    }

    /// Render the record's video and write back the URL or failure reason.
    pub async fn render_record(&self, id: &RecordId) -> WorkerResult<RenderReport> {
        let logger = StageLogger::new(id, Stage::Render.as_str());
        let span = logger.create_span();

        async {
            let start = Instant::now();
            let record = self.store.get(id).await?;
            let spec = build_render_spec(&record)?;

            logger.log_start(&format!("submitting {} scene(s)", spec.scenes.len()));
            let report = self
                .monitor
                .submit_and_wait(
                    &spec,
                    self.config.render_poll_interval,
                    self.config.render_initial_delay,
                    self.config.render_max_polls,
                )
                .await;

            let mut updates = Map::new();
            if let Some(job) = &report.job {
                updates.insert(fields::RENDER_JOB_ID.to_string(), json!(job.id));
            }

            match &report.outcome {
                RenderOutcome::Done { url } => {
                    updates.insert(fields::VIDEO_URL.to_string(), json!(url));
                    updates.insert(fields::STATUS.to_string(), json!(RecordStatus::VideoReady));
                    updates.insert(fields::RENDERED_AT.to_string(), json!(Utc::now().to_rfc3339()));
                    logger.log_completion(&format!("video ready at {}", url));
                }
                RenderOutcome::Error { reason } => {
                    updates.insert(fields::RENDER_ERROR.to_string(), json!(reason));
                    updates.insert(fields::STATUS.to_string(), json!(RecordStatus::RenderFailed));
                    logger.log_error(reason);
                }
                RenderOutcome::TimedOut { polls } => {
                    updates.insert(
                        fields::RENDER_ERROR.to_string(),
                        json!(format!("no terminal state after {} polls", polls)),
                    );
                    updates.insert(fields::STATUS.to_string(), json!(RecordStatus::RenderTimedOut));
                    logger.log_error(&format!("timed out after {} polls", polls));
                }
            }

            self.store.update(id, updates).await?;
            record_stage_duration(Stage::Render.as_str(), start.elapsed().as_secs_f64());
            Ok::<_, WorkerError>(report)
        }
        .instrument(span)
        .await
    }
}

/// Search strings to try: the current search term, then listed variants
/// (newline or `|` separated), falling back to the title.
fn variant_candidates(record: &WorkRecord) -> Vec<String> {
    let mut candidates: Vec<String> = record.text(fields::SEARCH_TERM).into_iter().collect();

    if let Some(variants) = record.text(fields::SEARCH_VARIANTS) {
        candidates.extend(
            variants
                .split(|c| c == '\n' || c == '|')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        );
    }

    if candidates.is_empty() {
        candidates.extend(record.title());
    }
    candidates
}

/// Write one `Item N` group per ranked result. Slots without a result are
/// cleared so an earlier, longer ranking does not leak into the render.
fn item_fields(results: &[ScoredResult], updates: &mut Map<String, Value>) {
    for n in 1..=MAX_ITEMS {
        let result = results.get(n as usize - 1);
        updates.insert(
            fields::item_title(n),
            result.map_or(Value::Null, |r| json!(r.title)),
        );
        updates.insert(
            fields::item_rating(n),
            result.map_or(Value::Null, |r| json!(r.rating)),
        );
        updates.insert(
            fields::item_reviews(n),
            result.map_or(Value::Null, |r| json!(r.reviews)),
        );
        updates.insert(
            fields::item_image(n),
            result
                .and_then(|r| r.image.as_ref())
                .map_or(Value::Null, |image| json!(image)),
        );
        updates.insert(
            fields::item_product_id(n),
            result
                .and_then(|r| r.product_id.as_ref())
                .map_or(Value::Null, |id| json!(id)),
        );
    }
}
