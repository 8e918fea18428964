//! Render submission and completion polling.
//!
//! A job is submitted once. After `initial_delay` its status is checked at
//! most `max_polls` times, `poll_interval` apart, until the provider reports
//! `done` with a URL or `error`, or says it has no such job. Anything else
//! (an unknown state, a malformed body, a failed check) keeps the job in
//! progress and uses up one poll. The job is never re-submitted.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use reel_models::{RenderJob, RenderSpec, RenderState};
use reel_providers::RenderProvider;

use crate::metrics::record_render_poll;

/// Terminal outcome of a monitored render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RenderOutcome {
    Done { url: String },
    Error { reason: String },
    TimedOut { polls: u32 },
}

impl RenderOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RenderOutcome::Done { .. })
    }
}

/// Outcome plus the job as last observed.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub outcome: RenderOutcome,
    /// `None` when submission itself failed.
    pub job: Option<RenderJob>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RenderReport {
    pub fn polls(&self) -> u32 {
        self.job.as_ref().map_or(0, |job| job.polls)
    }
}

/// Submits renders and waits for them to finish.
pub struct RenderMonitor {
    provider: Arc<dyn RenderProvider>,
}

impl RenderMonitor {
    pub fn new(provider: Arc<dyn RenderProvider>) -> Self {
        Self { provider }
    }

    /// Submit `spec` and poll until the job reaches a terminal state.
    pub async fn submit_and_wait(
        &self,
        spec: &RenderSpec,
        poll_interval: Duration,
        initial_delay: Duration,
        max_polls: u32,
    ) -> RenderReport {
        let start = Instant::now();

        let job_id = match self.provider.submit(spec).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Render submission failed");
                return RenderReport {
                    outcome: RenderOutcome::Error {
                        reason: format!("submission failed: {}", e),
                    },
                    job: None,
                    elapsed: start.elapsed(),
                };
            }
        };

        info!(
            job_id = %job_id,
            initial_delay_secs = initial_delay.as_secs(),
            max_polls,
            "Render submitted"
        );

        let mut job = RenderJob::submitted(job_id);
        tokio::time::sleep(initial_delay).await;
        job.start_polling();

        while job.polls < max_polls {
            if job.polls > 0 {
                tokio::time::sleep(poll_interval).await;
            }
            job.polls += 1;
            self.poll_once(&mut job).await;

            if job.is_terminal() {
                break;
            }
        }
        job.time_out();

        let outcome = match job.state {
            RenderState::Done => RenderOutcome::Done {
                url: job.result_url.clone().unwrap_or_default(),
            },
            RenderState::Error => RenderOutcome::Error {
                reason: job
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "render failed".to_string()),
            },
            _ => RenderOutcome::TimedOut { polls: job.polls },
        };

        info!(
            job_id = %job.id,
            state = job.state.as_str(),
            polls = job.polls,
            "Render finished"
        );

        RenderReport {
            outcome,
            job: Some(job),
            elapsed: start.elapsed(),
        }
    }

    async fn poll_once(&self, job: &mut RenderJob) {
        match self.provider.status(&job.id).await {
            Err(e) if e.is_not_found() => {
                record_render_poll("not_found");
                warn!(job_id = %job.id, "Render job not found");
                job.fail(format!("render job {} not found", job.id));
            }
            Err(e) => {
                record_render_poll("check_failed");
                warn!(job_id = %job.id, poll = job.polls, error = %e, "Status check failed");
            }
            Ok(status) => {
                record_render_poll(&status.state);
                if status.is_error() {
                    job.fail(
                        status
                            .message
                            .unwrap_or_else(|| "provider reported an error".to_string()),
                    );
                } else if let (true, Some(url)) = (status.is_done(), status.url) {
                    job.complete(url);
                } else {
                    debug!(job_id = %job.id, poll = job.polls, state = %status.state, "Render in progress");
                }
            }
        }
    }
}
