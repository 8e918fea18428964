//! Search variant qualification.
//!
//! Candidates are checked in consecutive batches. Every candidate in a batch
//! is searched concurrently; once the whole batch has settled it is scanned in
//! input order and the first candidate with enough qualifying results wins.
//! Later batches are never scheduled after a win. In-flight siblings are not
//! cancelled, they simply finish with their batch.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use reel_models::{sort_by_score, Candidate, ScoredResult, SearchHit};
use reel_providers::SearchProvider;

use crate::metrics::record_variant_check;

/// Only the first page of results is ever consulted.
const SEARCH_PAGE: u32 = 1;

/// Sample results kept per candidate for reporting.
const SAMPLE_SIZE: usize = 3;

/// Thresholds for accepting a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantCriteria {
    pub min_qualifying: usize,
    pub min_reviews_per_result: u64,
    pub batch_size: usize,
}

impl Default for VariantCriteria {
    fn default() -> Self {
        Self {
            min_qualifying: 3,
            min_reviews_per_result: 50,
            batch_size: 3,
        }
    }
}

/// Outcome of a variant search.
#[derive(Debug, Clone, Serialize)]
pub struct VariantReport {
    pub best_variant: Option<String>,
    /// True when a batch produced a winner and remaining batches were skipped.
    pub early_exit: bool,
    /// Every candidate that was searched, highest `qualifying_count` first.
    pub ranked_candidates: Vec<Candidate>,
    pub batches_run: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl VariantReport {
    /// One line per checked candidate, e.g. `air fryer: 4/20`.
    pub fn summary(&self) -> String {
        self.ranked_candidates
            .iter()
            .map(|c| match &c.error {
                Some(err) => format!("{}: error ({})", c.query, err),
                None => format!("{}: {}/{}", c.query, c.qualifying_count, c.total_count),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Top results for a confirmed variant.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResults {
    pub variant: String,
    pub results: Vec<ScoredResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Finds a search variant with enough well-reviewed results.
pub struct VariantQualifier {
    search: Arc<dyn SearchProvider>,
    batch_pause: Duration,
}

impl VariantQualifier {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self {
            search,
            batch_pause: Duration::from_secs(1),
        }
    }

    /// Pause inserted between consecutive batches.
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// Check candidates batch by batch and return the first that qualifies.
    ///
    /// Blank and repeated (case-insensitive) candidates are skipped. A
    /// candidate whose search fails counts as zero qualifying results and
    /// never aborts its batch.
    pub async fn find_best_variant(
        &self,
        candidates: &[String],
        criteria: &VariantCriteria,
    ) -> VariantReport {
        let start = Instant::now();
        let queries = dedupe_candidates(candidates);
        let batch_size = criteria.batch_size.max(1);

        let mut checked: Vec<Candidate> = Vec::with_capacity(queries.len());
        let mut batches_run = 0;

        for batch in queries.chunks(batch_size) {
            if batches_run > 0 && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
            batches_run += 1;

            debug!(batch = batches_run, size = batch.len(), "Checking candidate batch");

            let results =
                join_all(batch.iter().map(|query| self.check_candidate(query, criteria))).await;

            // join_all preserves input order, so the scan tie-breaks by batch position.
            let winner = results
                .iter()
                .find(|c| c.qualifies(criteria.min_qualifying))
                .map(|c| c.query.clone());
            checked.extend(results);

            if let Some(best) = winner {
                info!(
                    variant = %best,
                    batches = batches_run,
                    "Variant qualified, skipping remaining batches"
                );
                return Self::report(Some(best), true, checked, batches_run, start);
            }
        }

        let best = checked
            .iter()
            .filter(|c| c.qualifies(criteria.min_qualifying))
            .max_by_key(|c| c.qualifying_count)
            .map(|c| c.query.clone());

        if best.is_none() {
            warn!(
                candidates = checked.len(),
                min_qualifying = criteria.min_qualifying,
                "No candidate qualified"
            );
        }

        Self::report(best, false, checked, batches_run, start)
    }

    /// Re-query a confirmed variant and return its top `top_n` results by
    /// composite score.
    ///
    /// Only hits with at least `min_reviews_per_result` reviews are ranked,
    /// the same filter used when the variant was qualified.
    pub async fn rank_results(
        &self,
        variant: &str,
        top_n: usize,
        min_reviews_per_result: u64,
    ) -> RankedResults {
        match self.search.search(variant, SEARCH_PAGE).await {
            Ok(hits) => {
                let mut results = qualifying_results(&hits, min_reviews_per_result);
                sort_by_score(&mut results);
                results.truncate(top_n);

                debug!(variant = %variant, ranked = results.len(), "Ranked results");
                RankedResults {
                    variant: variant.to_string(),
                    results,
                    error: None,
                }
            }
            Err(e) => {
                warn!(variant = %variant, error = %e, "Ranking search failed");
                RankedResults {
                    variant: variant.to_string(),
                    results: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn check_candidate(&self, query: &str, criteria: &VariantCriteria) -> Candidate {
        let candidate = Candidate::pending(query);

        let hits = match self.search.search(query, SEARCH_PAGE).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(candidate = %query, error = %e, "Candidate search failed");
                record_variant_check("error");
                return candidate.failed(e.to_string());
            }
        };

        let mut qualifying = qualifying_results(&hits, criteria.min_reviews_per_result);
        let qualifying_count = qualifying.len();
        sort_by_score(&mut qualifying);
        qualifying.truncate(SAMPLE_SIZE);

        let outcome = if qualifying_count >= criteria.min_qualifying {
            "qualified"
        } else {
            "insufficient"
        };
        record_variant_check(outcome);

        debug!(
            candidate = %query,
            qualifying = qualifying_count,
            total = hits.len(),
            "Candidate checked"
        );

        Candidate {
            attempted: true,
            qualifying_count,
            total_count: hits.len(),
            sample_results: qualifying,
            ..candidate
        }
    }

    fn report(
        best_variant: Option<String>,
        early_exit: bool,
        mut checked: Vec<Candidate>,
        batches_run: usize,
        start: Instant,
    ) -> VariantReport {
        // Stable sort keeps input order among equal counts.
        checked.sort_by(|a, b| b.qualifying_count.cmp(&a.qualifying_count));
        VariantReport {
            best_variant,
            early_exit,
            ranked_candidates: checked,
            batches_run,
            elapsed: start.elapsed(),
        }
    }
}

fn qualifying_results(hits: &[SearchHit], min_reviews: u64) -> Vec<ScoredResult> {
    hits.iter()
        .filter(|hit| hit.review_count() >= min_reviews)
        .map(ScoredResult::from_hit)
        .collect()
}

fn dedupe_candidates(candidates: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(c.to_lowercase()))
        .map(str::to_string)
        .collect()
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
