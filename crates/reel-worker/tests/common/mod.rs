//! In-process providers for behaviour tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use reel_models::{RenderSpec, SearchHit, SegmentKey, WorkRecord};
use reel_providers::{
    ProviderError, ProviderResult, RenderProvider, RenderStatus, SearchProvider, SpeechProvider,
    SpeechRequest,
};

// =============================================================================
// Search
// =============================================================================

/// Search provider answering from a fixed table and logging every query.
#[derive(Default)]
pub struct ScriptedSearch {
    results: HashMap<String, Vec<SearchHit>>,
    failing: HashSet<String>,
    delay: Duration,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// `qualifying` hits with 500 reviews, the rest with 5.
    pub fn with_hits(mut self, query: &str, qualifying: usize, total: usize) -> Self {
        self.results.insert(query.to_string(), hits(qualifying, total));
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, page: u32) -> ProviderResult<Vec<SearchHit>> {
        assert_eq!(page, 1, "only the first page is ever requested");
        self.queries.lock().unwrap().push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(query) {
            return Err(ProviderError::invalid_response("search response: expected value"));
        }
        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}

pub fn hits(qualifying: usize, total: usize) -> Vec<SearchHit> {
    (0..total)
        .map(|i| SearchHit {
            title: format!("Product {}", i + 1),
            rating: Some(json!(format!("{}.{} out of 5", 3 + i % 2, i % 10))),
            reviews_count: Some(if i < qualifying { json!("1,500") } else { json!(5) }),
            image: Some(format!("https://img.example/{}.jpg", i + 1)),
            id: Some(format!("B0{:04}", i + 1)),
            ..SearchHit::default()
        })
        .collect()
}

// =============================================================================
// Speech
// =============================================================================

/// Speech provider driven by markers in the request text.
///
/// - `FAIL`: non-retryable provider error on every call
/// - `BUSY<n>`: rate limited on the first `n` calls, then succeeds
/// - `BUSYALL`: always rate limited
///
/// Each call holds for `delay` and the peak number of overlapping calls is
/// tracked.
#[derive(Default)]
pub struct ScriptedSpeech {
    delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    total_calls: AtomicUsize,
}

impl ScriptedSpeech {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

fn busy_calls(text: &str) -> Option<u32> {
    text.split_whitespace().find_map(|word| {
        let rest = word.strip_prefix("BUSY")?;
        if rest.starts_with("ALL") {
            Some(u32::MAX)
        } else {
            rest.trim_end_matches(|c: char| !c.is_ascii_digit()).parse().ok()
        }
    })
}

#[async_trait]
impl SpeechProvider for ScriptedSpeech {
    async fn synthesize(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(request.text.clone()).or_insert(0);
            *count += 1;
            *count
        };
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request.text.contains("FAIL") {
            return Err(ProviderError::from_status(401, "quota_exceeded"));
        }
        if let Some(busy) = busy_calls(&request.text) {
            if call <= busy {
                return Err(ProviderError::from_status(429, "too_many_concurrent_requests"));
            }
        }
        Ok(request.text.as_bytes().to_vec())
    }
}

/// A record with narration text for all seven segments.
///
/// `markers` appends a marker word to the given segments' text.
pub fn narrated_record(id: &str, markers: &[(SegmentKey, &str)]) -> WorkRecord {
    SegmentKey::all()
        .into_iter()
        .fold(WorkRecord::new(id).with_field("Title", "Top 5 travel kettles"), |record, segment| {
            let marker = markers
                .iter()
                .find(|(key, _)| *key == segment)
                .map(|(_, m)| *m)
                .unwrap_or("");
            let text = format!(
                "{} narration for {} covering what matters most to buyers today {}",
                id,
                segment.slug(),
                marker
            );
            record.with_field(segment.text_field(), text)
        })
}

// =============================================================================
// Render
// =============================================================================

/// One scripted status-check response.
#[derive(Debug, Clone)]
pub enum Step {
    State(&'static str),
    Done(&'static str),
    Failed(&'static str),
    NotFound,
    CheckFailed,
}

/// Render provider replaying a script of status responses; the last step
/// repeats forever.
pub struct ScriptedRender {
    steps: Vec<Step>,
    reject_submission: bool,
    submissions: AtomicU32,
    status_calls: AtomicU32,
}

impl ScriptedRender {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            reject_submission: false,
            submissions: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject_submission: true,
            ..Self::new(vec![Step::State("queued")])
        }
    }

    pub fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderProvider for ScriptedRender {
    async fn submit(&self, spec: &RenderSpec) -> ProviderResult<String> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        if self.reject_submission {
            return Err(ProviderError::from_status(400, "invalid scene"));
        }
        assert!(!spec.scenes.is_empty(), "renders always carry scenes");
        Ok("prj_test".to_string())
    }

    async fn status(&self, job_id: &str) -> ProviderResult<RenderStatus> {
        assert_eq!(job_id, "prj_test");
        let call = self.status_calls.fetch_add(1, Ordering::SeqCst) as usize;
        let step = self
            .steps
            .get(call)
            .or_else(|| self.steps.last())
            .cloned()
            .unwrap_or(Step::State("queued"));

        match step {
            Step::State(state) => Ok(RenderStatus {
                state: state.to_string(),
                ..RenderStatus::default()
            }),
            Step::Done(url) => Ok(RenderStatus {
                state: "done".to_string(),
                url: Some(url.to_string()),
                message: None,
            }),
            Step::Failed(message) => Ok(RenderStatus {
                state: "error".to_string(),
                url: None,
                message: Some(message.to_string()),
            }),
            Step::NotFound => Err(ProviderError::from_status(404, "project not found")),
            Step::CheckFailed => Err(ProviderError::from_status(502, "bad gateway")),
        }
    }
}
