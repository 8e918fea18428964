//! Asset generator behaviour: partial failure, permit ceiling and backoff.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use common::{narrated_record, ScriptedSpeech};
use reel_models::{RecordId, SegmentKey};
use reel_storage::{AssetStore, InMemoryAssetStore, StorageError, StorageResult};
use reel_worker::{AssetGenerator, AssetOutcome};

fn generator(speech: Arc<ScriptedSpeech>, assets: Arc<InMemoryAssetStore>) -> AssetGenerator {
    AssetGenerator::new(speech, assets)
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_segment_leaves_others_intact() {
    let speech = Arc::new(ScriptedSpeech::new(Duration::from_millis(50)));
    let assets = Arc::new(InMemoryAssetStore::new());
    let record = narrated_record("rec1", &[(SegmentKey::Item(3), "FAIL")]);

    let report = generator(speech.clone(), assets.clone())
        .generate_all(&record, 2)
        .await;

    assert_eq!(report.success_count, "6/7");
    assert_eq!(report.successes(), 6);
    assert_eq!(assets.len(), 6);

    match &report.outcomes[&SegmentKey::Item(3)] {
        AssetOutcome::Failed { reason, attempts } => {
            assert!(reason.contains("401"));
            assert_eq!(*attempts, 1, "non-retryable errors consume no retries");
        }
        other => panic!("expected failure, got {:?}", other),
    }

    for (segment, outcome) in &report.outcomes {
        if *segment != SegmentKey::Item(3) {
            let url = outcome.url().expect("segment should have an asset");
            assert!(assets.get(url).is_some());
        }
    }

    let updates = report.field_updates();
    assert_eq!(updates.len(), 6);
    assert!(!updates.contains_key("Item 3 Audio"));
    assert!(updates.contains_key("Item 4 Audio"));
}

#[tokio::test(start_paused = true)]
async fn test_permit_ceiling_bounds_wall_clock() {
    let task_time = Duration::from_millis(100);
    let speech = Arc::new(ScriptedSpeech::new(task_time));
    let assets = Arc::new(InMemoryAssetStore::new());
    let record = narrated_record("rec1", &[]);

    let report = generator(speech.clone(), assets).generate_all(&record, 2).await;

    assert_eq!(report.success_count, "7/7");
    assert_eq!(speech.max_in_flight(), 2);
    // ceil(7 / 2) rounds of one call each
    assert!(report.elapsed >= task_time * 4);
    assert!(report.elapsed < task_time * 5);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_segment_retries_with_backoff() {
    let speech = Arc::new(ScriptedSpeech::new(Duration::ZERO));
    let assets = Arc::new(InMemoryAssetStore::new());
    let record = narrated_record("rec1", &[(SegmentKey::Intro, "BUSY2")]);

    let report = generator(speech.clone(), assets).generate_all(&record, 7).await;

    assert_eq!(report.success_count, "7/7");
    assert!(matches!(
        report.outcomes[&SegmentKey::Intro],
        AssetOutcome::Generated { attempts: 3, .. }
    ));
    // 0.5s + 1s of backoff before the third attempt
    assert!(report.elapsed >= Duration::from_millis(1500));
    assert!(report.elapsed < Duration::from_millis(1600));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_exhaustion_gives_up_after_three_retries() {
    let speech = Arc::new(ScriptedSpeech::new(Duration::ZERO));
    let assets = Arc::new(InMemoryAssetStore::new());
    let record = narrated_record("rec1", &[(SegmentKey::Outro, "BUSYALL")]);

    let report = generator(speech.clone(), assets).generate_all(&record, 2).await;

    assert_eq!(report.success_count, "6/7");
    assert!(matches!(
        &report.outcomes[&SegmentKey::Outro],
        AssetOutcome::Failed { attempts: 4, reason } if reason.contains("Rate limited")
    ));
    assert_eq!(speech.total_calls(), 6 + 4);
    // 0.5s + 1s + 2s of backoff
    assert!(report.elapsed >= Duration::from_millis(3500));
}

#[tokio::test(start_paused = true)]
async fn test_shared_pool_caps_calls_across_records() {
    let speech = Arc::new(ScriptedSpeech::new(Duration::from_millis(100)));
    let assets = Arc::new(InMemoryAssetStore::new());
    let generator = generator(speech.clone(), assets.clone());
    let permits = Arc::new(Semaphore::new(3));

    let first = narrated_record("recA", &[]);
    let second = narrated_record("recB", &[]);

    let (a, b) = tokio::join!(
        generator.generate_all_with_permits(&first, permits.clone()),
        generator.generate_all_with_permits(&second, permits.clone()),
    );

    assert_eq!(a.success_count, "7/7");
    assert_eq!(b.success_count, "7/7");
    assert_eq!(speech.max_in_flight(), 3);
    assert_eq!(permits.available_permits(), 3);
    assert_eq!(assets.len(), 14);
}

/// Store that refuses outro uploads.
struct PickyStore(InMemoryAssetStore);

#[async_trait]
impl AssetStore for PickyStore {
    async fn put_audio(
        &self,
        record_id: &RecordId,
        segment: SegmentKey,
        audio: Vec<u8>,
    ) -> StorageResult<String> {
        if segment == SegmentKey::Outro {
            return Err(StorageError::upload_failed("bucket unavailable"));
        }
        self.0.put_audio(record_id, segment, audio).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_fails_only_that_segment() {
    let speech = Arc::new(ScriptedSpeech::new(Duration::ZERO));
    let generator = AssetGenerator::new(speech, Arc::new(PickyStore(InMemoryAssetStore::new())));
    let record = narrated_record("rec1", &[]);

    let report = generator.generate_all(&record, 2).await;

    assert_eq!(report.success_count, "6/7");
    assert!(matches!(
        &report.outcomes[&SegmentKey::Outro],
        AssetOutcome::Failed { reason, .. } if reason.starts_with("upload failed")
    ));
}
