//! Stage wiring end to end against in-memory stores.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{narrated_record, ScriptedRender, ScriptedSearch, ScriptedSpeech, Step};
use reel_models::{RecordId, SegmentKey, WorkRecord};
use reel_records::InMemoryRecordStore;
use reel_storage::InMemoryAssetStore;
use reel_worker::{Stage, StageRunner, WorkerConfig, WorkerError};

struct Harness {
    store: Arc<InMemoryRecordStore>,
    search: Arc<ScriptedSearch>,
    render: Arc<ScriptedRender>,
    runner: StageRunner,
}

fn harness(record: WorkRecord, search: ScriptedSearch, render: ScriptedRender) -> Harness {
    let store = Arc::new(InMemoryRecordStore::with_records([record]));
    let search = Arc::new(search);
    let render = Arc::new(render);
    let config = WorkerConfig {
        batch_size: 1,
        render_max_polls: 4,
        ..WorkerConfig::default()
    };

    let runner = StageRunner::new(
        config,
        store.clone(),
        search.clone(),
        Arc::new(ScriptedSpeech::new(Duration::from_millis(20))),
        Arc::new(InMemoryAssetStore::new()),
        render.clone(),
    );

    Harness {
        store,
        search,
        render,
        runner,
    }
}

fn text(store: &InMemoryRecordStore, id: &RecordId, field: &str) -> Option<String> {
    store.snapshot(id).and_then(|r| r.text(field))
}

#[tokio::test(start_paused = true)]
async fn test_full_pipeline_writes_every_stage() {
    let record = narrated_record("rec1", &[])
        .with_field("Search Term", "kettle")
        .with_field("Search Variants", "travel kettle\ncollapsible kettle");
    let h = harness(
        record,
        ScriptedSearch::new()
            .with_hits("kettle", 1, 10)
            .with_hits("travel kettle", 6, 10),
        ScriptedRender::new(vec![Step::State("rendering"), Step::Done("https://cdn/rec1.mp4")]),
    );
    let id = RecordId::from("rec1");

    h.runner.run(Stage::All, &id).await.unwrap();

    assert_eq!(text(&h.store, &id, "Search Term").as_deref(), Some("travel kettle"));
    assert!(text(&h.store, &id, "Item 5 Title").is_some());
    assert_eq!(text(&h.store, &id, "Audio Success").as_deref(), Some("7/7"));
    assert!(text(&h.store, &id, &SegmentKey::Item(2).asset_field()).is_some());
    assert_eq!(text(&h.store, &id, "Render Job ID").as_deref(), Some("prj_test"));
    assert_eq!(text(&h.store, &id, "Video URL").as_deref(), Some("https://cdn/rec1.mp4"));
    assert_eq!(text(&h.store, &id, "Status").as_deref(), Some("Video Ready"));
    assert!(text(&h.store, &id, "Rendered At").is_some());

    // "collapsible kettle" sat in a later batch and was never searched
    assert!(!h.search.queries().contains(&"collapsible kettle".to_string()));
    assert_eq!(h.store.updates().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_all_stops_when_no_variant_qualifies() {
    let record = narrated_record("rec1", &[]).with_field("Search Term", "kettle");
    let h = harness(
        record,
        ScriptedSearch::new().with_hits("kettle", 1, 10),
        ScriptedRender::new(vec![Step::Done("https://cdn/x.mp4")]),
    );
    let id = RecordId::from("rec1");

    h.runner.run(Stage::All, &id).await.unwrap();

    assert_eq!(text(&h.store, &id, "Status").as_deref(), Some("No Variant"));
    assert_eq!(
        text(&h.store, &id, "Variant Summary").as_deref(),
        Some("kettle: 1/10")
    );
    assert_eq!(h.render.submissions(), 0);
    assert_eq!(h.store.updates().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_partial_audio_status() {
    let record = narrated_record("rec1", &[(SegmentKey::Intro, "FAIL")]);
    let h = harness(record, ScriptedSearch::new(), ScriptedRender::new(vec![]));
    let id = RecordId::from("rec1");

    let report = h.runner.generate_record_audio(&id).await.unwrap();

    assert_eq!(report.success_count, "6/7");
    assert_eq!(text(&h.store, &id, "Status").as_deref(), Some("Audio Partial"));
    assert_eq!(text(&h.store, &id, "Audio Success").as_deref(), Some("6/7"));
    assert!(text(&h.store, &id, "Intro Audio").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_render_timeout_is_recorded() {
    let record = WorkRecord::new("rec1")
        .with_field("Title", "Top 5 kettles")
        .with_field("Intro Audio", "memory://audio/rec1/intro.mp3");
    let h = harness(
        record,
        ScriptedSearch::new(),
        ScriptedRender::new(vec![Step::State("queued")]),
    );
    let id = RecordId::from("rec1");

    let report = h.runner.render_record(&id).await.unwrap();

    assert_eq!(report.polls(), 4);
    assert_eq!(text(&h.store, &id, "Status").as_deref(), Some("Render Timed Out"));
    assert_eq!(
        text(&h.store, &id, "Render Error").as_deref(),
        Some("no terminal state after 4 polls")
    );
}

#[tokio::test]
async fn test_missing_inputs_and_records() {
    let h = harness(
        WorkRecord::new("rec1"),
        ScriptedSearch::new(),
        ScriptedRender::new(vec![]),
    );

    let err = h
        .runner
        .qualify_record(&RecordId::from("rec1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::MissingInput { .. }));

    let err = h
        .runner
        .render_record(&RecordId::from("rec1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::MissingInput { .. }));

    let err = h
        .runner
        .run(Stage::Audio, &RecordId::from("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Records(_)));
    assert!(h.store.updates().is_empty());
}
