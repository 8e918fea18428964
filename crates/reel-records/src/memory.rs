//! In-memory record store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use reel_models::{RecordId, WorkRecord};

use crate::error::{RecordError, RecordResult};
use crate::store::RecordStore;

/// Record store held in process memory.
///
/// Keeps a log of every update so callers can inspect what a stage wrote.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<RecordId, WorkRecord>>,
    updates: Mutex<Vec<(RecordId, Map<String, Value>)>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = WorkRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn insert(&self, record: WorkRecord) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(record.id.clone(), record);
    }

    /// Current snapshot of a record.
    pub fn snapshot(&self, id: &RecordId) -> Option<WorkRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.get(id).cloned()
    }

    /// Every update applied so far, oldest first.
    pub fn updates(&self) -> Vec<(RecordId, Map<String, Value>)> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &RecordId) -> RecordResult<WorkRecord> {
        self.snapshot(id)
            .ok_or_else(|| RecordError::not_found(id.as_str()))
    }

    async fn update(&self, id: &RecordId, fields: Map<String, Value>) -> RecordResult<WorkRecord> {
        let updated = {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            let record = records
                .get_mut(id)
                .ok_or_else(|| RecordError::not_found(id.as_str()))?;
            record.apply(&fields);
            record.clone()
        };

        self.updates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id.clone(), fields));

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_merges_and_logs() {
        let store = InMemoryRecordStore::with_records([
            WorkRecord::new("rec1").with_field("Title", "Desk lamps")
        ]);
        let id = RecordId::from("rec1");

        let mut fields = Map::new();
        fields.insert("Status".to_string(), json!("Audio Ready"));
        let updated = store.update(&id, fields).await.unwrap();

        assert_eq!(updated.text("Title").as_deref(), Some("Desk lamps"));
        assert_eq!(updated.text("Status").as_deref(), Some("Audio Ready"));
        assert_eq!(store.updates().len(), 1);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = tokio_test::block_on(store.get(&RecordId::from("nope"))).unwrap_err();
        assert!(matches!(err, RecordError::NotFound(_)));

        let err = tokio_test::block_on(store.update(&RecordId::from("nope"), Map::new())).unwrap_err();
        assert!(matches!(err, RecordError::NotFound(_)));
        assert!(store.updates().is_empty());
    }
}
