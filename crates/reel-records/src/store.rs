//! The record store contract.

use async_trait::async_trait;
use serde_json::{Map, Value};

use reel_models::{RecordId, WorkRecord};

use crate::error::RecordResult;

/// Narrow access to the external record store.
///
/// Every written field is independent; no multi-field transaction is
/// assumed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by id.
    async fn get(&self, id: &RecordId) -> RecordResult<WorkRecord>;

    /// Merge `fields` into the record and return the updated record.
    async fn update(&self, id: &RecordId, fields: Map<String, Value>) -> RecordResult<WorkRecord>;
}
