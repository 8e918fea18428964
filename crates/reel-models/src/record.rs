//! Work record models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a work record in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Field names used by the pipeline stages.
pub mod fields {
    pub const TITLE: &str = "Title";
    pub const STATUS: &str = "Status";
    /// Alternative search strings, one per line or `|` separated.
    pub const SEARCH_VARIANTS: &str = "Search Variants";
    pub const SEARCH_TERM: &str = "Search Term";
    pub const VARIANT_SUMMARY: &str = "Variant Summary";
    pub const AUDIO_SUCCESS: &str = "Audio Success";
    pub const RENDER_JOB_ID: &str = "Render Job ID";
    pub const VIDEO_URL: &str = "Video URL";
    pub const RENDER_ERROR: &str = "Render Error";
    pub const RENDERED_AT: &str = "Rendered At";

    pub fn item_title(n: u8) -> String {
        format!("Item {} Title", n)
    }

    pub fn item_image(n: u8) -> String {
        format!("Item {} Image", n)
    }

    pub fn item_rating(n: u8) -> String {
        format!("Item {} Rating", n)
    }

    pub fn item_reviews(n: u8) -> String {
        format!("Item {} Reviews", n)
    }

    pub fn item_product_id(n: u8) -> String {
        format!("Item {} Product ID", n)
    }
}

/// Status written to a record as it moves through the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum RecordStatus {
    #[serde(rename = "Variant Found")]
    VariantFound,
    #[serde(rename = "No Variant")]
    NoVariant,
    #[serde(rename = "Audio Ready")]
    AudioReady,
    #[serde(rename = "Audio Partial")]
    AudioPartial,
    #[serde(rename = "Audio Failed")]
    AudioFailed,
    #[serde(rename = "Video Ready")]
    VideoReady,
    #[serde(rename = "Render Failed")]
    RenderFailed,
    #[serde(rename = "Render Timed Out")]
    RenderTimedOut,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::VariantFound => "Variant Found",
            RecordStatus::NoVariant => "No Variant",
            RecordStatus::AudioReady => "Audio Ready",
            RecordStatus::AudioPartial => "Audio Partial",
            RecordStatus::AudioFailed => "Audio Failed",
            RecordStatus::VideoReady => "Video Ready",
            RecordStatus::RenderFailed => "Render Failed",
            RecordStatus::RenderTimedOut => "Render Timed Out",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A work record: identifier plus an open field map.
///
/// The record store owns records. Stages read the fields they need and
/// write back only the fields they produce.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkRecord {
    pub id: RecordId,

    #[serde(default)]
    pub fields: Map<String, Value>,

    #[serde(
        rename = "createdTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_time: Option<DateTime<Utc>>,
}

impl WorkRecord {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
            created_time: None,
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Non-empty, trimmed text value of a field.
    ///
    /// Numbers are rendered as text; any other JSON type yields `None`.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.text(fields::TITLE)
    }

    /// Merge a field update into this record.
    pub fn apply(&mut self, update: &Map<String, Value>) {
        for (k, v) in update {
            self.fields.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_trims_and_skips_empty() {
        let record = WorkRecord::new("rec1")
            .with_field("A", "  hello ")
            .with_field("B", "   ")
            .with_field("C", 42)
            .with_field("D", json!(["x"]));

        assert_eq!(record.text("A").as_deref(), Some("hello"));
        assert_eq!(record.text("B"), None);
        assert_eq!(record.text("C").as_deref(), Some("42"));
        assert_eq!(record.text("D"), None);
        assert_eq!(record.text("missing"), None);
    }

    #[test]
    fn test_record_deserializes_store_shape() {
        let record: WorkRecord = serde_json::from_value(json!({
            "id": "recABC",
            "createdTime": "2024-05-01T10:00:00.000Z",
            "fields": { "Title": "Best blenders" }
        }))
        .unwrap();

        assert_eq!(record.id.as_str(), "recABC");
        assert_eq!(record.title().as_deref(), Some("Best blenders"));
        assert!(record.created_time.is_some());
    }

    #[test]
    fn test_status_serializes_display_name() {
        let value = serde_json::to_value(RecordStatus::AudioPartial).unwrap();
        assert_eq!(value, json!("Audio Partial"));
        assert_eq!(RecordStatus::RenderTimedOut.to_string(), "Render Timed Out");
    }

    #[test]
    fn test_apply_merges_fields() {
        let mut record = WorkRecord::new("rec1").with_field(fields::TITLE, "x");
        let mut update = Map::new();
        update.insert(fields::STATUS.to_string(), json!("Video Ready"));
        record.apply(&update);

        assert_eq!(record.text(fields::TITLE).as_deref(), Some("x"));
        assert_eq!(record.text(fields::STATUS).as_deref(), Some("Video Ready"));
    }
}
