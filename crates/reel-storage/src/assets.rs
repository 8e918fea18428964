//! Asset store contract and key layout.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use reel_models::{RecordId, SegmentKey};

use crate::error::{StorageError, StorageResult};

/// Destination for synthesized media.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store segment audio and return the URL the renderer can fetch.
    async fn put_audio(
        &self,
        record_id: &RecordId,
        segment: SegmentKey,
        audio: Vec<u8>,
    ) -> StorageResult<String>;
}

/// Object key for a segment's audio.
///
/// A random suffix keeps regenerated audio from colliding with cached
/// copies of an earlier take.
pub fn audio_key(record_id: &RecordId, segment: SegmentKey) -> StorageResult<String> {
    let id = record_id.as_str();
    if id.is_empty() || id.contains('/') || id.contains("..") {
        return Err(StorageError::InvalidKey(id.to_string()));
    }
    Ok(format!(
        "audio/{}/{}-{}.mp3",
        id,
        segment.slug(),
        &uuid::Uuid::new_v4().simple().to_string()[..8]
    ))
}

/// Asset store held in process memory; URLs use a `memory://` scheme.
#[derive(Debug, Default)]
pub struct InMemoryAssetStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let key = url.strip_prefix("memory://")?;
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn put_audio(
        &self,
        record_id: &RecordId,
        segment: SegmentKey,
        audio: Vec<u8>,
    ) -> StorageResult<String> {
        let key = audio_key(record_id, segment)?;
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), audio);
        Ok(format!("memory://{}", key))
    }
}
