//! Narration segments and generation tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Average narration pace used to size segment text.
pub const WORDS_PER_SECOND: f64 = 2.5;

/// Number of item segments a record can carry.
pub const MAX_ITEMS: u8 = 5;

/// One narrated segment of a record: an intro, up to five items, an outro.
///
/// Ordering follows playback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SegmentKey {
    Intro,
    Item(u8),
    Outro,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown segment key: {0}")]
pub struct ParseSegmentError(String);

impl SegmentKey {
    /// All segments in playback order.
    pub fn all() -> Vec<SegmentKey> {
        let mut keys = Vec::with_capacity(MAX_ITEMS as usize + 2);
        keys.push(SegmentKey::Intro);
        keys.extend((1..=MAX_ITEMS).map(SegmentKey::Item));
        keys.push(SegmentKey::Outro);
        keys
    }

    /// Record field holding the segment's source text.
    pub fn text_field(&self) -> String {
        match self {
            SegmentKey::Intro => "Intro Text".to_string(),
            SegmentKey::Item(n) => format!("Item {} Text", n),
            SegmentKey::Outro => "Outro Text".to_string(),
        }
    }

    /// Record field receiving the segment's synthesized asset URL.
    pub fn asset_field(&self) -> String {
        match self {
            SegmentKey::Intro => "Intro Audio".to_string(),
            SegmentKey::Item(n) => format!("Item {} Audio", n),
            SegmentKey::Outro => "Outro Audio".to_string(),
        }
    }

    /// Intended spoken length of the segment.
    pub fn target_duration(&self) -> Duration {
        match self {
            SegmentKey::Intro => Duration::from_secs(6),
            SegmentKey::Item(_) => Duration::from_secs(10),
            SegmentKey::Outro => Duration::from_secs(5),
        }
    }

    /// Short closing sentence appended to text that runs markedly short.
    pub fn filler(&self) -> &'static str {
        match self {
            SegmentKey::Intro => "Let's take a closer look.",
            SegmentKey::Item(_) => "It is well worth a look.",
            SegmentKey::Outro => "Thanks for watching, see you next time.",
        }
    }

    /// Stable key used in storage paths and logs.
    pub fn slug(&self) -> String {
        match self {
            SegmentKey::Intro => "intro".to_string(),
            SegmentKey::Item(n) => format!("item_{}", n),
            SegmentKey::Outro => "outro".to_string(),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug())
    }
}

impl FromStr for SegmentKey {
    type Err = ParseSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro" => Ok(SegmentKey::Intro),
            "outro" => Ok(SegmentKey::Outro),
            other => other
                .strip_prefix("item_")
                .and_then(|n| n.parse::<u8>().ok())
                .filter(|n| (1..=MAX_ITEMS).contains(n))
                .map(SegmentKey::Item)
                .ok_or_else(|| ParseSegmentError(s.to_string())),
        }
    }
}

impl From<SegmentKey> for String {
    fn from(key: SegmentKey) -> Self {
        key.slug()
    }
}

impl TryFrom<String> for SegmentKey {
    type Error = ParseSegmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A pending synthesis unit for one segment.
///
/// Each task is attempted independently of its siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTask {
    pub segment: SegmentKey,
    pub text: String,
    pub target_duration: Duration,
}

impl GenerationTask {
    pub fn new(segment: SegmentKey, text: impl Into<String>) -> Self {
        Self {
            segment,
            text: text.into(),
            target_duration: segment.target_duration(),
        }
    }

    /// Word budget for the target duration.
    pub fn target_words(&self) -> usize {
        (self.target_duration.as_secs_f64() * WORDS_PER_SECOND).round() as usize
    }
}
