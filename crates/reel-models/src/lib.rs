//! Shared data models for the ReelForge pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Work records and their field maps
//! - Search hits, scored results and variant candidates
//! - Narration segments and generation tasks
//! - Render specifications and render job state
//!
//! It also hosts the scoring and parsing helpers shared by the stages.

pub mod record;
pub mod render;
pub mod scoring;
pub mod search;
pub mod segment;

// Re-export common types
pub use record::{fields, RecordId, RecordStatus, WorkRecord};
pub use render::{RenderElement, RenderJob, RenderScene, RenderSpec, RenderState};
pub use scoring::{composite_score, normalize_rating, normalize_review_count};
pub use search::{sort_by_score, Candidate, ScoredResult, SearchHit};
pub use segment::{GenerationTask, SegmentKey, WORDS_PER_SECOND};
