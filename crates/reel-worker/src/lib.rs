//! Pipeline stages for turning a work record into a finished video.
//!
//! This crate provides:
//! - `VariantQualifier`: picks a search variant with enough qualifying results
//! - `AssetGenerator`: synthesizes narration per segment under a shared
//!   concurrency ceiling
//! - `RenderMonitor`: submits a render and polls it to a terminal state
//! - Stage wiring that reads and writes work records
//! - Configuration, structured stage logging and metrics

pub mod asset_generator;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod render_monitor;
pub mod render_spec;
pub mod script;
pub mod stages;
pub mod variant_qualifier;

pub use asset_generator::{AssetGenerator, AssetOutcome, GenerationReport, SynthesisRetry};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::StageLogger;
pub use render_monitor::{RenderMonitor, RenderOutcome, RenderReport};
pub use render_spec::build_render_spec;
pub use stages::{Stage, StageRunner};
pub use variant_qualifier::{RankedResults, VariantCriteria, VariantQualifier, VariantReport};
