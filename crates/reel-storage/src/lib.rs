//! Object storage for generated media assets.
//!
//! This crate provides:
//! - The `AssetStore` contract used by the audio stage
//! - An S3-compatible (Cloudflare R2) implementation returning public URLs
//! - An in-memory store for dry runs and tests

pub mod assets;
pub mod client;
pub mod error;

pub use assets::{audio_key, AssetStore, InMemoryAssetStore};
pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
