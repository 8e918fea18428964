//! Record store access for work records.
//!
//! This crate provides:
//! - The `RecordStore` contract used by every pipeline stage
//! - A REST client for the tabular record service
//! - Retry that honours the service's rate-limit waits
//! - Request metrics
//! - An in-memory store for dry runs and tests

pub mod client;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod retry;
pub mod store;

pub use client::{RecordClient, RecordClientConfig};
pub use error::{RecordError, RecordResult};
pub use memory::InMemoryRecordStore;
pub use retry::RetryPolicy;
pub use store::RecordStore;
