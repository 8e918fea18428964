//! Clients for the external providers the pipeline talks to.
//!
//! Each provider sits behind a narrow async trait so the stages can run
//! against the HTTP clients here or against in-process fakes:
//! - `SearchProvider`: product search results for a query
//! - `SpeechProvider`: text-to-speech synthesis
//! - `RenderProvider`: video render submission and status checks

pub mod config;
pub mod error;
pub mod render;
pub mod search;
pub mod speech;

pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
pub use render::{RenderClient, RenderProvider, RenderStatus};
pub use search::{SearchClient, SearchProvider};
pub use speech::{SpeechClient, SpeechProvider, SpeechRequest, VoiceSettings};
