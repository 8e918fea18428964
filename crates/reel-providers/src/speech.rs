//! Speech-synthesis provider client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};

/// Voice parameters for a synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub voice_id: String,
    pub model_id: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

impl VoiceSettings {
    /// Read `TTS_VOICE_ID` / `TTS_MODEL_ID`, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            voice_id: std::env::var("TTS_VOICE_ID").unwrap_or(defaults.voice_id),
            model_id: std::env::var("TTS_MODEL_ID").unwrap_or(defaults.model_id),
            ..defaults
        }
    }
}

/// Text plus voice parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: VoiceSettings,
}

/// Text-to-speech synthesis.
///
/// Implementations report overload as `ProviderError::RateLimited`; every
/// other error is final for the request.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize `request`, returning raw audio bytes.
    async fn synthesize(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>>;
}

#[derive(Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: SynthesisVoice,
}

#[derive(Serialize)]
struct SynthesisVoice {
    stability: f32,
    similarity_boost: f32,
}

/// HTTP client for the speech-synthesis provider.
pub struct SpeechClient {
    http: Client,
    config: ProviderConfig,
}

impl SpeechClient {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = config.http_client("reel-speech")?;
        Ok(Self { http, config })
    }

    /// Create from `TTS_*` environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env("TTS", "https://api.elevenlabs.io")?)
    }
}

#[async_trait]
impl SpeechProvider for SpeechClient {
    async fn synthesize(&self, request: &SpeechRequest) -> ProviderResult<Vec<u8>> {
        let url = self
            .config
            .url(&format!("/v1/text-to-speech/{}", request.voice.voice_id));
        let body = SynthesisBody {
            text: &request.text,
            model_id: &request.voice.model_id,
            voice_settings: SynthesisVoice {
                stability: request.voice.stability,
                similarity_boost: request.voice.similarity_boost,
            },
        };

        debug!(chars = request.text.len(), "Requesting speech synthesis");

        let response = self
            .http
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .header("accept", "audio/mpeg")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(ProviderError::invalid_response("empty audio body"));
        }
        Ok(audio.to_vec())
    }
}
