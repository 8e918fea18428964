//! Video-rendering provider client.
//!
//! Renders are submitted once and then checked by id. A 404 on a status
//! check means the provider has no record of the job, which is distinct
//! from a job that reports an `error` state.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use reel_models::RenderSpec;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};

/// Status reported by the provider for a job.
///
/// `state` is passed through verbatim; an empty state means the response
/// carried no usable status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStatus {
    pub state: String,
    pub url: Option<String>,
    pub message: Option<String>,
}

impl RenderStatus {
    pub fn is_done(&self) -> bool {
        self.state.eq_ignore_ascii_case("done")
    }

    pub fn is_error(&self) -> bool {
        self.state.eq_ignore_ascii_case("error")
    }
}

/// Video rendering.
#[async_trait]
pub trait RenderProvider: Send + Sync {
    /// Submit a render, returning the provider-issued job id.
    async fn submit(&self, spec: &RenderSpec) -> ProviderResult<String>;

    /// Check a job. Returns `ProviderError::NotFound` when the provider
    /// does not know the job.
    async fn status(&self, job_id: &str) -> ProviderResult<RenderStatus>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    movie: Option<MovieStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct MovieStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the rendering provider.
pub struct RenderClient {
    http: Client,
    config: ProviderConfig,
}

impl RenderClient {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = config.http_client("reel-render")?;
        Ok(Self { http, config })
    }

    /// Create from `RENDER_*` environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env("RENDER", "https://api.json2video.com/v2")?)
    }
}

#[async_trait]
impl RenderProvider for RenderClient {
    async fn submit(&self, spec: &RenderSpec) -> ProviderResult<String> {
        let url = self.config.url("/movies");
        debug!(scenes = spec.scenes.len(), "Submitting render");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .json(spec)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let body: SubmitResponse = response.json().await?;
        match (body.success, body.project) {
            (Some(false), _) => Err(ProviderError::invalid_response(
                body.message.unwrap_or_else(|| "submission rejected".to_string()),
            )),
            (_, Some(project)) if !project.is_empty() => Ok(project),
            _ => Err(ProviderError::invalid_response("submission returned no job id")),
        }
    }

    async fn status(&self, job_id: &str) -> ProviderResult<RenderStatus> {
        let url = self.config.url("/movies");

        let response = self
            .http
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&[("project", job_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        // Malformed bodies surface as an empty state rather than an error.
        let text = response.text().await?;
        let parsed: StatusResponse = serde_json::from_str(&text).unwrap_or_default();
        let movie = parsed.movie.unwrap_or_default();

        Ok(RenderStatus {
            state: movie.status.unwrap_or_default(),
            url: movie.url.filter(|u| !u.is_empty()),
            message: movie.message,
        })
    }
}
