//! Search provider client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use reel_models::SearchHit;

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};

/// Product search for a query string.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch one page of hits for `query`.
    async fn search(&self, query: &str, page: u32) -> ProviderResult<Vec<SearchHit>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, alias = "search_results")]
    results: Vec<Value>,
}

impl SearchResponse {
    /// Hits that fail to parse are dropped so one bad entry does not cost
    /// the rest of the page.
    fn into_hits(self) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<SearchHit>(raw) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable search hit");
                    None
                }
            })
            .collect()
    }
}

/// HTTP client for the search provider.
pub struct SearchClient {
    http: Client,
    config: ProviderConfig,
}

impl SearchClient {
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let http = config.http_client("reel-search")?;
        Ok(Self { http, config })
    }

    /// Create from `SEARCH_*` environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        Self::new(ProviderConfig::from_env("SEARCH", "https://api.rainforestapi.com")?)
    }
}

#[async_trait]
impl SearchProvider for SearchClient {
    async fn search(&self, query: &str, page: u32) -> ProviderResult<Vec<SearchHit>> {
        let url = self.config.url("/search");
        let page = page.to_string();
        debug!(query = %query, page = %page, "Searching");

        let response = self
            .http
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&[("query", query), ("page", page.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("search response: {}", e)))?;

        Ok(parsed.into_hits())
    }
}
