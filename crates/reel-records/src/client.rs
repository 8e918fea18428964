//! REST client for the tabular record service.
//!
//! - HTTP client tuning (pooling, timeouts)
//! - Retry on rate limits and server errors
//! - Observability (tracing spans, metrics)

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info_span, Instrument};

use reel_models::{RecordId, WorkRecord};

use crate::error::{RecordError, RecordResult, DEFAULT_RETRY_AFTER_MS};
use crate::metrics::record_request;
use crate::retry::RetryPolicy;
use crate::store::RecordStore;

// =============================================================================
// Configuration
// =============================================================================

/// Record service client configuration.
#[derive(Debug, Clone)]
pub struct RecordClientConfig {
    /// API root, e.g. `https://api.airtable.com/v0`
    pub base_url: String,
    /// Bearer token
    pub api_key: String,
    /// Base (database) identifier
    pub base_id: String,
    /// Table holding work records
    pub table: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry policy
    pub retry: RetryPolicy,
}

impl RecordClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        let api_key = std::env::var("RECORDS_API_KEY")
            .map_err(|_| RecordError::config("RECORDS_API_KEY must be set"))?;
        let base_id = std::env::var("RECORDS_BASE_ID")
            .map_err(|_| RecordError::config("RECORDS_BASE_ID must be set"))?;

        if api_key.is_empty() || base_id.is_empty() {
            return Err(RecordError::config(
                "RECORDS_API_KEY and RECORDS_BASE_ID cannot be empty",
            ));
        }

        Ok(Self {
            base_url: std::env::var("RECORDS_BASE_URL")
                .unwrap_or_else(|_| "https://api.airtable.com/v0".to_string()),
            api_key,
            base_id,
            table: std::env::var("RECORDS_TABLE").unwrap_or_else(|_| "Videos".to_string()),
            timeout: Duration::from_secs(
                std::env::var("RECORDS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::from_env(),
        })
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Serialize)]
struct UpdateRequest<'a> {
    fields: &'a Map<String, Value>,
    typecast: bool,
}

/// REST client for work records.
#[derive(Clone)]
pub struct RecordClient {
    http: Client,
    config: RecordClientConfig,
    table_url: String,
}

impl RecordClient {
    /// Create a new record client.
    pub fn new(config: RecordClientConfig) -> RecordResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("reel-records/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RecordError::Network)?;

        let table_url = format!(
            "{}/{}/{}",
            config.base_url.trim_end_matches('/'),
            config.base_id,
            urlencoding::encode(&config.table)
        );

        Ok(Self {
            http,
            config,
            table_url,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> RecordResult<Self> {
        Self::new(RecordClientConfig::from_env()?)
    }

    fn record_url(&self, id: &RecordId) -> String {
        format!("{}/{}", self.table_url, urlencoding::encode(id.as_str()))
    }

    /// Fetch a single record.
    pub async fn get_record(&self, id: &RecordId) -> RecordResult<WorkRecord> {
        let url = self.record_url(id);
        let url = url.as_str();

        self.execute_request("get_record", id, move || async move {
            let response = self
                .http
                .get(url)
                .bearer_auth(&self.config.api_key)
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json::<WorkRecord>().await?),
                _ => Err(Self::handle_error_response(url, response).await),
            }
        })
        .await
    }

    /// Merge fields into a record.
    pub async fn update_record(
        &self,
        id: &RecordId,
        fields: &Map<String, Value>,
    ) -> RecordResult<WorkRecord> {
        let url = self.record_url(id);
        let body = UpdateRequest {
            fields,
            typecast: true,
        };

        debug!(
            record_id = %id,
            fields = ?fields.keys().collect::<Vec<_>>(),
            "Updating record"
        );

        let url = url.as_str();
        let body = &body;

        self.execute_request("update_record", id, move || async move {
            let response = self
                .http
                .patch(url)
                .bearer_auth(&self.config.api_key)
                .json(body)
                .send()
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json::<WorkRecord>().await?),
                _ => Err(Self::handle_error_response(url, response).await),
            }
        })
        .await
    }

    async fn execute_request<T, F, Fut>(
        &self,
        operation: &str,
        id: &RecordId,
        op: F,
    ) -> RecordResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RecordResult<T>>,
    {
        let span = info_span!(
            "records_request",
            operation = %operation,
            table = %self.config.table,
            record_id = %id
        );

        let start = Instant::now();
        let result = self
            .config
            .retry
            .run(operation, op)
            .instrument(span)
            .await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn handle_error_response(url: &str, response: Response) -> RecordError {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let after_ms = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(DEFAULT_RETRY_AFTER_MS);
            return RecordError::RateLimited(after_ms);
        }

        let body = response.text().await.unwrap_or_default();
        RecordError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
    }
}

#[async_trait]
impl RecordStore for RecordClient {
    async fn get(&self, id: &RecordId) -> RecordResult<WorkRecord> {
        self.get_record(id).await
    }

    async fn update(&self, id: &RecordId, fields: Map<String, Value>) -> RecordResult<WorkRecord> {
        self.update_record(id, &fields).await
    }
}

// =============================================================================
// Tests
// =============================================================================
