//! HTTP source for the TripSit catalog and combination tables
//!
//! Fetches each dataset document with a bounded timeout and retries transient
//! failures with exponential backoff. The body is parsed as JSON here; the
//! document shape is checked later by the dataset decoders.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::catalog::decode_substance;
use crate::config::{Config, SourcesConfig, SyncConfig};
use crate::error::{Error, Result, SyncError};
use crate::types::{canonical_name, Dataset, Substance};

use super::source::CatalogSource;

/// Longest pause between retries
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Longest a connectivity probe may take
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the remote datasets
pub struct HttpCatalogSource {
    sources: SourcesConfig,
    sync: SyncConfig,
    http_client: reqwest::Client,
    initial_backoff: Duration,
}

impl HttpCatalogSource {
    /// Create a source from configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        config.sources.validate()?;
        config.sync.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tripkit/", env!("CARGO_PKG_VERSION"))),
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sync.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            sources: config.sources.clone(),
            sync: config.sync.clone(),
            http_client,
            initial_backoff: Duration::from_millis(500),
        })
    }

    /// Override the first retry delay (tests use a few milliseconds)
    pub fn with_initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = delay;
        self
    }

    /// URL a dataset is fetched from
    pub fn url_for(&self, dataset: Dataset) -> &str {
        match dataset {
            Dataset::Substances => &self.sources.catalog_url,
            Dataset::Interactions => &self.sources.combos_url,
            Dataset::Definitions => &self.sources.definitions_url,
        }
    }

    /// GET a URL and parse the body as JSON, without retrying
    async fn get_json(&self, dataset: Dataset, url: &str) -> std::result::Result<Value, SyncError> {
        let key = dataset.key();

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(key, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(SyncError::Status {
                dataset: key,
                status: status.as_u16(),
                body: truncate(&body, 200),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(key, e))?;

        serde_json::from_str(&body).map_err(|e| SyncError::MalformedPayload {
            dataset: key,
            message: format!("invalid JSON: {}", e),
        })
    }

    fn transport_error(&self, dataset: &'static str, e: reqwest::Error) -> SyncError {
        if e.is_timeout() {
            SyncError::Timeout {
                dataset,
                secs: self.sync.timeout_secs,
            }
        } else {
            SyncError::Network {
                dataset,
                message: e.to_string(),
            }
        }
    }

    /// Fetch one dataset document, once
    pub async fn fetch_once(&self, dataset: Dataset) -> std::result::Result<Value, SyncError> {
        let doc = self.get_json(dataset, self.url_for(dataset)).await?;

        // The catalog API reports failures in-band
        if dataset == Dataset::Substances && reports_error(doc.get("err")) {
            return Err(SyncError::MalformedPayload {
                dataset: dataset.key(),
                message: format!("API reported an error: {}", doc["err"]),
            });
        }

        Ok(doc)
    }

    /// Fetch one dataset document with retry logic
    ///
    /// Retries transient failures (5xx, 429, timeouts, connection errors) with
    /// exponential backoff.
    pub async fn fetch_with_retry(&self, dataset: Dataset) -> std::result::Result<Value, SyncError> {
        let mut delay = self.initial_backoff;
        let mut attempt = 0;

        loop {
            match self.fetch_once(dataset).await {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_transient() && attempt < self.sync.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        dataset = %dataset,
                        error = %e,
                        attempt,
                        max_retries = self.sync.max_retries,
                        ?delay,
                        "Transient error fetching dataset, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, MAX_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch full details for one substance
    ///
    /// Returns `None` when the API has no entry for `name`.
    pub async fn fetch_substance(
        &self,
        name: &str,
    ) -> std::result::Result<Option<Substance>, SyncError> {
        let name = canonical_name(name);
        let url = format!(
            "{}/{}",
            self.sources.drug_url_base.trim_end_matches('/'),
            urlencoding::encode(&name)
        );
        let doc = self.get_json(Dataset::Substances, &url).await?;

        let Some(first) = doc
            .get("data")
            .and_then(Value::as_array)
            .and_then(|data| data.first())
        else {
            return Ok(None);
        };

        if reports_error(first.get("err")) || reports_error(doc.get("err")) {
            tracing::debug!(name = %name, "Substance not found upstream");
            return Ok(None);
        }

        Ok(decode_substance(&name, first))
    }

    /// Check whether the network is reachable
    ///
    /// Any HTTP response counts as online; only transport failures mean offline.
    pub async fn probe(&self) -> bool {
        match self
            .http_client
            .head(&self.sync.probe_url)
            .timeout(PROBE_TIMEOUT.min(Duration::from_secs(self.sync.timeout_secs)))
            .send()
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(url = %self.sync.probe_url, error = %e, "Connectivity probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn is_online(&self) -> bool {
        if self.sync.offline {
            return false;
        }
        if !self.sync.probe_connectivity {
            return true;
        }
        self.probe().await
    }

    async fn fetch(&self, dataset: Dataset) -> std::result::Result<Value, SyncError> {
        self.fetch_with_retry(dataset).await
    }
}

/// `err` fields are `null`/`false` on success and anything else on failure
fn reports_error(err: Option<&Value>) -> bool {
    !matches!(err, None | Some(Value::Null) | Some(Value::Bool(false)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
