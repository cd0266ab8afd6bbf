//! CurrencyLayer adapter.
//!
//! The free tier only quotes USD as source. Quotes arrive keyed with the
//! source prefixed ("USDEUR": 0.92), so normalization strips it.
//! Docs: <https://currencylayer.com/documentation>

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ratehub_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot, UsageMetrics};
use reqwest::{Client, header};
use serde::Deserialize;

use crate::retry::with_retry;
use crate::{REQUEST_TIMEOUT, USER_AGENT, normalize_rates, request_error};

const KIND: &str = "currencylayer";

/// Client for `GET {base_url}/live?access_key={key}&source={BASE}`.
pub struct CurrencyLayerProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl CurrencyLayerProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.unwrap_or_default(),
            http: Client::new(),
        }
    }

    async fn fetch_once(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        let url = format!("{}/live", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header(header::USER_AGENT, USER_AGENT)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("source", base.as_str()),
            ])
            .send()
            .await
            .map_err(request_error)?;
        let status = resp.status();
        let payload: Payload = resp.json().await.map_err(|err| {
            if status.is_success() {
                ProviderError::Malformed(err.without_url().to_string())
            } else {
                ProviderError::Http(format!("HTTP {status}"))
            }
        })?;
        snapshot_from_payload(base, payload)
    }
}

#[async_trait::async_trait]
impl RateProvider for CurrencyLayerProvider {
    async fn fetch_latest_rates(
        &self,
        base: &CurrencyCode,
    ) -> Result<RateSnapshot, ProviderError> {
        with_retry(KIND, || self.fetch_once(base)).await
    }

    async fn usage_metrics(&self) -> UsageMetrics {
        UsageMetrics {
            calls_remaining: None,
            limit: Some(100),
            reset_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    success: bool,
    error: Option<ApiError>,
    source: Option<String>,
    timestamp: Option<i64>,
    #[serde(default)]
    quotes: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: Option<String>,
    info: Option<String>,
}

fn snapshot_from_payload(
    requested_base: &CurrencyCode,
    payload: Payload,
) -> Result<RateSnapshot, ProviderError> {
    if !payload.success {
        let message = payload
            .error
            .and_then(|e| e.info.or(e.kind))
            .unwrap_or_else(|| "API request failed".to_string());
        return Err(ProviderError::Api(message));
    }
    let base = match &payload.source {
        Some(code) => {
            CurrencyCode::parse(code).map_err(|err| ProviderError::Malformed(err.to_string()))?
        }
        None => requested_base.clone(),
    };
    let fetched_at = payload
        .timestamp
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    // "USDEUR" -> "EUR"; keys not carrying the source prefix are dropped.
    let quotes = payload.quotes.into_iter().filter_map(|(key, value)| {
        key.strip_prefix(base.as_str())
            .map(|target| (target.to_string(), value))
    });
    let rates = normalize_rates(&base, quotes);
    RateSnapshot::new(base, rates, fetched_at)
        .map_err(|err| ProviderError::Malformed(err.to_string()))
}
