//! Fixer.io adapter.
//!
//! The free tier only quotes EUR as base; the requested base is passed
//! upstream regardless, and paid keys unlock the rest.
//! Docs: <https://fixer.io/documentation>

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ratehub_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot, UsageMetrics};
use reqwest::{Client, header};
use serde::Deserialize;

use crate::retry::with_retry;
use crate::{REQUEST_TIMEOUT, USER_AGENT, normalize_rates, request_error};

const KIND: &str = "fixer";

/// Client for `GET {base_url}/latest?access_key={key}&base={BASE}`.
pub struct FixerProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl FixerProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.unwrap_or_default(),
            http: Client::new(),
        }
    }

    async fn fetch_once(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        let url = format!("{}/latest", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header(header::USER_AGENT, USER_AGENT)
            .query(&[("access_key", self.api_key.as_str()), ("base", base.as_str())])
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
impl RateProvider for FixerProvider {
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
    base: Option<String>,
    timestamp: Option<i64>,
    #[serde(default)]
    rates: HashMap<String, f64>,
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
    let base = match &payload.base {
        Some(code) => {
            CurrencyCode::parse(code).map_err(|err| ProviderError::Malformed(err.to_string()))?
        }
        None => requested_base.clone(),
    };
    let fetched_at = payload
        .timestamp
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    let rates = normalize_rates(&base, payload.rates);
    RateSnapshot::new(base, rates, fetched_at)
        .map_err(|err| ProviderError::Malformed(err.to_string()))
}
