//! ExchangeRate-API adapter.
//!
//! The most generous free tier among the supported providers (1,500
//! requests per month) and the only one whose free tier accepts arbitrary
//! base currencies. Docs: <https://www.exchangerate-api.com>

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ratehub_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot, UsageMetrics};
use reqwest::{Client, header};
use serde::Deserialize;

use crate::retry::with_retry;
use crate::{REQUEST_TIMEOUT, USER_AGENT, normalize_rates, request_error};

const KIND: &str = "exchangerate-api";

/// Client for `GET {base_url}/v6/{api_key}/latest/{BASE}`.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.unwrap_or_default(),
            http: Client::new(),
        }
    }

    async fn fetch_once(&self, base: &CurrencyCode) -> Result<RateSnapshot, ProviderError> {
        // The key rides in the path, so this URL must never be logged.
        let url = format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, base);
        let resp = self
            .http
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(request_error)?;
        let status = resp.status();
        // Error payloads come back with 4xx statuses; parse them anyway so
        // the provider's error-type survives into our error message.
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
impl RateProvider for ExchangeRateApiProvider {
    async fn fetch_latest_rates(
        &self,
        base: &CurrencyCode,
    ) -> Result<RateSnapshot, ProviderError> {
        with_retry(KIND, || self.fetch_once(base)).await
    }

    async fn usage_metrics(&self) -> UsageMetrics {
        // Only the monthly cap is known; the free tier reports nothing in-band.
        UsageMetrics {
            calls_remaining: None,
            limit: Some(1500),
            reset_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

fn snapshot_from_payload(
    requested_base: &CurrencyCode,
    payload: Payload,
) -> Result<RateSnapshot, ProviderError> {
    if payload.result == "error" {
        return Err(ProviderError::Api(
            payload
                .error_type
                .unwrap_or_else(|| "API request failed".to_string()),
        ));
    }
    let base = match &payload.base_code {
        Some(code) => {
            CurrencyCode::parse(code).map_err(|err| ProviderError::Malformed(err.to_string()))?
        }
        None => requested_base.clone(),
    };
    let fetched_at = payload
        .time_last_update_unix
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    let rates = normalize_rates(&base, payload.conversion_rates);
    RateSnapshot::new(base, rates, fetched_at)
        .map_err(|err| ProviderError::Malformed(err.to_string()))
}
