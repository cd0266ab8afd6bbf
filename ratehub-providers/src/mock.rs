//! Deterministic mock provider.
//!
//! Serves a fixed USD-quoted table without touching the network, so the
//! whole pipeline can run in demos and tests with no API key. Rates against
//! other bases are derived from the table by inversion.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use ratehub_types::{CurrencyCode, ProviderError, RateProvider, RateSnapshot, UsageMetrics};

/// Fixed rates against one US dollar, roughly realistic.
const USD_RATES: [(&str, f64); 8] = [
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 149.50),
    ("CHF", 0.88),
    ("CAD", 1.36),
    ("AUD", 1.54),
    ("NZD", 1.67),
    ("CNY", 7.24),
];

/// Small artificial delay so demo traffic behaves like a network call.
const SIMULATED_LATENCY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

fn table_rate(code: &CurrencyCode) -> Option<f64> {
    USD_RATES
        .iter()
        .find(|(c, _)| *c == code.as_str())
        .map(|(_, rate)| *rate)
}

#[async_trait::async_trait]
impl RateProvider for MockProvider {
    async fn fetch_latest_rates(
        &self,
        base: &CurrencyCode,
    ) -> Result<RateSnapshot, ProviderError> {
        tokio::time::sleep(SIMULATED_LATENCY).await;

        let mut rates = BTreeMap::new();
        if base.as_str() == "USD" {
            for (code, rate) in USD_RATES {
                if let Ok(target) = CurrencyCode::parse(code) {
                    rates.insert(target, rate);
                }
            }
        } else {
            let Some(base_rate) = table_rate(base) else {
                return Err(ProviderError::UnsupportedBase(base.clone()));
            };
            // Re-quote the table against the requested base:
            // rate(base, USD) = 1 / table[base], rate(base, X) = table[X] / table[base]
            rates.insert(CurrencyCode::usd(), 1.0 / base_rate);
            for (code, rate) in USD_RATES {
                if code == base.as_str() {
                    continue;
                }
                if let Ok(target) = CurrencyCode::parse(code) {
                    rates.insert(target, rate / base_rate);
                }
            }
        }

        RateSnapshot::new(base.clone(), rates, Utc::now())
            .map_err(|err| ProviderError::Malformed(err.to_string()))
    }

    async fn usage_metrics(&self) -> UsageMetrics {
        UsageMetrics {
            calls_remaining: Some(1000),
            limit: Some(1000),
            reset_at: Some(Utc::now() + chrono::Duration::days(30)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_usd_base_serves_the_fixed_table() {
        let provider = MockProvider::new();
        let snapshot = provider
            .fetch_latest_rates(&CurrencyCode::usd())
            .await
            .unwrap();
        assert_eq!(snapshot.base.as_str(), "USD");
        assert_eq!(snapshot.rates.len(), 8);
        assert!((snapshot.rates[&code("EUR")] - 0.92).abs() < 1e-12);
        assert!((snapshot.rates[&code("JPY")] - 149.50).abs() < 1e-12);
        assert!(!snapshot.rates.contains_key(&CurrencyCode::usd()));
    }

    #[tokio::test]
    async fn test_non_usd_base_inverts_the_table() {
        let provider = MockProvider::new();
        let snapshot = provider.fetch_latest_rates(&code("EUR")).await.unwrap();
        // USD plus the seven remaining table currencies
        assert_eq!(snapshot.rates.len(), 8);
        assert!((snapshot.rates[&CurrencyCode::usd()] - 1.0 / 0.92).abs() < 1e-12);
        assert!((snapshot.rates[&code("GBP")] - 0.79 / 0.92).abs() < 1e-12);
        assert!(!snapshot.rates.contains_key(&code("EUR")));
    }

    #[tokio::test]
    async fn test_unsupported_base_is_rejected() {
        let provider = MockProvider::new();
        let err = provider.fetch_latest_rates(&code("THB")).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedBase(ref c) if c.as_str() == "THB"));
    }

    #[tokio::test]
    async fn test_usage_metrics_report_full_quota() {
        let provider = MockProvider::new();
        let metrics = provider.usage_metrics().await;
        assert_eq!(metrics.calls_remaining, Some(1000));
        assert_eq!(metrics.limit, Some(1000));
        assert!(metrics.reset_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_health_check_passes() {
        let provider = MockProvider::new();
        assert!(provider.health_check().await);
    }
}
