//! # RateHub Providers
//!
//! Outbound adapters for the [`RateProvider`](ratehub_types::RateProvider)
//! port: one HTTP client per supported external rate API, plus a
//! deterministic mock for demos and tests.
//!
//! All HTTP providers share a 5 second per-request timeout and the same
//! bounded-backoff retry policy. Each one normalizes its provider's response
//! shape into a [`RateSnapshot`](ratehub_types::RateSnapshot) so the rest of
//! the system never sees provider-specific formats.

mod currencylayer;
mod exchangerate_api;
mod fixer;
mod mock;
mod registry;
mod retry;

pub use currencylayer::CurrencyLayerProvider;
pub use exchangerate_api::ExchangeRateApiProvider;
pub use fixer::FixerProvider;
pub use mock::MockProvider;
pub use registry::{create_provider, supported_providers};

use std::collections::BTreeMap;
use std::time::Duration;

use ratehub_types::{CurrencyCode, ProviderError};

/// Per-request timeout for upstream rate APIs.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const USER_AGENT: &str = "RateHub/1.0";

/// Maps a transport error, stripping the URL: for some providers the URL
/// path embeds the API key.
pub(crate) fn request_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Http(err.without_url().to_string())
    }
}

/// Collects raw provider rate entries, dropping unparseable currency codes
/// and the base currency's self-quote.
pub(crate) fn normalize_rates(
    base: &CurrencyCode,
    raw: impl IntoIterator<Item = (String, f64)>,
) -> BTreeMap<CurrencyCode, f64> {
    let mut rates = BTreeMap::new();
    for (code, rate) in raw {
        let Ok(target) = CurrencyCode::parse(&code) else {
            tracing::debug!(code, "skipping unparseable target currency");
            continue;
        };
        if &target == base {
            continue;
        }
        rates.insert(target, rate);
    }
    rates
}
