//! Provider factory and catalog.

use std::sync::Arc;

use ratehub_types::{Integration, ProviderInfo, ProviderKind, RateProvider};

use crate::{CurrencyLayerProvider, ExchangeRateApiProvider, FixerProvider, MockProvider};

/// Instantiates the provider adapter an integration is configured for.
///
/// The integration must carry its decrypted credential; providers receive
/// it as-is and never see the encrypted form.
pub fn create_provider(integration: &Integration) -> Arc<dyn RateProvider> {
    match integration.provider {
        ProviderKind::ExchangeRateApi => Arc::new(ExchangeRateApiProvider::new(
            integration.base_url.clone(),
            integration.api_key.clone(),
        )),
        ProviderKind::Fixer => Arc::new(FixerProvider::new(
            integration.base_url.clone(),
            integration.api_key.clone(),
        )),
        ProviderKind::CurrencyLayer => Arc::new(CurrencyLayerProvider::new(
            integration.base_url.clone(),
            integration.api_key.clone(),
        )),
        ProviderKind::Mock => Arc::new(MockProvider::new()),
    }
}

/// Static catalog of supported providers, served by the management API for
/// setup forms.
pub fn supported_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            kind: ProviderKind::ExchangeRateApi,
            display_name: "ExchangeRate-API".to_string(),
            default_base_url: "https://v6.exchangerate-api.com".to_string(),
            free_tier_limit: 1500,
            description: "Best free tier with 1,500 requests/month".to_string(),
        },
        ProviderInfo {
            kind: ProviderKind::Fixer,
            display_name: "Fixer.io".to_string(),
            default_base_url: "http://data.fixer.io/api".to_string(),
            free_tier_limit: 100,
            description: "EUR base only on free tier".to_string(),
        },
        ProviderInfo {
            kind: ProviderKind::CurrencyLayer,
            display_name: "CurrencyLayer".to_string(),
            default_base_url: "http://api.currencylayer.com".to_string(),
            free_tier_limit: 100,
            description: "USD base only on free tier".to_string(),
        },
        ProviderInfo {
            kind: ProviderKind::Mock,
            display_name: "Mock Provider".to_string(),
            default_base_url: "http://localhost".to_string(),
            free_tier_limit: 1000,
            description: "No API key needed - perfect for testing".to_string(),
        },
    ]
}
