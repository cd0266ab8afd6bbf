//! Configuration loading from environment.

use std::env;

use ratehub_types::BaseCurrencies;

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub app_data_key: String,
    pub base_currencies: BaseCurrencies,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = get("PORT").unwrap_or_else(|| "3001".to_string()).parse()?;

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let redis_url = get("REDIS_URL").filter(|url| !url.trim().is_empty());

        let app_data_key = get("APP_DATA_KEY")
            .ok_or_else(|| anyhow::anyhow!("APP_DATA_KEY environment variable is required"))?;

        let base_currencies = match get("BASE_CURRENCIES") {
            Some(raw) => BaseCurrencies::parse(&raw)?,
            None => BaseCurrencies::default(),
        };

        Ok(Self {
            port,
            database_url,
            redis_url,
            app_data_key,
            base_currencies,
        })
    }
}
