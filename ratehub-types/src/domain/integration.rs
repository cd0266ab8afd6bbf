//! Integration domain model: a configured external rate source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::DomainError;

/// Poll interval bounds, in seconds.
pub const MIN_POLL_INTERVAL_SECONDS: i64 = 60;
pub const MAX_POLL_INTERVAL_SECONDS: i64 = 3600;

/// Priority bounds (lower = preferred; display ordering only).
pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 100;

pub const DEFAULT_PRIORITY: i64 = 100;
pub const DEFAULT_POLL_INTERVAL_SECONDS: i64 = 300;

/// Unique identifier for an Integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct IntegrationId(Uuid);

impl IntegrationId {
    /// Creates a new random IntegrationId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an IntegrationId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns the UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl Default for IntegrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IntegrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for IntegrationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The supported external rate providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ProviderKind {
    #[serde(rename = "exchangerate-api")]
    ExchangeRateApi,
    #[serde(rename = "fixer", alias = "fixer.io")]
    Fixer,
    #[serde(rename = "currencylayer")]
    CurrencyLayer,
    #[serde(rename = "mock")]
    Mock,
}

impl ProviderKind {
    /// Parses a provider kind string, case-insensitively.
    ///
    /// Accepts the aliases the management API has historically allowed
    /// (`fixer.io` for Fixer).
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        match input.trim().to_lowercase().as_str() {
            "exchangerate-api" => Ok(Self::ExchangeRateApi),
            "fixer" | "fixer.io" => Ok(Self::Fixer),
            "currencylayer" => Ok(Self::CurrencyLayer),
            "mock" => Ok(Self::Mock),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }

    /// Canonical kind string, as stored and served.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExchangeRateApi => "exchangerate-api",
            Self::Fixer => "fixer",
            Self::CurrencyLayer => "currencylayer",
            Self::Mock => "mock",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A configured external rate source.
///
/// `api_key` holds the decrypted credential and is only populated on reads
/// that explicitly need it (scheduler loads, single-integration lookups).
/// It is never serialized.
#[derive(Debug, Clone)]
pub struct Integration {
    /// Unique identifier
    pub id: IntegrationId,
    /// Human-readable display name
    pub name: String,
    /// Which provider this integration talks to
    pub provider: ProviderKind,
    /// Base endpoint URL
    pub base_url: String,
    /// Decrypted credential, in memory only
    pub api_key: Option<String>,
    /// Display ordering; lower = preferred
    pub priority: i64,
    /// Seconds between polls, within [60, 3600]
    pub poll_interval_seconds: i64,
    /// Inactive integrations are never scheduled
    pub active: bool,
    /// When the integration was created
    pub created_at: DateTime<Utc>,
    /// When the integration was last modified
    pub updated_at: DateTime<Utc>,
}

impl Integration {
    /// Reconstructs an integration from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: IntegrationId,
        name: String,
        provider: ProviderKind,
        base_url: String,
        api_key: Option<String>,
        priority: i64,
        poll_interval_seconds: i64,
        active: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            provider,
            base_url,
            api_key,
            priority,
            poll_interval_seconds,
            active,
            created_at,
            updated_at,
        }
    }

    /// Validates a poll interval against the [60, 3600] second bound.
    pub fn validate_poll_interval(seconds: i64) -> Result<(), DomainError> {
        if !(MIN_POLL_INTERVAL_SECONDS..=MAX_POLL_INTERVAL_SECONDS).contains(&seconds) {
            return Err(DomainError::Validation(format!(
                "Poll interval must be between {MIN_POLL_INTERVAL_SECONDS} and \
                 {MAX_POLL_INTERVAL_SECONDS} seconds, got {seconds}"
            )));
        }
        Ok(())
    }

    /// Validates a priority against the [1, 100] bound.
    pub fn validate_priority(priority: i64) -> Result<(), DomainError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(DomainError::Validation(format!(
                "Priority must be between {MIN_PRIORITY} and {MAX_PRIORITY}, got {priority}"
            )));
        }
        Ok(())
    }

    /// Validates that a base URL is an http(s) URL with a host part.
    pub fn validate_base_url(url: &str) -> Result<(), DomainError> {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"));
        match rest {
            Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
            _ => Err(DomainError::Validation(format!("Invalid base URL: {url}"))),
        }
    }
}

/// Validated payload for creating an integration. Defaults applied:
/// priority 100, poll interval 300s, active true.
///
/// `api_key` is plaintext here; the repository encrypts it at rest.
#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub name: String,
    pub provider: ProviderKind,
    pub base_url: String,
    pub api_key: Option<String>,
    pub priority: i64,
    pub poll_interval_seconds: i64,
    pub active: bool,
}

impl NewIntegration {
    /// Validates raw creation input and applies defaults.
    pub fn new(
        name: &str,
        provider: &str,
        base_url: &str,
        api_key: Option<String>,
        priority: Option<i64>,
        poll_interval_seconds: Option<i64>,
        active: Option<bool>,
    ) -> Result<Self, DomainError> {
        let name = sanitize_name(name);
        if name.is_empty() {
            return Err(DomainError::Validation("name is required".to_string()));
        }
        let provider = ProviderKind::parse(provider)?;
        let base_url = base_url.trim().to_string();
        Integration::validate_base_url(&base_url)?;
        let priority = priority.unwrap_or(DEFAULT_PRIORITY);
        Integration::validate_priority(priority)?;
        let poll_interval_seconds =
            poll_interval_seconds.unwrap_or(DEFAULT_POLL_INTERVAL_SECONDS);
        Integration::validate_poll_interval(poll_interval_seconds)?;

        Ok(Self {
            name,
            provider,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            priority,
            poll_interval_seconds,
            active: active.unwrap_or(true),
        })
    }
}

/// Validated partial update. `api_key: Some(None)` clears the stored
/// credential; `Some(Some(_))` replaces it.
#[derive(Debug, Clone, Default)]
pub struct IntegrationUpdate {
    pub name: Option<String>,
    pub provider: Option<ProviderKind>,
    pub base_url: Option<String>,
    pub api_key: Option<Option<String>>,
    pub priority: Option<i64>,
    pub poll_interval_seconds: Option<i64>,
    pub active: Option<bool>,
}

impl IntegrationUpdate {
    /// True when the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.provider.is_none()
            && self.base_url.is_none()
            && self.api_key.is_none()
            && self.priority.is_none()
            && self.poll_interval_seconds.is_none()
            && self.active.is_none()
    }

    /// Validates whichever fields are present.
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::Validation("name cannot be empty".to_string()));
            }
        }
        if let Some(url) = &self.base_url {
            Integration::validate_base_url(url)?;
        }
        if let Some(priority) = self.priority {
            Integration::validate_priority(priority)?;
        }
        if let Some(seconds) = self.poll_interval_seconds {
            Integration::validate_poll_interval(seconds)?;
        }
        Ok(())
    }
}

/// Trims and strips angle brackets from user-supplied names.
fn sanitize_name(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect()
}
