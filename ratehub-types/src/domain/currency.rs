//! Currency code and pair types.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::error::DomainError;

/// A validated ISO-4217-style currency code: exactly three ASCII letters,
/// normalized to uppercase.
///
/// The set of codes is open - providers report whatever currencies they
/// quote, so this is a validated string rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "USD")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses and normalizes a currency code.
    ///
    /// # Validation
    /// - Exactly 3 characters
    /// - ASCII letters only (lowercase input is uppercased)
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::Validation(format!(
                "Invalid currency code: {input}"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The US dollar, used as the health-check base and first anchor.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// The fixed, ordered set of anchor currencies used for cross-rate search
/// and as the default polling base list.
pub fn anchor_currencies() -> [CurrencyCode; 4] {
    [
        CurrencyCode("USD".to_string()),
        CurrencyCode("EUR".to_string()),
        CurrencyCode("GBP".to_string()),
        CurrencyCode("JPY".to_string()),
    ]
}

/// An ordered (base, target) currency tuple.
///
/// Rendered as `"BASE-TARGET"` - the key format used by the latest-rate
/// table and the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
}

impl CurrencyPair {
    pub fn new(base: CurrencyCode, target: CurrencyCode) -> Self {
        Self { base, target }
    }

    /// Parses a `"BASE-TARGET"` key.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let (base, target) = input.split_once('-').ok_or_else(|| {
            DomainError::Validation(format!("Invalid currency pair: {input}"))
        })?;
        Ok(Self {
            base: CurrencyCode::parse(base)?,
            target: CurrencyCode::parse(target)?,
        })
    }

    /// Returns the `"BASE-TARGET"` key string.
    pub fn key(&self) -> String {
        format!("{}-{}", self.base, self.target)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.target)
    }
}

/// Which base currencies every poll cycle fetches.
///
/// Configured via `BASE_CURRENCIES`: a comma-separated list, or the `ALL`
/// sentinel meaning every currency currently observed in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseCurrencies {
    /// Fixed list from configuration.
    List(Vec<CurrencyCode>),
    /// Every currency observed in the latest-rate table, resolved per tick.
    All,
}

impl BaseCurrencies {
    /// Parses the `BASE_CURRENCIES` value. Case-insensitive `ALL` selects
    /// every observed currency; otherwise each comma-separated entry must be
    /// a valid code. An empty value falls back to the default list.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        let codes = trimmed
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(CurrencyCode::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if codes.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self::List(codes))
    }
}

impl Default for BaseCurrencies {
    /// The anchor currencies, matching the cross-rate search order.
    fn default() -> Self {
        Self::List(anchor_currencies().to_vec())
    }
}
