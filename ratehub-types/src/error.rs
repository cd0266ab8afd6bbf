//! Error types for the exchange rate hub.

use crate::domain::IntegrationId;

/// Domain-level errors (business logic violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Exchange rate not available for {pair}. No cross-rate path found.")]
    RateUnavailable { pair: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Integration not found: {0}")]
    IntegrationNotFound(IntegrationId),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Credential cipher error: {0}")]
    Crypto(String),

    #[error("Entity not found")]
    NotFound,
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::UnknownProvider(kind) => {
                AppError::BadRequest(format!("Unknown provider: {kind}"))
            }
            e @ DomainError::RateUnavailable { .. } => AppError::NotFound(e.to_string()),
            DomainError::IntegrationNotFound(id) => {
                AppError::NotFound(format!("Integration not found: {id}"))
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Resource not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Crypto(e) => AppError::Internal(e),
        }
    }
}
