use crate::models::{ProviderId, TrustRecord};
use thiserror::Error;

/// Failures reported by external collaborators (stores, indexes)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Proximity index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Timed out after {millis}ms waiting for {operation}")]
    Timeout { operation: &'static str, millis: u128 },

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Errors surfaced by the matching and trust engines
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[source] StoreError),

    /// The record was computed but could not be stored; the previous one stays authoritative
    #[error("Trust record for {provider_id} computed but not persisted: {source}")]
    TrustNotPersisted {
        provider_id: ProviderId,
        record: TrustRecord,
        #[source]
        source: StoreError,
    },
}

impl MatchError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        MatchError::InvalidQuery(reason.into())
    }
}
