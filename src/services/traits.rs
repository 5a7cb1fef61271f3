//! Collaborator contracts consumed by the matching and trust engines.
//!
//! The engines only see these traits; PostgreSQL and the in-memory store both
//! implement all of them.

use crate::error::StoreError;
use crate::models::{
    CandidateQuery, Engagement, Provider, ProviderId, RatingSummary, Review, SentimentTally,
    TrustFactors, TrustRecord, VerificationState, VerificationStatus,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// Proximity-indexed candidate retrieval
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Providers inside the query's bounding box matching the hard filters,
    /// nearest first, at most `query.limit` of them
    async fn near(&self, query: &CandidateQuery) -> Result<Vec<Provider>, StoreError>;

    /// Unordered scan over the hard filters, ignoring location
    async fn scan(&self, query: &CandidateQuery) -> Result<Vec<Provider>, StoreError>;
}

/// Booking state
#[async_trait]
pub trait EngagementSource: Send + Sync {
    /// Providers with at least one pending or accepted engagement
    async fn open_engagement_providers(&self) -> Result<HashSet<ProviderId>, StoreError>;

    async fn engagement(&self, id: Uuid) -> Result<Option<Engagement>, StoreError>;
}

/// Document and administrator verification state
#[async_trait]
pub trait VerificationSource: Send + Sync {
    async fn verification_state(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<VerificationState>, StoreError>;

    /// Apply an administrator decision; `Verified` also marks both documents
    /// verified and reactivates the provider
    async fn set_verification(
        &self,
        provider_id: ProviderId,
        status: VerificationStatus,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn sentiment_tally(&self, provider_id: ProviderId) -> Result<SentimentTally, StoreError>;

    async fn review_for_engagement(&self, engagement_id: Uuid)
        -> Result<Option<Review>, StoreError>;

    /// A provider's reviews, newest first
    async fn reviews_for(&self, provider_id: ProviderId, limit: usize)
        -> Result<Vec<Review>, StoreError>;

    /// Insert the review and fold its rating into the provider's running mean
    /// as one atomic step. A second review for the same engagement is a
    /// `StoreError::Conflict`.
    async fn record(&self, review: &Review) -> Result<RatingSummary, StoreError>;
}

/// Provider profile persistence
#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn provider(&self, id: ProviderId) -> Result<Option<Provider>, StoreError>;

    async fn provider_ids(&self) -> Result<Vec<ProviderId>, StoreError>;

    async fn save_trust(
        &self,
        id: ProviderId,
        record: &TrustRecord,
        factors: &TrustFactors,
    ) -> Result<(), StoreError>;

    /// Soft activate / deactivate; returns false when the provider is unknown
    async fn set_active(&self, id: ProviderId, active: bool) -> Result<bool, StoreError>;

    /// Fraction of assigned engagements accepted within the service window,
    /// `None` when nothing measures it yet
    async fn response_rate(&self, id: ProviderId) -> Result<Option<f64>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Run a collaborator call under a deadline
pub async fn bounded<T, F>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout {
            operation,
            millis: timeout.as_millis(),
        }),
    }
}
