//! In-memory store implementing every collaborator trait.
//!
//! Backs the `memory` storage mode and the test suites. It can also simulate
//! collaborator outages: an unavailable or slow proximity index, a failing
//! scan, unreadable engagement or review state and failing trust writes.

use crate::core::distance::distance_between;
use crate::core::filters::{matches_profile_filters, matches_query_constraints};
use crate::error::StoreError;
use crate::models::{
    CandidateQuery, Engagement, Provider, ProviderId, RatingSummary, Review, SentimentTally,
    TrustFactors, TrustRecord, VerificationState, VerificationStatus,
};
use crate::services::traits::{
    CandidateSource, EngagementSource, ProviderStore, ReviewStore, VerificationSource,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    providers: HashMap<ProviderId, Provider>,
    documents: HashMap<ProviderId, (bool, bool)>,
    response_rates: HashMap<ProviderId, f64>,
    engagements: HashMap<Uuid, Engagement>,
    reviews: HashMap<Uuid, Review>,
    trust_factors: HashMap<ProviderId, TrustFactors>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    index_unavailable: AtomicBool,
    index_delay_ms: AtomicU64,
    scan_unavailable: AtomicBool,
    engagements_unavailable: AtomicBool,
    engagement_delay_ms: AtomicU64,
    reviews_unavailable: AtomicBool,
    providers_unavailable: AtomicBool,
    fail_trust_writes: AtomicBool,
}

/// What a simulated outage looks like to callers: the pool gave up
fn outage() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

async fn delay(millis: &AtomicU64) {
    let millis = millis.load(Ordering::SeqCst);
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_provider(&self, provider: Provider) {
        self.state.write().providers.insert(provider.id, provider);
    }

    /// Record the two required identity documents' verification flags
    pub fn set_documents(&self, provider_id: ProviderId, identity: bool, tax: bool) {
        self.state.write().documents.insert(provider_id, (identity, tax));
    }

    pub fn set_response_rate(&self, provider_id: ProviderId, rate: f64) {
        self.state.write().response_rates.insert(provider_id, rate);
    }

    pub fn insert_engagement(&self, engagement: Engagement) {
        self.state.write().engagements.insert(engagement.id, engagement);
    }

    /// Seed a review without touching the rating summary
    pub fn insert_review(&self, review: Review) {
        self.state.write().reviews.insert(review.engagement_id, review);
    }

    pub fn set_index_available(&self, available: bool) {
        self.index_unavailable.store(!available, Ordering::SeqCst);
    }

    /// Delay every proximity lookup, e.g. to run past the caller's deadline
    pub fn set_index_delay(&self, delay: Duration) {
        self.index_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_scan_available(&self, available: bool) {
        self.scan_unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_engagements_available(&self, available: bool) {
        self.engagements_unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_engagement_delay(&self, delay: Duration) {
        self.engagement_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Sentiment tallies and review lookups fail while disabled
    pub fn set_reviews_available(&self, available: bool) {
        self.reviews_unavailable.store(!available, Ordering::SeqCst);
    }

    /// Provider profile reads fail while disabled; writes still go through
    pub fn set_providers_available(&self, available: bool) {
        self.providers_unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_fail_trust_writes(&self, fail: bool) {
        self.fail_trust_writes.store(fail, Ordering::SeqCst);
    }

    pub fn trust_factors(&self, provider_id: ProviderId) -> Option<TrustFactors> {
        self.state.read().trust_factors.get(&provider_id).copied()
    }

    pub fn review_count(&self) -> usize {
        self.state.read().reviews.len()
    }
}

#[async_trait]
impl CandidateSource for MemoryStore {
    async fn near(&self, query: &CandidateQuery) -> Result<Vec<Provider>, StoreError> {
        if self.index_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::IndexUnavailable("in-memory index disabled".to_string()));
        }
        delay(&self.index_delay_ms).await;

        let state = self.state.read();
        let mut candidates: Vec<(f64, Provider)> = state
            .providers
            .values()
            .filter(|p| p.is_active && p.verification_status == VerificationStatus::Verified)
            .filter(|p| matches_query_constraints(p, query))
            .map(|p| (distance_between(&query.center, &p.location), p.clone()))
            .filter(|(distance, _)| *distance <= query.max_distance_km)
            .collect();

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
        candidates.truncate(query.limit);

        Ok(candidates.into_iter().map(|(_, p)| p).collect())
    }

    async fn scan(&self, query: &CandidateQuery) -> Result<Vec<Provider>, StoreError> {
        if self.scan_unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }

        let state = self.state.read();
        Ok(state
            .providers
            .values()
            .filter(|p| p.is_active && p.verification_status == VerificationStatus::Verified)
            .filter(|p| matches_profile_filters(p, query))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EngagementSource for MemoryStore {
    async fn open_engagement_providers(&self) -> Result<HashSet<ProviderId>, StoreError> {
        if self.engagements_unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }
        delay(&self.engagement_delay_ms).await;

        Ok(self
            .state
            .read()
            .engagements
            .values()
            .filter(|e| e.status.is_open())
            .map(|e| e.provider_id)
            .collect())
    }

    async fn engagement(&self, id: Uuid) -> Result<Option<Engagement>, StoreError> {
        Ok(self.state.read().engagements.get(&id).cloned())
    }
}

#[async_trait]
impl VerificationSource for MemoryStore {
    async fn verification_state(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<VerificationState>, StoreError> {
        let state = self.state.read();
        Ok(state.providers.get(&provider_id).map(|provider| {
            let (identity, tax) = state.documents.get(&provider_id).copied().unwrap_or_default();
            VerificationState {
                status: provider.verification_status,
                identity_document_verified: identity,
                tax_document_verified: tax,
            }
        }))
    }

    async fn set_verification(
        &self,
        provider_id: ProviderId,
        status: VerificationStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write();
        let provider = state
            .providers
            .get_mut(&provider_id)
            .ok_or_else(|| StoreError::NotFound(format!("provider {}", provider_id)))?;

        provider.verification_status = status;
        if status == VerificationStatus::Verified {
            provider.is_active = true;
            state.documents.insert(provider_id, (true, true));
        }

        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn sentiment_tally(&self, provider_id: ProviderId) -> Result<SentimentTally, StoreError> {
        if self.reviews_unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }

        Ok(self
            .state
            .read()
            .reviews
            .values()
            .filter(|r| r.provider_id == provider_id)
            .map(|r| r.sentiment)
            .collect())
    }

    async fn review_for_engagement(
        &self,
        engagement_id: Uuid,
    ) -> Result<Option<Review>, StoreError> {
        if self.reviews_unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }

        Ok(self.state.read().reviews.get(&engagement_id).cloned())
    }

    async fn reviews_for(
        &self,
        provider_id: ProviderId,
        limit: usize,
    ) -> Result<Vec<Review>, StoreError> {
        if self.reviews_unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }

        let mut reviews: Vec<Review> = self
            .state
            .read()
            .reviews
            .values()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reviews.truncate(limit);

        Ok(reviews)
    }

    async fn record(&self, review: &Review) -> Result<RatingSummary, StoreError> {
        let mut state = self.state.write();

        if state.reviews.contains_key(&review.engagement_id) {
            return Err(StoreError::Conflict(format!(
                "review already exists for engagement {}",
                review.engagement_id
            )));
        }

        let provider = state
            .providers
            .get_mut(&review.provider_id)
            .ok_or_else(|| StoreError::NotFound(format!("provider {}", review.provider_id)))?;
        provider.rating.record(review.rating);
        let rating = provider.rating;

        state.reviews.insert(review.engagement_id, review.clone());
        Ok(rating)
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn provider(&self, id: ProviderId) -> Result<Option<Provider>, StoreError> {
        if self.providers_unavailable.load(Ordering::SeqCst) {
            return Err(outage());
        }

        Ok(self.state.read().providers.get(&id).cloned())
    }

    async fn provider_ids(&self) -> Result<Vec<ProviderId>, StoreError> {
        Ok(self.state.read().providers.keys().copied().collect())
    }

    async fn save_trust(
        &self,
        id: ProviderId,
        record: &TrustRecord,
        factors: &TrustFactors,
    ) -> Result<(), StoreError> {
        if self.fail_trust_writes.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("trust writes disabled".to_string()));
        }

        let mut state = self.state.write();
        let provider = state
            .providers
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("provider {}", id)))?;
        provider.trust = *record;
        state.trust_factors.insert(id, *factors);

        Ok(())
    }

    async fn set_active(&self, id: ProviderId, active: bool) -> Result<bool, StoreError> {
        let mut state = self.state.write();
        Ok(match state.providers.get_mut(&id) {
            Some(provider) => {
                provider.is_active = active;
                true
            }
            None => false,
        })
    }

    async fn response_rate(&self, id: ProviderId) -> Result<Option<f64>, StoreError> {
        Ok(self.state.read().response_rates.get(&id).copied())
    }
}
