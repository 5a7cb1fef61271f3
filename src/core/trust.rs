//! Trust score aggregation.
//!
//! Five normalized factors are combined with fixed weights into a 0-100 score
//! and a status label. Administrative verification gates the label: anything
//! short of `verified` is `Needs Review` whatever the numeric score says.

use crate::core::locks::ProviderLocks;
use crate::error::{MatchError, StoreError};
use crate::models::{
    ProviderId, SentimentTally, TrustFactors, TrustRecord, TrustStatus, VerificationState,
    VerificationStatus,
};
use crate::services::traits::{bounded, ProviderStore, ReviewStore, VerificationSource};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DOCUMENT_WEIGHT: f64 = 0.30;
pub const SENTIMENT_WEIGHT: f64 = 0.25;
pub const RATING_WEIGHT: f64 = 0.20;
pub const EXPERIENCE_WEIGHT: f64 = 0.15;
pub const RESPONSE_WEIGHT: f64 = 0.10;

pub const TRUSTED_THRESHOLD: f64 = 80.0;
pub const VERIFIED_THRESHOLD: f64 = 50.0;

/// Years of experience at which the experience factor saturates
pub const EXPERIENCE_SATURATION_YEARS: f64 = 10.0;

/// Response rate assumed when nothing measures it
pub const NEUTRAL_RESPONSE_RATE: f64 = 1.0;

/// Everything the trust computation reads about one provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustInputs {
    pub verification: VerificationState,
    pub rating_average: f64,
    pub sentiment: SentimentTally,
    pub experience_years: u32,
    pub response_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustAssessment {
    pub factors: TrustFactors,
    pub score: f64,
    pub status: TrustStatus,
}

impl TrustFactors {
    /// Weighted sum scaled to 0-100
    pub fn weighted_score(&self) -> f64 {
        let sum = DOCUMENT_WEIGHT * self.document_verification
            + SENTIMENT_WEIGHT * self.review_sentiment
            + RATING_WEIGHT * self.rating_average
            + EXPERIENCE_WEIGHT * self.experience
            + RESPONSE_WEIGHT * self.response_rate;

        (100.0 * sum).clamp(0.0, 100.0)
    }
}

/// Net sentiment over all reviews rescaled from [-1, 1] to [0, 1]
pub fn review_sentiment_factor(tally: &SentimentTally) -> f64 {
    let net = tally.positive as f64 - tally.negative as f64;
    let total = tally.total().max(1) as f64;

    ((net / total + 1.0) / 2.0).clamp(0.0, 1.0)
}

pub fn experience_factor(years: u32) -> f64 {
    (years as f64 / EXPERIENCE_SATURATION_YEARS).min(1.0)
}

pub fn status_for(score: f64, verification: VerificationStatus) -> TrustStatus {
    if verification != VerificationStatus::Verified {
        return TrustStatus::NeedsReview;
    }

    if score >= TRUSTED_THRESHOLD {
        TrustStatus::Trusted
    } else if score >= VERIFIED_THRESHOLD {
        TrustStatus::Verified
    } else {
        TrustStatus::NeedsReview
    }
}

/// Compute factors, score and status from raw inputs
pub fn assess(inputs: &TrustInputs) -> TrustAssessment {
    let response_rate = inputs
        .response_rate
        .filter(|rate| rate.is_finite())
        .unwrap_or(NEUTRAL_RESPONSE_RATE)
        .clamp(0.0, 1.0);

    let factors = TrustFactors {
        document_verification: if inputs.verification.documents_verified() { 1.0 } else { 0.0 },
        review_sentiment: review_sentiment_factor(&inputs.sentiment),
        rating_average: (inputs.rating_average / 5.0).clamp(0.0, 1.0),
        experience: experience_factor(inputs.experience_years),
        response_rate,
    };

    let score = factors.weighted_score();

    TrustAssessment {
        factors,
        score,
        status: status_for(score, inputs.verification.status),
    }
}

/// Outcome of a refresh over all providers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

/// Recomputes and stores provider trust records
///
/// Triggered by verification changes, new reviews and the periodic refresh.
/// Recomputes for the same provider are serialized; different providers run
/// in parallel.
pub struct TrustScoreEngine {
    providers: Arc<dyn ProviderStore>,
    verification: Arc<dyn VerificationSource>,
    reviews: Arc<dyn ReviewStore>,
    locks: ProviderLocks,
    timeout: Duration,
    default_response_rate: f64,
}

impl TrustScoreEngine {
    pub fn new(
        providers: Arc<dyn ProviderStore>,
        verification: Arc<dyn VerificationSource>,
        reviews: Arc<dyn ReviewStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            providers,
            verification,
            reviews,
            locks: ProviderLocks::new(),
            timeout,
            default_response_rate: NEUTRAL_RESPONSE_RATE,
        }
    }

    /// Response rate used for providers with no measured rate
    pub fn with_default_response_rate(mut self, rate: f64) -> Self {
        self.default_response_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Recompute and persist the trust record of one provider
    ///
    /// # Errors
    /// * `ProviderNotFound` for an unknown identifier
    /// * `CollaboratorUnavailable` when an input cannot be read; the stored
    ///   record is left untouched
    /// * `TrustNotPersisted` when the record was computed but the write failed
    pub async fn recompute(&self, provider_id: ProviderId) -> Result<TrustRecord, MatchError> {
        let _guard = self.locks.acquire(provider_id).await;

        let provider = bounded(self.timeout, "provider lookup", self.providers.provider(provider_id))
            .await
            .map_err(MatchError::CollaboratorUnavailable)?
            .ok_or(MatchError::ProviderNotFound(provider_id))?;

        let verification = bounded(
            self.timeout,
            "verification state",
            self.verification.verification_state(provider_id),
        )
        .await
        .map_err(MatchError::CollaboratorUnavailable)?
        .unwrap_or(VerificationState {
            status: provider.verification_status,
            identity_document_verified: false,
            tax_document_verified: false,
        });

        let sentiment = bounded(self.timeout, "sentiment tally", self.reviews.sentiment_tally(provider_id))
            .await
            .map_err(MatchError::CollaboratorUnavailable)?;

        // A missing responsiveness signal must not block the recompute
        let response_rate = match bounded(
            self.timeout,
            "response rate",
            self.providers.response_rate(provider_id),
        )
        .await
        {
            Ok(rate) => rate,
            Err(e) => {
                warn!("Response rate unavailable for {}, using default: {}", provider_id, e);
                None
            }
        };

        let assessment = assess(&TrustInputs {
            verification,
            rating_average: provider.rating.average,
            sentiment,
            experience_years: provider.experience_years,
            response_rate: response_rate.or(Some(self.default_response_rate)),
        });

        let record = TrustRecord {
            score: assessment.score,
            status: assessment.status,
            last_updated: Utc::now(),
        };

        debug!(
            "Trust factors for {}: {:?} -> {:.2} ({:?})",
            provider_id, assessment.factors, record.score, record.status
        );

        if let Err(source) = bounded(
            self.timeout,
            "trust write",
            self.providers.save_trust(provider_id, &record, &assessment.factors),
        )
        .await
        {
            return Err(MatchError::TrustNotPersisted {
                provider_id,
                record,
                source,
            });
        }

        info!(
            "Trust score for {} updated to {:.2} ({:?})",
            provider_id, record.score, record.status
        );

        Ok(record)
    }

    /// Recompute after a business action that must stand whatever happens
    ///
    /// Failures are logged; returns whether a fresh record was stored.
    pub async fn refresh_after(&self, provider_id: ProviderId, trigger: &str) -> bool {
        match self.recompute(provider_id).await {
            Ok(_) => true,
            Err(MatchError::TrustNotPersisted { record, source, .. }) => {
                error!(
                    "Trust record for {} after {} not persisted (computed {:.2}, {:?}): {}",
                    provider_id, trigger, record.score, record.status, source
                );
                false
            }
            Err(e) => {
                warn!("Trust recompute for {} after {} failed: {}", provider_id, trigger, e);
                false
            }
        }
    }

    /// Recompute every provider, logging failures and carrying on
    pub async fn recompute_all(&self) -> Result<RefreshSummary, StoreError> {
        let ids = bounded(self.timeout, "provider listing", self.providers.provider_ids()).await?;
        let mut summary = RefreshSummary::default();

        for id in ids {
            match self.recompute(id).await {
                Ok(_) => summary.refreshed += 1,
                Err(e) => {
                    warn!("Periodic trust refresh failed for {}: {}", id, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Trust refresh complete: {} refreshed, {} failed",
            summary.refreshed, summary.failed
        );

        Ok(summary)
    }
}
