//! Review recording workflow.
//!
//! A review attests one completed engagement. Recording it classifies the
//! comment, folds the rating into the provider's running mean and refreshes
//! the trust record. The review stands even when the refresh fails.

use crate::core::sentiment::SentimentClassifier;
use crate::core::trust::{review_sentiment_factor, TrustScoreEngine};
use crate::error::StoreError;
use crate::models::{
    EngagementStatus, Provider, ProviderId, Review, Sentiment, SentimentTally,
};
use crate::services::traits::{bounded, EngagementSource, ProviderStore, ReviewStore};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Engagement not found: {0}")]
    EngagementNotFound(Uuid),

    #[error("Engagement {0} is {1:?}; only completed engagements can be reviewed")]
    EngagementNotCompleted(Uuid, EngagementStatus),

    #[error("Engagement {engagement_id} does not belong to provider {provider_id}")]
    ProviderMismatch {
        engagement_id: Uuid,
        provider_id: ProviderId,
    },

    #[error("Requester {0} did not take part in the engagement")]
    NotParticipant(Uuid),

    #[error("Engagement {0} has already been reviewed")]
    DuplicateReview(Uuid),

    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// A review as submitted by a requester
#[derive(Debug, Clone)]
pub struct NewReview {
    pub provider_id: ProviderId,
    pub engagement_id: Uuid,
    pub requester_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub review: Review,
    /// Provider as re-read after the rating and trust updates; `None` when
    /// that read failed, the review is stored either way
    pub provider: Option<Provider>,
    pub trust_refreshed: bool,
}

/// Per-provider sentiment counts and the derived trust sub-score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummary {
    pub provider_id: ProviderId,
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
    pub total: u32,
    pub review_sentiment: f64,
}

impl SentimentSummary {
    pub fn from_tally(provider_id: ProviderId, tally: SentimentTally) -> Self {
        Self {
            provider_id,
            positive: tally.positive,
            neutral: tally.neutral,
            negative: tally.negative,
            total: tally.total(),
            review_sentiment: review_sentiment_factor(&tally),
        }
    }
}

/// Most reviews returned by one listing
pub const REVIEW_LIST_LIMIT: usize = 50;

pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    engagements: Arc<dyn EngagementSource>,
    providers: Arc<dyn ProviderStore>,
    trust: Arc<TrustScoreEngine>,
    classifier: Arc<SentimentClassifier>,
    timeout: Duration,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        engagements: Arc<dyn EngagementSource>,
        providers: Arc<dyn ProviderStore>,
        trust: Arc<TrustScoreEngine>,
        classifier: Arc<SentimentClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            reviews,
            engagements,
            providers,
            trust,
            classifier,
            timeout,
        }
    }

    /// Record a review for a completed engagement
    ///
    /// # Arguments
    /// * `request` - The submitted review
    ///
    /// # Returns
    /// The stored review and the provider as it reads afterwards
    pub async fn record_review(&self, request: NewReview) -> Result<ReviewOutcome, ReviewError> {
        if !(1..=5).contains(&request.rating) {
            return Err(ReviewError::InvalidRating(request.rating));
        }

        let engagement = bounded(
            self.timeout,
            "engagement lookup",
            self.engagements.engagement(request.engagement_id),
        )
        .await?
        .ok_or(ReviewError::EngagementNotFound(request.engagement_id))?;

        if engagement.provider_id != request.provider_id {
            return Err(ReviewError::ProviderMismatch {
                engagement_id: engagement.id,
                provider_id: request.provider_id,
            });
        }
        if engagement.requester_id != request.requester_id {
            return Err(ReviewError::NotParticipant(request.requester_id));
        }
        if engagement.status != EngagementStatus::Completed {
            return Err(ReviewError::EngagementNotCompleted(engagement.id, engagement.status));
        }

        let existing = bounded(
            self.timeout,
            "review lookup",
            self.reviews.review_for_engagement(engagement.id),
        )
        .await?;
        if existing.is_some() {
            return Err(ReviewError::DuplicateReview(engagement.id));
        }

        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let sentiment = comment
            .as_deref()
            .map(|c| self.classifier.classify(c))
            .unwrap_or(Sentiment::Neutral);

        let review = Review {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            engagement_id: engagement.id,
            requester_id: request.requester_id,
            rating: request.rating,
            comment,
            sentiment,
            created_at: Utc::now(),
        };

        // The store enforces uniqueness too; a concurrent duplicate lands here
        let rating = bounded(self.timeout, "review insert", self.reviews.record(&review))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ReviewError::DuplicateReview(review.engagement_id),
                StoreError::NotFound(_) => ReviewError::ProviderNotFound(review.provider_id),
                other => ReviewError::Store(other),
            })?;

        debug!(
            "Review {} for provider {} classified {:?}, rating now {:.2} over {}",
            review.id, review.provider_id, sentiment, rating.average, rating.count
        );

        let trust_refreshed = self.trust.refresh_after(review.provider_id, "review").await;

        // Committed already: a failed re-read must not look like a rejection
        let provider = match bounded(
            self.timeout,
            "provider lookup",
            self.providers.provider(review.provider_id),
        )
        .await
        {
            Ok(provider) => provider,
            Err(e) => {
                warn!(
                    "Review {} stored but provider {} could not be re-read: {}",
                    review.id, review.provider_id, e
                );
                None
            }
        };

        info!(
            "Recorded review for engagement {} (provider {}, rating {})",
            review.engagement_id, review.provider_id, review.rating
        );

        Ok(ReviewOutcome {
            review,
            provider,
            trust_refreshed,
        })
    }

    /// A provider's reviews, newest first, at most `REVIEW_LIST_LIMIT`
    pub async fn recent_reviews(
        &self,
        provider_id: ProviderId,
        limit: usize,
    ) -> Result<Vec<Review>, ReviewError> {
        bounded(self.timeout, "provider lookup", self.providers.provider(provider_id))
            .await?
            .ok_or(ReviewError::ProviderNotFound(provider_id))?;

        let limit = limit.clamp(1, REVIEW_LIST_LIMIT);
        Ok(bounded(
            self.timeout,
            "review listing",
            self.reviews.reviews_for(provider_id, limit),
        )
        .await?)
    }

    /// Sentiment counts over all of a provider's reviews
    pub async fn sentiment_summary(
        &self,
        provider_id: ProviderId,
    ) -> Result<SentimentSummary, ReviewError> {
        bounded(self.timeout, "provider lookup", self.providers.provider(provider_id))
            .await?
            .ok_or(ReviewError::ProviderNotFound(provider_id))?;

        let tally = bounded(
            self.timeout,
            "sentiment tally",
            self.reviews.sentiment_tally(provider_id),
        )
        .await?;

        Ok(SentimentSummary::from_tally(provider_id, tally))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Engagement, GeoPoint, RatingSummary, Skill, TrustRecord, VerificationStatus,
    };
    use crate::services::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ReviewService,
        provider_id: ProviderId,
        requester_id: Uuid,
    }

    fn create_fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let provider = Provider {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Reviewed Provider".to_string(),
            skills: vec![Skill::Babysitting],
            experience_years: 5,
            expected_price: 6000.0,
            location: GeoPoint::new(12.9716, 77.5946),
            rating: RatingSummary::default(),
            trust: TrustRecord::unassessed(),
            verification_status: VerificationStatus::Verified,
            is_active: true,
            created_at: Utc::now(),
        };
        let provider_id = provider.id;
        store.insert_provider(provider);
        store.set_documents(provider_id, true, true);

        let trust = Arc::new(TrustScoreEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Duration::from_secs(1),
        ));
        let service = ReviewService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            trust,
            Arc::new(SentimentClassifier::default()),
            Duration::from_secs(1),
        );

        Fixture {
            store,
            service,
            provider_id,
            requester_id: Uuid::new_v4(),
        }
    }

    fn add_engagement(fixture: &Fixture, status: EngagementStatus) -> Uuid {
        let id = Uuid::new_v4();
        fixture.store.insert_engagement(Engagement {
            id,
            provider_id: fixture.provider_id,
            requester_id: fixture.requester_id,
            status,
        });
        id
    }

    fn new_review(fixture: &Fixture, engagement_id: Uuid, rating: u8, comment: &str) -> NewReview {
        NewReview {
            provider_id: fixture.provider_id,
            engagement_id,
            requester_id: fixture.requester_id,
            rating,
            comment: Some(comment.to_string()),
        }
    }

    #[tokio::test]
    async fn test_record_review_updates_rating_and_trust() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);

        let outcome = fixture
            .service
            .record_review(new_review(&fixture, engagement_id, 5, "Very punctual and friendly"))
            .await
            .unwrap();

        assert_eq!(outcome.review.sentiment, Sentiment::Positive);
        let provider = outcome.provider.unwrap();
        assert_eq!(provider.rating, RatingSummary { average: 5.0, count: 1 });
        assert!(outcome.trust_refreshed);
        assert!(provider.trust.score > 0.0);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_rating() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);

        for rating in [0, 6] {
            let result = fixture
                .service
                .record_review(new_review(&fixture, engagement_id, rating, "ok"))
                .await;
            assert!(matches!(result, Err(ReviewError::InvalidRating(_))));
        }
    }

    #[tokio::test]
    async fn test_rejects_open_engagement() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Accepted);

        let result = fixture
            .service
            .record_review(new_review(&fixture, engagement_id, 4, "fine"))
            .await;

        assert!(matches!(
            result,
            Err(ReviewError::EngagementNotCompleted(_, EngagementStatus::Accepted))
        ));
    }

    #[tokio::test]
    async fn test_rejects_second_review() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);

        fixture
            .service
            .record_review(new_review(&fixture, engagement_id, 4, "good"))
            .await
            .unwrap();
        let second = fixture
            .service
            .record_review(new_review(&fixture, engagement_id, 1, "bad"))
            .await;

        assert!(matches!(second, Err(ReviewError::DuplicateReview(_))));
        assert_eq!(fixture.store.review_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_other_requester() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);

        let mut request = new_review(&fixture, engagement_id, 4, "good");
        request.requester_id = Uuid::new_v4();

        let result = fixture.service.record_review(request).await;
        assert!(matches!(result, Err(ReviewError::NotParticipant(_))));
    }

    #[tokio::test]
    async fn test_trust_write_failure_keeps_review() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);
        fixture.store.set_fail_trust_writes(true);

        let outcome = fixture
            .service
            .record_review(new_review(&fixture, engagement_id, 3, "okay"))
            .await
            .unwrap();

        assert!(!outcome.trust_refreshed);
        assert_eq!(outcome.provider.unwrap().rating.count, 1);
        assert_eq!(fixture.store.review_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_reread_still_reports_stored_review() {
        let fixture = create_fixture();
        let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);
        fixture.store.set_providers_available(false);

        let outcome = fixture
            .service
            .record_review(new_review(&fixture, engagement_id, 5, "great"))
            .await
            .unwrap();

        assert!(outcome.provider.is_none());
        assert!(!outcome.trust_refreshed);
        assert_eq!(outcome.review.engagement_id, engagement_id);
        assert_eq!(fixture.store.review_count(), 1);
    }

    #[tokio::test]
    async fn test_recent_reviews_newest_first() {
        let fixture = create_fixture();
        for comment in ["first visit", "second visit", "third visit"] {
            let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);
            fixture
                .service
                .record_review(new_review(&fixture, engagement_id, 4, comment))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let reviews = fixture.service.recent_reviews(fixture.provider_id, 2).await.unwrap();

        let comments: Vec<_> = reviews.iter().filter_map(|r| r.comment.as_deref()).collect();
        assert_eq!(comments, vec!["third visit", "second visit"]);

        let unknown = fixture.service.recent_reviews(Uuid::new_v4(), 10).await;
        assert!(matches!(unknown, Err(ReviewError::ProviderNotFound(_))));
    }

    #[tokio::test]
    async fn test_sentiment_summary() {
        let fixture = create_fixture();
        for comment in ["great and helpful", "rude and late"] {
            let engagement_id = add_engagement(&fixture, EngagementStatus::Completed);
            fixture
                .service
                .record_review(new_review(&fixture, engagement_id, 4, comment))
                .await
                .unwrap();
        }

        let summary = fixture.service.sentiment_summary(fixture.provider_id).await.unwrap();

        assert_eq!((summary.positive, summary.neutral, summary.negative), (1, 0, 1));
        assert_eq!(summary.total, 2);
        assert!((summary.review_sentiment - 0.5).abs() < 1e-12);
    }
}
