// Integration tests for workmatch

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use workmatch::core::{
    distance::haversine_distance, RecommendationConfig, RecommendationEngine, SentimentClassifier,
    TrustScoreEngine,
};
use workmatch::error::{MatchError, StoreError};
use workmatch::models::{
    Engagement, EngagementStatus, GeoPoint, PriceRange, Provider, RatingSummary,
    SearchPreference, Skill, SortKey, TrustRecord, TrustStatus, VerificationStatus,
};
use workmatch::services::{MemoryStore, NewReview, ReviewService};

const CENTER: (f64, f64) = (28.6139, 77.2090);

fn create_test_provider(lat: f64, lon: f64, rating: f64, trust: f64) -> Provider {
    Provider {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        name: "Integration Provider".to_string(),
        skills: vec![Skill::Cleaning, Skill::Cooking],
        experience_years: 5,
        expected_price: 5000.0,
        location: GeoPoint::new(lat, lon),
        rating: RatingSummary { average: rating, count: 8 },
        trust: TrustRecord {
            score: trust,
            status: TrustStatus::Trusted,
            last_updated: Utc::now(),
        },
        verification_status: VerificationStatus::Verified,
        is_active: true,
        created_at: Utc::now(),
    }
}

fn create_test_preferences() -> SearchPreference {
    SearchPreference {
        location: Some(GeoPoint::new(CENTER.0, CENTER.1)),
        max_distance_km: 10.0,
        skills: vec![Skill::Cleaning],
        price_range: Some(PriceRange { min: 3000.0, max: 8000.0 }),
        ..SearchPreference::default()
    }
}

fn create_engine(store: Arc<MemoryStore>) -> RecommendationEngine {
    RecommendationEngine::new(store.clone(), store, RecommendationConfig::default())
}

fn create_engine_with_timeout(store: Arc<MemoryStore>, timeout: Duration) -> RecommendationEngine {
    let config = RecommendationConfig {
        collaborator_timeout: timeout,
        ..RecommendationConfig::default()
    };
    RecommendationEngine::new(store.clone(), store, config)
}

fn create_trust_engine(store: Arc<MemoryStore>) -> Arc<TrustScoreEngine> {
    Arc::new(TrustScoreEngine::new(
        store.clone(),
        store.clone(),
        store,
        Duration::from_secs(1),
    ))
}

#[tokio::test]
async fn test_reference_scenario_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6140, 77.2100, 4.5, 85.0));
    let engine = create_engine(store);

    let result = engine.search(&create_test_preferences(), 20).await.unwrap();

    assert_eq!(result.matches.len(), 1);
    let d = haversine_distance(CENTER.0, CENTER.1, 28.6140, 77.2100);
    let expected = ((40.0 * (1.0 - d / 10.0) + 57.5) * 100.0).round() / 100.0;
    assert_eq!(result.matches[0].recommendation_score, expected);
    assert!(!result.used_fallback);
}

#[tokio::test]
async fn test_open_engagement_excludes_provider() {
    let store = Arc::new(MemoryStore::new());
    let busy = create_test_provider(28.6140, 77.2100, 5.0, 95.0);
    let free = create_test_provider(28.6200, 77.2100, 3.0, 40.0);
    let busy_id = busy.id;
    let free_id = free.id;
    store.insert_provider(busy);
    store.insert_provider(free);
    store.insert_engagement(Engagement {
        id: Uuid::new_v4(),
        provider_id: busy_id,
        requester_id: Uuid::new_v4(),
        status: EngagementStatus::Accepted,
    });

    let result = create_engine(store).search(&create_test_preferences(), 20).await.unwrap();

    let ids: Vec<_> = result.matches.iter().map(|m| m.provider.id).collect();
    assert_eq!(ids, vec![free_id]);
}

#[tokio::test]
async fn test_radius_and_rating_floor_hold() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..30 {
        let lat = CENTER.0 + (i as f64) * 0.006; // up to ~19km north
        let rating = 1.0 + (i % 5) as f64;
        store.insert_provider(create_test_provider(lat, CENTER.1, rating, 60.0));
    }

    let mut preferences = create_test_preferences();
    preferences.min_rating = 3.0;

    let result = create_engine(store).search(&preferences, 50).await.unwrap();

    assert!(!result.matches.is_empty());
    for m in &result.matches {
        assert!(m.distance_km <= preferences.max_distance_km);
        assert!(m.provider.rating.average >= 3.0);
    }
}

#[tokio::test]
async fn test_score_non_increasing_with_distance() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..10 {
        store.insert_provider(create_test_provider(CENTER.0 + i as f64 * 0.008, CENTER.1, 4.0, 70.0));
    }

    let result = create_engine(store).search(&create_test_preferences(), 20).await.unwrap();

    for pair in result.matches.windows(2) {
        assert!(pair[0].distance_km <= pair[1].distance_km);
        assert!(pair[0].recommendation_score >= pair[1].recommendation_score);
    }
}

#[tokio::test]
async fn test_unavailable_index_falls_back_to_scan() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6200, 77.2100, 4.0, 70.0));
    store.insert_provider(create_test_provider(19.0760, 72.8777, 5.0, 99.0)); // Mumbai
    store.set_index_available(false);

    let result = create_engine(store).search(&create_test_preferences(), 20).await.unwrap();

    assert!(result.used_fallback);
    assert_eq!(result.total_candidates, 2);
    // The scan ignores location; the radius cutoff still applies
    assert_eq!(result.matches.len(), 1);
}

#[tokio::test]
async fn test_slow_index_falls_back_to_scan() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6200, 77.2100, 4.0, 70.0));
    store.set_index_delay(Duration::from_millis(500));

    let result = create_engine_with_timeout(store, Duration::from_millis(50))
        .search(&create_test_preferences(), 20)
        .await
        .unwrap();

    assert!(result.used_fallback);
    assert_eq!(result.matches.len(), 1);
}

#[tokio::test]
async fn test_failed_scan_fails_search() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6200, 77.2100, 4.0, 70.0));
    store.set_index_available(false);
    store.set_scan_available(false);

    let result = create_engine(store).search(&create_test_preferences(), 20).await;

    assert!(matches!(result, Err(MatchError::CollaboratorUnavailable(_))));
}

#[tokio::test]
async fn test_unreadable_engagement_state_fails_search() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6200, 77.2100, 4.0, 70.0));
    store.set_engagements_available(false);

    let result = create_engine(store).search(&create_test_preferences(), 20).await;

    // Never rank providers whose availability is unknown
    assert!(matches!(result, Err(MatchError::CollaboratorUnavailable(_))));
}

#[tokio::test]
async fn test_slow_engagement_state_times_out() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6200, 77.2100, 4.0, 70.0));
    store.set_engagement_delay(Duration::from_millis(500));

    let result = create_engine_with_timeout(store, Duration::from_millis(50))
        .search(&create_test_preferences(), 20)
        .await;

    assert!(matches!(
        result,
        Err(MatchError::CollaboratorUnavailable(StoreError::Timeout { .. }))
    ));
}

#[tokio::test]
async fn test_missing_location_is_invalid_and_sentinel_is_empty() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(0.01, 0.01, 5.0, 90.0));
    let engine = create_engine(store);

    let mut preferences = create_test_preferences();
    preferences.location = None;
    assert!(matches!(
        engine.search(&preferences, 10).await,
        Err(MatchError::InvalidQuery(_))
    ));

    preferences.location = Some(GeoPoint::new(0.0, 0.0));
    assert!(engine.search(&preferences, 10).await.unwrap().matches.is_empty());
}

#[tokio::test]
async fn test_nearby_is_capped_and_ordered() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..30 {
        store.insert_provider(create_test_provider(CENTER.0 + i as f64 * 0.001, CENTER.1, 4.0, 50.0));
    }

    let nearby = create_engine(store)
        .nearby(GeoPoint::new(CENTER.0, CENTER.1), 10.0)
        .await
        .unwrap();

    assert_eq!(nearby.len(), 20);
    for pair in nearby.windows(2) {
        assert!(pair[0].distance_km <= pair[1].distance_km);
    }
}

#[tokio::test]
async fn test_sort_by_price() {
    let store = Arc::new(MemoryStore::new());
    for price in [7000.0, 3500.0, 5000.0] {
        let mut provider = create_test_provider(28.6200, 77.2100, 4.0, 70.0);
        provider.expected_price = price;
        store.insert_provider(provider);
    }

    let mut preferences = create_test_preferences();
    preferences.sort_by = SortKey::Price;

    let result = create_engine(store).search(&preferences, 20).await.unwrap();
    let prices: Vec<f64> = result.matches.iter().map(|m| m.provider.expected_price).collect();
    assert_eq!(prices, vec![3500.0, 5000.0, 7000.0]);
}

#[tokio::test]
async fn test_pending_provider_trust_needs_review() {
    let store = Arc::new(MemoryStore::new());
    let mut provider = create_test_provider(28.6200, 77.2100, 5.0, 0.0);
    provider.verification_status = VerificationStatus::Pending;
    provider.experience_years = 12;
    let provider_id = provider.id;
    store.insert_provider(provider);
    store.set_documents(provider_id, true, true);

    let record = create_trust_engine(store.clone()).recompute(provider_id).await.unwrap();

    assert_eq!(record.status, TrustStatus::NeedsReview);
    assert!(record.score > 0.0);
    let factors = store.trust_factors(provider_id).unwrap();
    assert_eq!(factors.document_verification, 1.0);
}

#[tokio::test]
async fn test_trust_recompute_unknown_provider() {
    let trust = create_trust_engine(Arc::new(MemoryStore::new()));
    assert!(matches!(
        trust.recompute(Uuid::new_v4()).await,
        Err(MatchError::ProviderNotFound(_))
    ));
}

#[tokio::test]
async fn test_trust_write_failure_reports_computed_record() {
    let store = Arc::new(MemoryStore::new());
    let provider = create_test_provider(28.6200, 77.2100, 4.0, 33.0);
    let provider_id = provider.id;
    store.insert_provider(provider);
    store.set_fail_trust_writes(true);

    let result = create_trust_engine(store.clone()).recompute(provider_id).await;

    match result {
        Err(MatchError::TrustNotPersisted { record, .. }) => assert!(record.score > 0.0),
        other => panic!("expected TrustNotPersisted, got {:?}", other),
    }
    // Previous record stays authoritative
    let stored = workmatch::services::ProviderStore::provider(store.as_ref(), provider_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.trust.score, 33.0);
}

#[tokio::test]
async fn test_unreadable_trust_input_keeps_stored_record() {
    let store = Arc::new(MemoryStore::new());
    let provider = create_test_provider(28.6200, 77.2100, 4.0, 33.0);
    let provider_id = provider.id;
    store.insert_provider(provider);
    store.set_reviews_available(false);

    let result = create_trust_engine(store.clone()).recompute(provider_id).await;

    assert!(matches!(result, Err(MatchError::CollaboratorUnavailable(_))));
    let stored = workmatch::services::ProviderStore::provider(store.as_ref(), provider_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.trust.score, 33.0);
    assert!(store.trust_factors(provider_id).is_none());
}

#[tokio::test]
async fn test_reviews_feed_trust_sentiment() {
    let store = Arc::new(MemoryStore::new());
    let provider = create_test_provider(28.6200, 77.2100, 0.0, 0.0);
    let provider_id = provider.id;
    store.insert_provider(provider);
    store.set_documents(provider_id, true, true);

    let trust = create_trust_engine(store.clone());
    let reviews = ReviewService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        trust.clone(),
        Arc::new(SentimentClassifier::default()),
        Duration::from_secs(1),
    );

    let requester_id = Uuid::new_v4();
    for comment in ["Excellent and honest", "Terrible, rude and late"] {
        let engagement_id = Uuid::new_v4();
        store.insert_engagement(Engagement {
            id: engagement_id,
            provider_id,
            requester_id,
            status: EngagementStatus::Completed,
        });
        reviews
            .record_review(NewReview {
                provider_id,
                engagement_id,
                requester_id,
                rating: 3,
                comment: Some(comment.to_string()),
            })
            .await
            .unwrap();
    }

    let summary = reviews.sentiment_summary(provider_id).await.unwrap();
    assert_eq!(summary.review_sentiment, 0.5);
    assert_eq!(store.trust_factors(provider_id).unwrap().review_sentiment, 0.5);
}

#[tokio::test]
async fn test_recompute_all_counts_results() {
    let store = Arc::new(MemoryStore::new());
    for _ in 0..3 {
        store.insert_provider(create_test_provider(28.62, 77.21, 4.0, 10.0));
    }

    let summary = create_trust_engine(store).recompute_all().await.unwrap();
    assert_eq!(summary.refreshed, 3);
    assert_eq!(summary.failed, 0);
}

#[test]
fn test_blocking_search_from_sync_context() {
    let store = Arc::new(MemoryStore::new());
    store.insert_provider(create_test_provider(28.6140, 77.2100, 4.5, 85.0));
    let engine = create_engine(store);

    let result = tokio_test::block_on(engine.search(&create_test_preferences(), 5)).unwrap();
    assert_eq!(result.matches.len(), 1);
}
