use crate::models::{CreateReviewRequest, ReviewListQuery, ReviewListResponse, ReviewResponse};
use crate::routes::{error_response, review_error_response, AppState};
use crate::services::{NewReview, REVIEW_LIST_LIMIT};
use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

/// Configure review routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/providers/{provider_id}/reviews")
            .route(web::post().to(create_review))
            .route(web::get().to(list_reviews)),
    )
    .route(
        "/providers/{provider_id}/reviews/summary",
        web::get().to(review_summary),
    );
}

/// Review a completed engagement
///
/// POST /api/v1/providers/{provider_id}/reviews
///
/// Request body:
/// ```json
/// {
///   "engagementId": "uuid",
///   "requesterId": "uuid",
///   "rating": 5,
///   "comment": "string"
/// }
/// ```
async fn create_review(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<CreateReviewRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for review request: {:?}", errors);
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string());
    }

    let req = req.into_inner();
    let request = NewReview {
        provider_id: path.into_inner(),
        engagement_id: req.engagement_id,
        requester_id: req.requester_id,
        rating: req.rating,
        comment: req.comment,
    };

    match state.reviews.record_review(request).await {
        Ok(outcome) => HttpResponse::Created().json(ReviewResponse {
            review: outcome.review,
            provider: outcome.provider,
            trust_refreshed: outcome.trust_refreshed,
        }),
        Err(e) => {
            tracing::warn!("Review rejected: {}", e);
            review_error_response(&e)
        }
    }
}

/// A provider's reviews, newest first
///
/// GET /api/v1/providers/{provider_id}/reviews?limit=20
async fn list_reviews(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<ReviewListQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(REVIEW_LIST_LIMIT);

    match state.reviews.recent_reviews(path.into_inner(), limit).await {
        Ok(reviews) => HttpResponse::Ok().json(ReviewListResponse {
            count: reviews.len(),
            reviews,
        }),
        Err(e) => review_error_response(&e),
    }
}

/// Sentiment counts over a provider's reviews
///
/// GET /api/v1/providers/{provider_id}/reviews/summary
async fn review_summary(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state.reviews.sentiment_summary(path.into_inner()).await {
        Ok(summary) => HttpResponse::Ok().json(summary),
        Err(e) => review_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{RecommendationConfig, SentimentClassifier};
    use crate::models::{
        Engagement, EngagementStatus, GeoPoint, Provider, RatingSummary, ReviewListResponse,
        ReviewResponse, Skill, TrustRecord, VerificationStatus,
    };
    use crate::routes::{configure_routes, AppState, SearchLimits};
    use crate::services::MemoryStore;
    use actix_web::{http::StatusCode, test, web, App};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    #[actix_web::test]
    async fn test_create_review_then_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let provider = Provider {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Cook".to_string(),
            skills: vec![Skill::Cooking],
            experience_years: 2,
            expected_price: 4500.0,
            location: GeoPoint::new(28.62, 77.21),
            rating: RatingSummary::default(),
            trust: TrustRecord::unassessed(),
            verification_status: VerificationStatus::Verified,
            is_active: true,
            created_at: Utc::now(),
        };
        let provider_id = provider.id;
        let requester_id = Uuid::new_v4();
        let engagement_id = Uuid::new_v4();
        store.insert_provider(provider);
        store.insert_engagement(Engagement {
            id: engagement_id,
            provider_id,
            requester_id,
            status: EngagementStatus::Completed,
        });

        let state = AppState::from_store(
            store,
            RecommendationConfig::default(),
            SentimentClassifier::default(),
            1.0,
            SearchLimits::default(),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let body = json!({
            "engagementId": engagement_id,
            "requesterId": requester_id,
            "rating": 5,
            "comment": "Excellent food, very clean kitchen"
        });
        let uri = format!("/api/v1/providers/{}/reviews", provider_id);

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri(&uri).set_json(&body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ReviewResponse = test::read_body_json(resp).await;
        assert_eq!(created.provider.map(|p| p.rating.count), Some(1));

        let resp = test::call_service(
            &app,
            test::TestRequest::post().uri(&uri).set_json(&body).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let listing: ReviewListResponse = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri(&uri).to_request(),
        )
        .await;
        assert_eq!(listing.count, 1);
        assert_eq!(listing.reviews[0].engagement_id, engagement_id);
    }

    #[actix_web::test]
    async fn test_list_reviews_unknown_provider() {
        let state = AppState::from_store(
            Arc::new(MemoryStore::new()),
            RecommendationConfig::default(),
            SentimentClassifier::default(),
            1.0,
            SearchLimits::default(),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/providers/{}/reviews?limit=5", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_invalid_rating_rejected() {
        let state = AppState::from_store(
            Arc::new(MemoryStore::new()),
            RecommendationConfig::default(),
            SentimentClassifier::default(),
            1.0,
            SearchLimits::default(),
        );
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/providers/{}/reviews", Uuid::new_v4()))
            .set_json(json!({
                "engagementId": Uuid::new_v4(),
                "requesterId": Uuid::new_v4(),
                "rating": 7
            }))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
