// Route exports
pub mod providers;
pub mod reviews;
pub mod search;

use crate::core::{RecommendationConfig, RecommendationEngine, SentimentClassifier, TrustScoreEngine};
use crate::error::MatchError;
use crate::models::{ErrorResponse, DEFAULT_MAX_DISTANCE_KM};
use crate::services::{
    CandidateSource, EngagementSource, ProviderStore, ReviewError, ReviewService, ReviewStore,
    VerificationError, VerificationService, VerificationSource,
};
use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;

/// Result size limits applied by the host layer
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub default_limit: usize,
    pub max_limit: usize,
    pub default_max_distance_km: f64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 50,
            default_max_distance_km: DEFAULT_MAX_DISTANCE_KM,
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProviderStore>,
    pub engine: Arc<RecommendationEngine>,
    pub trust: Arc<TrustScoreEngine>,
    pub reviews: Arc<ReviewService>,
    pub verification: Arc<VerificationService>,
    pub limits: SearchLimits,
}

impl AppState {
    /// Wire every engine and workflow to one store implementing all collaborators
    pub fn from_store<S>(
        store: Arc<S>,
        recommendation: RecommendationConfig,
        classifier: SentimentClassifier,
        default_response_rate: f64,
        limits: SearchLimits,
    ) -> Self
    where
        S: CandidateSource
            + EngagementSource
            + ProviderStore
            + ReviewStore
            + VerificationSource
            + 'static,
    {
        let timeout = recommendation.collaborator_timeout;

        let trust = Arc::new(
            TrustScoreEngine::new(store.clone(), store.clone(), store.clone(), timeout)
                .with_default_response_rate(default_response_rate),
        );
        let engine = Arc::new(RecommendationEngine::new(store.clone(), store.clone(), recommendation));
        let reviews = Arc::new(ReviewService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            trust.clone(),
            Arc::new(classifier),
            timeout,
        ));
        let verification = Arc::new(VerificationService::new(
            store.clone(),
            store.clone(),
            trust.clone(),
            timeout,
        ));

        Self {
            store,
            engine,
            trust,
            reviews,
            verification,
            limits,
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(search::configure)
            .configure(reviews::configure)
            .configure(providers::configure),
    );
}

pub(crate) fn error_response(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

pub(crate) fn match_error_response(err: &MatchError) -> HttpResponse {
    let (status, error) = match err {
        MatchError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "Invalid query"),
        MatchError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, "Provider not found"),
        MatchError::CollaboratorUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "Collaborator unavailable")
        }
        MatchError::TrustNotPersisted { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "Trust record not persisted")
        }
    };

    error_response(status, error, err.to_string())
}

pub(crate) fn review_error_response(err: &ReviewError) -> HttpResponse {
    let (status, error) = match err {
        ReviewError::InvalidRating(_) | ReviewError::ProviderMismatch { .. } => {
            (StatusCode::BAD_REQUEST, "Invalid review")
        }
        ReviewError::NotParticipant(_) => (StatusCode::FORBIDDEN, "Not a participant"),
        ReviewError::EngagementNotFound(_) => (StatusCode::NOT_FOUND, "Engagement not found"),
        ReviewError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, "Provider not found"),
        ReviewError::EngagementNotCompleted(..) => (StatusCode::CONFLICT, "Engagement not completed"),
        ReviewError::DuplicateReview(_) => (StatusCode::CONFLICT, "Duplicate review"),
        ReviewError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable"),
    };

    error_response(status, error, err.to_string())
}

pub(crate) fn verification_error_response(err: &VerificationError) -> HttpResponse {
    let (status, error) = match err {
        VerificationError::InvalidDecision(_) => (StatusCode::BAD_REQUEST, "Invalid decision"),
        VerificationError::ProviderNotFound(_) => (StatusCode::NOT_FOUND, "Provider not found"),
        VerificationError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable"),
    };

    error_response(status, error, err.to_string())
}
