use crate::error::MatchError;
use crate::models::{GeoPoint, NearbyQuery, SearchQuery, SearchResponse};
use crate::routes::{match_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};

/// Configure search routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/providers/search", web::get().to(search_providers))
        .route("/providers/nearby", web::get().to(nearby_providers));
}

/// Ranked provider search
///
/// GET /api/v1/providers/search?lat=28.61&lng=77.20&maxDistance=10&skills=cooking&sortBy=recommendation
async fn search_providers(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> impl Responder {
    let preferences = match query.to_preferences(state.limits.default_max_distance_km) {
        Ok(preferences) => preferences,
        Err(e) => {
            tracing::info!("Rejected search query: {}", e);
            return match_error_response(&e);
        }
    };
    let limit = query.resolve_limit(state.limits.default_limit, state.limits.max_limit);

    match state.engine.search(&preferences, limit).await {
        Ok(result) => HttpResponse::Ok().json(SearchResponse {
            count: result.matches.len(),
            total_candidates: result.total_candidates,
            providers: result.matches,
        }),
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            match_error_response(&e)
        }
    }
}

/// Providers around a point, nearest first
///
/// GET /api/v1/providers/nearby?lat=28.61&lng=77.20&maxDistance=5
async fn nearby_providers(
    state: web::Data<AppState>,
    query: web::Query<NearbyQuery>,
) -> impl Responder {
    let location = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng),
        _ => {
            return match_error_response(&MatchError::invalid_query(
                "location (lat, lng) is required",
            ))
        }
    };
    let max_distance = query
        .max_distance
        .unwrap_or(state.limits.default_max_distance_km);

    match state.engine.nearby(location, max_distance).await {
        Ok(providers) => HttpResponse::Ok().json(SearchResponse {
            count: providers.len(),
            total_candidates: providers.len(),
            providers,
        }),
        Err(e) => {
            tracing::error!("Nearby listing failed: {}", e);
            match_error_response(&e)
        }
    }
}
