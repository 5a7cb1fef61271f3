use crate::models::{
    HealthResponse, ProviderResponse, SetActiveRequest, TrustResponse, VerifyProviderRequest,
};
use crate::routes::{match_error_response, verification_error_response, AppState};
use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;

/// Configure provider administration routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route(
            "/admin/providers/{provider_id}/verification",
            web::put().to(verify_provider),
        )
        .route("/providers/{provider_id}/active", web::put().to(set_active))
        .route(
            "/providers/{provider_id}/trust/recompute",
            web::post().to(recompute_trust),
        );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Apply an administrator verification decision
///
/// PUT /api/v1/admin/providers/{provider_id}/verification
///
/// Request body:
/// ```json
/// { "status": "verified" }
/// ```
async fn verify_provider(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<VerifyProviderRequest>,
) -> impl Responder {
    match state
        .verification
        .apply_verification(path.into_inner(), req.status)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(ProviderResponse {
            provider: outcome.provider,
            trust_refreshed: outcome.trust_refreshed,
        }),
        Err(e) => {
            tracing::warn!("Verification decision rejected: {}", e);
            verification_error_response(&e)
        }
    }
}

/// Soft activate or deactivate a provider
///
/// PUT /api/v1/providers/{provider_id}/active
async fn set_active(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<SetActiveRequest>,
) -> impl Responder {
    match state.verification.set_active(path.into_inner(), req.is_active).await {
        Ok(provider) => HttpResponse::Ok().json(ProviderResponse {
            provider,
            trust_refreshed: false,
        }),
        Err(e) => verification_error_response(&e),
    }
}

/// Recompute a provider's trust record on demand
///
/// POST /api/v1/providers/{provider_id}/trust/recompute
async fn recompute_trust(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    let provider_id = path.into_inner();

    match state.trust.recompute(provider_id).await {
        Ok(trust) => HttpResponse::Ok().json(TrustResponse { provider_id, trust }),
        Err(e) => {
            tracing::error!("Trust recompute for {} failed: {}", provider_id, e);
            match_error_response(&e)
        }
    }
}
