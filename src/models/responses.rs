use crate::models::domain::{Provider, ProviderId, Review, ScoredProvider, TrustRecord};
use serde::{Deserialize, Serialize};

/// Response for the search and nearby endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub count: usize,
    pub total_candidates: usize,
    pub providers: Vec<ScoredProvider>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Provider after an administrative change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub provider: Provider,
    pub trust_refreshed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub review: Review,
    /// Absent when the provider could not be re-read after the review was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    pub trust_refreshed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListResponse {
    pub count: usize,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustResponse {
    pub provider_id: ProviderId,
    pub trust: TrustRecord,
}
