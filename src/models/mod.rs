// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, CandidateQuery, Engagement, EngagementStatus, GeoPoint, PriceRange, Provider,
    ProviderId, RatingSummary, RecommendationWeights, Review, ScoredProvider, SearchPreference,
    Sentiment, SentimentTally, Skill, SortKey, TrustFactors, TrustRecord, TrustStatus,
    VerificationState, VerificationStatus, DEFAULT_MAX_DISTANCE_KM, DEFAULT_PRICE_MAX,
};
pub use requests::{
    CreateReviewRequest, NearbyQuery, ReviewListQuery, SearchQuery, SetActiveRequest,
    VerifyProviderRequest,
};
pub use responses::{
    ErrorResponse, HealthResponse, ProviderResponse, ReviewListResponse, ReviewResponse,
    SearchResponse, TrustResponse,
};
