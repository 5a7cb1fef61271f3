// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod locks;
pub mod matcher;
pub mod scoring;
pub mod sentiment;
pub mod trust;

pub use distance::{calculate_bounding_box, distance_between, haversine_distance, is_within_bounding_box};
pub use filters::{filter_available, is_available, matches_profile_filters, matches_query_constraints};
pub use matcher::{validate_preferences, MatchResult, RecommendationConfig, RecommendationEngine, NEARBY_LIMIT};
pub use scoring::{calculate_recommendation_score, round_score, ScoreBreakdown};
pub use sentiment::{classify_sentiment, SentimentClassifier};
pub use trust::{assess, RefreshSummary, TrustAssessment, TrustInputs, TrustScoreEngine};
