//! Workmatch - matching and trust engine for a service-provider marketplace
//!
//! Ranks verified, available domestic-service providers for a requester's
//! location and preferences, and maintains each provider's trust score from
//! verification state, review sentiment, ratings, experience and
//! responsiveness.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    distance::{calculate_bounding_box, haversine_distance},
    RecommendationEngine, SentimentClassifier, TrustScoreEngine,
};
pub use error::{MatchError, StoreError};
pub use models::{Provider, ScoredProvider, SearchPreference, TrustRecord, TrustStatus};
