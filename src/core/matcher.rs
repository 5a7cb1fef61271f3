use crate::core::{
    distance::{calculate_bounding_box, distance_between},
    filters::{filter_available, matches_profile_filters, meets_rating_floor},
    scoring::{calculate_recommendation_score, round_score, DEFAULT_PRICE_TOLERANCE},
};
use crate::error::MatchError;
use crate::models::{
    CandidateQuery, GeoPoint, Provider, ProviderId, RecommendationWeights, ScoredProvider,
    SearchPreference, SortKey,
};
use crate::services::traits::{bounded, CandidateSource, EngagementSource};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum number of providers returned by a nearby listing
pub const NEARBY_LIMIT: usize = 20;

/// Result of the matching process
#[derive(Debug)]
pub struct MatchResult {
    pub matches: Vec<ScoredProvider>,
    pub total_candidates: usize,
    pub used_fallback: bool,
}

impl MatchResult {
    fn empty() -> Self {
        Self {
            matches: Vec::new(),
            total_candidates: 0,
            used_fallback: false,
        }
    }
}

/// Tunables of the recommendation engine
#[derive(Debug, Clone, Copy)]
pub struct RecommendationConfig {
    pub weights: RecommendationWeights,
    pub overfetch_factor: usize,
    pub price_tolerance: f64,
    pub collaborator_timeout: Duration,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            weights: RecommendationWeights::default(),
            overfetch_factor: 2,
            price_tolerance: DEFAULT_PRICE_TOLERANCE,
            collaborator_timeout: Duration::from_secs(2),
        }
    }
}

/// Search orchestrator
///
/// # Pipeline Stages
/// 1. Candidate retrieval over the hard filters (proximity index, or full scan)
/// 2. Availability filtering against open engagements
/// 3. Radius cutoff and scoring
/// 4. Rating floor, sorting and truncation
///
/// Searches share nothing mutable; each works on its own candidate snapshot.
pub struct RecommendationEngine {
    candidates: Arc<dyn CandidateSource>,
    engagements: Arc<dyn EngagementSource>,
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(
        candidates: Arc<dyn CandidateSource>,
        engagements: Arc<dyn EngagementSource>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            candidates,
            engagements,
            config,
        }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    /// Find and rank providers for a search
    ///
    /// # Arguments
    /// * `preferences` - The requester's search preferences
    /// * `limit` - Maximum number of results to return
    ///
    /// # Errors
    /// * `InvalidQuery` for missing, out-of-domain or contradictory input
    /// * `CollaboratorUnavailable` when neither retrieval path nor the
    ///   engagement state can be read
    pub async fn search(
        &self,
        preferences: &SearchPreference,
        limit: usize,
    ) -> Result<MatchResult, MatchError> {
        let location = validate_preferences(preferences)?;

        // (0, 0) means "no location": fail closed instead of ranking the world
        if location.is_unset() || limit == 0 {
            debug!("Search without usable location or with zero limit, returning nothing");
            return Ok(MatchResult::empty());
        }

        let query = self.candidate_query(preferences, location, limit);
        let timeout = self.config.collaborator_timeout;

        let (candidates, used_fallback) =
            match bounded(timeout, "proximity retrieval", self.candidates.near(&query)).await {
                Ok(candidates) => (candidates, false),
                Err(e) => {
                    warn!("Proximity retrieval failed ({}), falling back to full scan", e);
                    let scanned = bounded(timeout, "candidate scan", self.candidates.scan(&query))
                        .await
                        .map_err(MatchError::CollaboratorUnavailable)?;
                    (scanned, true)
                }
            };

        let open_engagements = bounded(
            timeout,
            "engagement state",
            self.engagements.open_engagement_providers(),
        )
        .await
        .map_err(MatchError::CollaboratorUnavailable)?;

        let total_candidates = candidates.len();
        let matches = self.rank(preferences, location, candidates, &open_engagements, limit);

        info!(
            "Search at ({:.4}, {:.4}) within {}km: {} matches from {} candidates{}",
            location.latitude,
            location.longitude,
            preferences.max_distance_km,
            matches.len(),
            total_candidates,
            if used_fallback { " (full scan)" } else { "" }
        );

        Ok(MatchResult {
            matches,
            total_candidates,
            used_fallback,
        })
    }

    /// Score, filter, sort and truncate a candidate snapshot
    pub fn rank(
        &self,
        preferences: &SearchPreference,
        location: GeoPoint,
        candidates: Vec<Provider>,
        open_engagements: &HashSet<ProviderId>,
        limit: usize,
    ) -> Vec<ScoredProvider> {
        let query = self.candidate_query(preferences, location, limit);

        let mut scored: Vec<ScoredProvider> = filter_available(candidates, open_engagements)
            .into_iter()
            // Retrieval may be loose (full scan); re-apply the profile filters
            .filter(|provider| matches_profile_filters(provider, &query))
            .filter(|provider| meets_rating_floor(provider, preferences.min_rating))
            .filter_map(|provider| {
                let distance_km = distance_between(&location, &provider.location);
                let breakdown = calculate_recommendation_score(
                    &provider,
                    preferences,
                    distance_km,
                    &self.config.weights,
                    self.config.price_tolerance,
                )?;

                Some(ScoredProvider {
                    provider,
                    recommendation_score: round_score(breakdown.total()),
                    distance_km,
                })
            })
            .collect();

        scored.sort_by(|a, b| compare_for(preferences.sort_by, a, b));
        scored.truncate(limit);

        scored
    }

    /// Active, verified and unengaged providers within the radius, nearest first
    pub async fn nearby(
        &self,
        location: GeoPoint,
        max_distance_km: f64,
    ) -> Result<Vec<ScoredProvider>, MatchError> {
        let preferences = SearchPreference {
            location: Some(location),
            max_distance_km,
            sort_by: SortKey::Distance,
            ..SearchPreference::default()
        };

        let result = self.search(&preferences, NEARBY_LIMIT).await?;
        Ok(result.matches)
    }

    fn candidate_query(
        &self,
        preferences: &SearchPreference,
        location: GeoPoint,
        limit: usize,
    ) -> CandidateQuery {
        CandidateQuery {
            center: location,
            bounding_box: calculate_bounding_box(
                location.latitude,
                location.longitude,
                preferences.max_distance_km,
            ),
            max_distance_km: preferences.max_distance_km,
            skills: preferences.skills.clone(),
            min_experience: preferences.min_experience,
            price_range: preferences.price_range,
            limit: limit.saturating_mul(self.config.overfetch_factor.max(1)),
        }
    }
}

/// Reject absent, out-of-domain and contradictory preferences
pub fn validate_preferences(preferences: &SearchPreference) -> Result<GeoPoint, MatchError> {
    let location = preferences
        .location
        .ok_or_else(|| MatchError::invalid_query("location (lat, lng) is required"))?;

    if !location.is_valid() {
        return Err(MatchError::invalid_query(format!(
            "coordinates out of range: ({}, {})",
            location.latitude, location.longitude
        )));
    }

    if !preferences.max_distance_km.is_finite() || preferences.max_distance_km <= 0.0 {
        return Err(MatchError::invalid_query("maxDistance must be a positive number of km"));
    }

    if !(0.0..=5.0).contains(&preferences.min_rating) {
        return Err(MatchError::invalid_query("minRating must be between 0 and 5"));
    }

    if let Some(range) = &preferences.price_range {
        if !range.min.is_finite() || !range.max.is_finite() || range.min < 0.0 {
            return Err(MatchError::invalid_query("price bounds must be non-negative numbers"));
        }
        if range.min > range.max {
            return Err(MatchError::invalid_query("minPrice is greater than maxPrice"));
        }
    }

    Ok(location)
}

/// Ties on the reported (rounded) score go to trust, then to the provider id
fn compare_for(sort_by: SortKey, a: &ScoredProvider, b: &ScoredProvider) -> Ordering {
    let primary = match sort_by {
        SortKey::Recommendation => b
            .recommendation_score
            .total_cmp(&a.recommendation_score)
            .then_with(|| b.provider.trust.score.total_cmp(&a.provider.trust.score)),
        SortKey::Rating => b.provider.rating.average.total_cmp(&a.provider.rating.average),
        SortKey::Price => a.provider.expected_price.total_cmp(&b.provider.expected_price),
        SortKey::Distance => a.distance_km.total_cmp(&b.distance_km),
    };

    primary.then_with(|| a.provider.id.cmp(&b.provider.id))
}
