use crate::models::{PriceRange, Provider, RecommendationWeights, SearchPreference, Skill};

/// Maximum recommendation score
pub const MAX_SCORE: f64 = 100.0;

/// Default distance outside the price window at which price fit reaches zero
pub const DEFAULT_PRICE_TOLERANCE: f64 = 3000.0;

/// Per-factor points of a recommendation score
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreBreakdown {
    pub location: f64,
    pub skills: f64,
    pub price: f64,
    pub rating: f64,
    pub trust: f64,
}

impl ScoreBreakdown {
    /// Sum of all factors, capped at 100
    pub fn total(&self) -> f64 {
        (self.location + self.skills + self.price + self.rating + self.trust).clamp(0.0, MAX_SCORE)
    }
}

/// Calculate the recommendation score (0-100) of a provider for a search
///
/// Scoring formula with default weights:
/// score = (
///     40 * (1 - distance / maxDistance) +   # dropped beyond maxDistance
///     25 * matchedSkills / requestedSkills +  # full points with no skill request
///     15 * priceFit +                        # linear decay outside the window
///     10 * ratingAverage / 5 +
///     10 * trustScore / 100
/// )
///
/// # Returns
/// `None` when the provider lies beyond the requested radius
pub fn calculate_recommendation_score(
    provider: &Provider,
    preferences: &SearchPreference,
    distance_km: f64,
    weights: &RecommendationWeights,
    price_tolerance: f64,
) -> Option<ScoreBreakdown> {
    let location = location_score(distance_km, preferences.max_distance_km, weights.location)?;

    Some(ScoreBreakdown {
        location,
        skills: skill_score(&provider.skills, &preferences.skills, weights.skills),
        price: price_score(
            provider.expected_price,
            preferences.price_range.as_ref(),
            weights.price,
            price_tolerance,
        ),
        rating: rating_score(provider.rating.average, weights.rating),
        trust: trust_points(provider.trust.score, weights.trust),
    })
}

/// Location points, `None` beyond the radius (hard cutoff)
#[inline]
pub fn location_score(distance_km: f64, max_distance_km: f64, weight: f64) -> Option<f64> {
    if !distance_km.is_finite() || distance_km > max_distance_km || max_distance_km <= 0.0 {
        return None;
    }

    Some(weight * (1.0 - distance_km / max_distance_km))
}

/// Skill points, proportional to the share of requested skills offered
#[inline]
pub fn skill_score(provider_skills: &[Skill], requested: &[Skill], weight: f64) -> f64 {
    if requested.is_empty() {
        return weight;
    }

    let matching = requested
        .iter()
        .filter(|skill| provider_skills.contains(skill))
        .count();

    weight * (matching as f64 / requested.len() as f64)
}

/// Price points: full inside the window, linear decay to zero at `tolerance` outside
#[inline]
pub fn price_score(price: f64, range: Option<&PriceRange>, weight: f64, tolerance: f64) -> f64 {
    let Some(range) = range else {
        return weight;
    };

    if range.contains(price) {
        return weight;
    }

    if tolerance <= 0.0 {
        return 0.0;
    }

    let fit = 1.0 - range.distance_outside(price) / tolerance;
    weight * fit.max(0.0)
}

#[inline]
pub fn rating_score(rating_average: f64, weight: f64) -> f64 {
    weight * (rating_average / 5.0).clamp(0.0, 1.0)
}

#[inline]
pub fn trust_points(trust_score: f64, weight: f64) -> f64 {
    weight * (trust_score / 100.0).clamp(0.0, 1.0)
}

/// Round a score to two decimals for reporting
#[inline]
pub fn round_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}
