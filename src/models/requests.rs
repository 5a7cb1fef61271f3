use crate::error::MatchError;
use crate::models::domain::{
    GeoPoint, PriceRange, SearchPreference, Skill, SortKey, VerificationStatus,
    DEFAULT_PRICE_MAX,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Search query string
///
/// `GET /api/v1/providers/search?lat=..&lng=..&skills=cooking,cleaning&sortBy=rating`
///
/// Unknown parameters are rejected rather than silently defaulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchQuery {
    #[serde(alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: Option<f64>,
    pub max_distance: Option<f64>,
    /// Comma separated skill names
    pub skills: Option<String>,
    pub min_experience: Option<u32>,
    #[serde(alias = "minSalary")]
    pub min_price: Option<f64>,
    #[serde(alias = "maxSalary")]
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
    pub sort_by: Option<String>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Fill defaults and parse the enumerated fields
    ///
    /// Range checks happen in the engine; this only rejects what cannot be
    /// parsed at all.
    pub fn to_preferences(&self, default_max_distance_km: f64) -> Result<SearchPreference, MatchError> {
        let location = match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        };

        let skills = match &self.skills {
            Some(list) => parse_skills(list)?,
            None => Vec::new(),
        };

        let sort_by = match &self.sort_by {
            Some(key) if !key.trim().is_empty() => {
                key.parse::<SortKey>().map_err(MatchError::InvalidQuery)?
            }
            _ => SortKey::default(),
        };

        // One bound alone still defines a window
        let price_range = match (self.min_price, self.max_price) {
            (None, None) => None,
            (min, max) => Some(PriceRange {
                min: min.unwrap_or(0.0),
                max: max.unwrap_or(DEFAULT_PRICE_MAX),
            }),
        };

        Ok(SearchPreference {
            location,
            max_distance_km: self.max_distance.unwrap_or(default_max_distance_km),
            skills,
            min_experience: self.min_experience.unwrap_or(0),
            price_range,
            min_rating: self.min_rating.unwrap_or(0.0),
            sort_by,
        })
    }

    /// Requested limit, defaulted and capped
    pub fn resolve_limit(&self, default_limit: usize, max_limit: usize) -> usize {
        self.limit.unwrap_or(default_limit).min(max_limit)
    }
}

fn parse_skills(list: &str) -> Result<Vec<Skill>, MatchError> {
    let mut skills = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let skill = name.parse::<Skill>().map_err(MatchError::InvalidQuery)?;
        if !skills.contains(&skill) {
            skills.push(skill);
        }
    }
    Ok(skills)
}

/// Nearby listing query string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NearbyQuery {
    #[serde(alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: Option<f64>,
    pub max_distance: Option<f64>,
}

/// Review listing query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewListQuery {
    pub limit: Option<usize>,
}

/// Review submitted for a completed engagement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub engagement_id: Uuid,
    pub requester_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Administrator verification decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyProviderRequest {
    pub status: VerificationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}
