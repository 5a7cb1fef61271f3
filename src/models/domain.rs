use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a provider's matching profile
pub type ProviderId = Uuid;

/// Enumerated service categories a provider can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Cleaning,
    Cooking,
    Babysitting,
    ElderlyCare,
}

impl Skill {
    pub const ALL: [Skill; 4] = [
        Skill::Cleaning,
        Skill::Cooking,
        Skill::Babysitting,
        Skill::ElderlyCare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Skill::Cleaning => "cleaning",
            Skill::Cooking => "cooking",
            Skill::Babysitting => "babysitting",
            Skill::ElderlyCare => "elderly_care",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Skill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Skill::ALL
            .into_iter()
            .find(|skill| skill.as_str() == normalized)
            .ok_or_else(|| format!("unknown skill '{}'", s.trim()))
    }
}

/// WGS84 point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Both coordinates are finite and inside the WGS84 domain
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// (0, 0) is what clients send when they have no location
    pub fn is_unset(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// Administrative verification gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "verification_status", rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

impl Default for VerificationStatus {
    fn default() -> Self {
        VerificationStatus::Pending
    }
}

/// Trust status label derived from the trust score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trust_status")]
pub enum TrustStatus {
    Trusted,
    Verified,
    #[serde(rename = "Needs Review")]
    #[sqlx(rename = "Needs Review")]
    NeedsReview,
}

/// Coarse polarity of a review comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sentiment", rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Lifecycle of an engagement (booking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "engagement_status", rename_all = "lowercase")]
pub enum EngagementStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl EngagementStatus {
    /// Pending and accepted engagements make the provider unavailable
    pub fn is_open(&self) -> bool {
        matches!(self, EngagementStatus::Pending | EngagementStatus::Accepted)
    }
}

/// Running rating average and count
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u32,
}

impl RatingSummary {
    /// Fold one more rating into the running mean
    pub fn record(&mut self, rating: u8) {
        let total = self.average * self.count as f64 + rating as f64;
        self.count += 1;
        self.average = (total / self.count as f64).clamp(0.0, 5.0);
    }
}

/// Stored trust score and label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRecord {
    pub score: f64,
    pub status: TrustStatus,
    pub last_updated: DateTime<Utc>,
}

impl TrustRecord {
    /// Record for a provider that has never been assessed
    pub fn unassessed() -> Self {
        Self {
            score: 0.0,
            status: TrustStatus::NeedsReview,
            last_updated: Utc::now(),
        }
    }
}

/// Normalized trust sub-scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustFactors {
    pub document_verification: f64,
    pub review_sentiment: f64,
    pub rating_average: f64,
    pub experience: f64,
    pub response_rate: f64,
}

/// A worker's public matching profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    pub user_id: Uuid,
    pub name: String,
    pub skills: Vec<Skill>,
    pub experience_years: u32,
    pub expected_price: f64,
    pub location: GeoPoint,
    pub rating: RatingSummary,
    pub trust: TrustRecord,
    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// A review attesting one completed engagement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub provider_id: ProviderId,
    pub engagement_id: Uuid,
    pub requester_id: Uuid,
    pub rating: u8,
    pub comment: Option<String>,
    pub sentiment: Sentiment,
    pub created_at: DateTime<Utc>,
}

/// Booking state as seen by matching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub id: Uuid,
    pub provider_id: ProviderId,
    pub requester_id: Uuid,
    pub status: EngagementStatus,
}

/// Verification inputs consumed by the trust engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationState {
    pub status: VerificationStatus,
    pub identity_document_verified: bool,
    pub tax_document_verified: bool,
}

impl VerificationState {
    /// Both required identity documents are marked verified
    pub fn documents_verified(&self) -> bool {
        self.identity_document_verified && self.tax_document_verified
    }
}

/// Sentiment label counts over a provider's reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentTally {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentTally {
    pub fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.positive + self.neutral + self.negative
    }
}

impl FromIterator<Sentiment> for SentimentTally {
    fn from_iter<I: IntoIterator<Item = Sentiment>>(iter: I) -> Self {
        let mut tally = SentimentTally::default();
        for sentiment in iter {
            tally.add(sentiment);
        }
        tally
    }
}

/// Inclusive price window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }

    /// Distance from `price` to the nearer bound, zero inside the window
    pub fn distance_outside(&self, price: f64) -> f64 {
        if self.contains(price) {
            0.0
        } else {
            (price - self.min).abs().min((price - self.max).abs())
        }
    }
}

/// Ordering applied to search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Recommendation,
    Rating,
    #[serde(alias = "salary")]
    Price,
    Distance,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recommendation" => Ok(SortKey::Recommendation),
            "rating" => Ok(SortKey::Rating),
            "price" | "salary" => Ok(SortKey::Price),
            "distance" => Ok(SortKey::Distance),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

/// Requester's search preferences, fully enumerated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPreference {
    pub location: Option<GeoPoint>,
    pub max_distance_km: f64,
    pub skills: Vec<Skill>,
    pub min_experience: u32,
    pub price_range: Option<PriceRange>,
    pub min_rating: f64,
    pub sort_by: SortKey,
}

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 10.0;
pub const DEFAULT_PRICE_MAX: f64 = 100_000.0;

impl Default for SearchPreference {
    fn default() -> Self {
        Self {
            location: None,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            skills: Vec::new(),
            min_experience: 0,
            price_range: None,
            min_rating: 0.0,
            sort_by: SortKey::Recommendation,
        }
    }
}

/// Ranked search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProvider {
    #[serde(flatten)]
    pub provider: Provider,
    pub recommendation_score: f64,
    pub distance_km: f64,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Hard filters handed to candidate retrieval
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub center: GeoPoint,
    pub bounding_box: BoundingBox,
    pub max_distance_km: f64,
    pub skills: Vec<Skill>,
    pub min_experience: u32,
    pub price_range: Option<PriceRange>,
    pub limit: usize,
}

/// Recommendation weights in points; they must add up to 100
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationWeights {
    pub location: f64,
    pub skills: f64,
    pub price: f64,
    pub rating: f64,
    pub trust: f64,
}

impl RecommendationWeights {
    pub fn total(&self) -> f64 {
        self.location + self.skills + self.price + self.rating + self.trust
    }
}

impl Default for RecommendationWeights {
    fn default() -> Self {
        Self {
            location: 40.0,
            skills: 25.0,
            price: 15.0,
            rating: 10.0,
            trust: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut rating = RatingSummary::default();
        rating.record(5);
        rating.record(4);
        rating.record(3);

        assert_eq!(rating.count, 3);
        assert!((rating.average - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_skill_parsing() {
        assert_eq!("Elderly_Care".parse::<Skill>(), Ok(Skill::ElderlyCare));
        assert_eq!(" cooking ".parse::<Skill>(), Ok(Skill::Cooking));
        assert!("gardening".parse::<Skill>().is_err());
    }

    #[test]
    fn test_sort_key_salary_alias() {
        assert_eq!("salary".parse::<SortKey>(), Ok(SortKey::Price));
        let parsed: SortKey = serde_json::from_str("\"salary\"").unwrap();
        assert_eq!(parsed, SortKey::Price);
    }

    #[test]
    fn test_trust_status_wire_name() {
        let json = serde_json::to_string(&TrustStatus::NeedsReview).unwrap();
        assert_eq!(json, "\"Needs Review\"");
    }

    #[test]
    fn test_price_distance_outside() {
        let range = PriceRange { min: 5000.0, max: 8000.0 };
        assert_eq!(range.distance_outside(6000.0), 0.0);
        assert_eq!(range.distance_outside(9000.0), 1000.0);
        assert_eq!(range.distance_outside(4500.0), 500.0);
    }

    #[test]
    fn test_geo_point_domain() {
        assert!(GeoPoint::new(28.6139, 77.2090).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(GeoPoint::new(0.0, 0.0).is_unset());
    }

    #[test]
    fn test_default_weights_sum_to_100() {
        assert_eq!(RecommendationWeights::default().total(), 100.0);
    }
}
