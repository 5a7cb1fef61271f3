use crate::models::{CandidateQuery, Provider, ProviderId, Skill, VerificationStatus};
use std::collections::HashSet;

/// Check if a provider is bookable right now
///
/// Active, admin-verified, and without a pending or accepted engagement.
/// Evaluated per search because engagement state changes constantly.
#[inline]
pub fn is_available(provider: &Provider, open_engagements: &HashSet<ProviderId>) -> bool {
    provider.is_active
        && provider.verification_status == VerificationStatus::Verified
        && !open_engagements.contains(&provider.id)
}

/// Keep only the providers that are bookable right now
pub fn filter_available(
    candidates: Vec<Provider>,
    open_engagements: &HashSet<ProviderId>,
) -> Vec<Provider> {
    candidates
        .into_iter()
        .filter(|provider| is_available(provider, open_engagements))
        .collect()
}

/// Requested skills intersect the provider's skills; no request means no filter
#[inline]
pub fn matches_skills(provider_skills: &[Skill], requested: &[Skill]) -> bool {
    requested.is_empty() || requested.iter().any(|skill| provider_skills.contains(skill))
}

/// Check the non-geographic hard filters of a candidate query
///
/// Skills, experience floor and price window. Location is checked separately
/// so the full-scan fallback can share this.
#[inline]
pub fn matches_profile_filters(provider: &Provider, query: &CandidateQuery) -> bool {
    if !matches_skills(&provider.skills, &query.skills) {
        return false;
    }

    if provider.experience_years < query.min_experience {
        return false;
    }

    if let Some(range) = &query.price_range {
        if !range.contains(provider.expected_price) {
            return false;
        }
    }

    true
}

/// Check if a provider passes every hard filter including the bounding box
#[inline]
pub fn matches_query_constraints(provider: &Provider, query: &CandidateQuery) -> bool {
    super::distance::is_within_bounding_box(
        provider.location.latitude,
        provider.location.longitude,
        &query.bounding_box,
    ) && matches_profile_filters(provider, query)
}

#[inline]
pub fn meets_rating_floor(provider: &Provider, min_rating: f64) -> bool {
    provider.rating.average >= min_rating
}
