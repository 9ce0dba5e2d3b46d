use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::models::job::{format_usd, LocationType};

/// A candidate's persisted profile and preference state.
///
/// Mutated only through the profile store: preference deltas, accept and decline.
/// `min_salary > max_salary` is legal and reads as "no upper bound".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub years_experience: u32,
    /// Most recently stated first.
    #[serde(default)]
    pub preferred_titles: Vec<String>,
    /// Empty means no constraint.
    #[serde(default)]
    pub preferred_location_types: Vec<LocationType>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(default)]
    pub min_salary: u64,
    #[serde(default)]
    pub max_salary: Option<u64>,
    #[serde(default)]
    pub preferred_industries: Vec<String>,
    #[serde(default)]
    pub declined_job_ids: Vec<String>,
    #[serde(default)]
    pub accepted_job_id: Option<String>,
}

impl CandidateProfile {
    pub fn has_declined(&self, job_id: &str) -> bool {
        self.declined_job_ids.iter().any(|id| id == job_id)
    }

    /// Upper salary bound, ignoring an inverted pair.
    pub fn effective_max_salary(&self) -> Option<u64> {
        self.max_salary.filter(|max| *max >= self.min_salary)
    }

    /// Text submitted to the embedding collaborator for this candidate.
    pub fn to_embedding_text(&self) -> String {
        let titles = if self.preferred_titles.is_empty() {
            "Open to opportunities".to_string()
        } else {
            self.preferred_titles.join(", ")
        };
        let locations = if self.preferred_location_types.is_empty() {
            "Flexible".to_string()
        } else {
            self.preferred_location_types
                .iter()
                .map(LocationType::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let industries = if self.preferred_industries.is_empty() {
            "Open to all industries".to_string()
        } else {
            self.preferred_industries.join(", ")
        };

        format!(
            "Professional Summary: {}\nSkills: {}\nYears of Experience: {}\nCurrent Title: {}\nLooking for: {}\nPreferred Work Style: {}\nMinimum Salary: {}\nPreferred Industries: {}",
            self.summary,
            self.skills.join(", "),
            self.years_experience,
            self.current_title.as_deref().unwrap_or("Not specified"),
            titles,
            locations,
            format_usd(self.min_salary),
            industries
        )
    }

    /// Hash of every field that influences matching. Used to key cached search results
    /// so that a preference change or a decline never serves a stale result.
    pub fn match_fingerprint(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.skills.hash(&mut hasher);
        self.preferred_titles.hash(&mut hasher);
        self.preferred_location_types.hash(&mut hasher);
        self.preferred_locations.hash(&mut hasher);
        self.min_salary.hash(&mut hasher);
        self.max_salary.hash(&mut hasher);
        self.preferred_industries.hash(&mut hasher);
        self.declined_job_ids.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_salary_pair_means_no_upper_bound() {
        let profile = CandidateProfile {
            min_salary: 90_000,
            max_salary: Some(50_000),
            ..CandidateProfile::default()
        };
        assert_eq!(profile.effective_max_salary(), None);

        let profile = CandidateProfile {
            min_salary: 40_000,
            max_salary: Some(50_000),
            ..CandidateProfile::default()
        };
        assert_eq!(profile.effective_max_salary(), Some(50_000));
    }

    #[test]
    fn test_fingerprint_changes_with_declines() {
        let mut profile = CandidateProfile {
            id: "c1".to_string(),
            ..CandidateProfile::default()
        };
        let before = profile.match_fingerprint();
        profile.declined_job_ids.push("job-1".to_string());
        assert_ne!(before, profile.match_fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_identity_fields() {
        let a = CandidateProfile {
            id: "c1".to_string(),
            name: "Ana".to_string(),
            ..CandidateProfile::default()
        };
        let b = CandidateProfile {
            id: "c1".to_string(),
            name: "Ana Maria".to_string(),
            ..CandidateProfile::default()
        };
        assert_eq!(a.match_fingerprint(), b.match_fingerprint());
    }

    #[test]
    fn test_embedding_text_uses_defaults_when_unset() {
        let text = CandidateProfile::default().to_embedding_text();
        assert!(text.contains("Looking for: Open to opportunities"));
        assert!(text.contains("Preferred Work Style: Flexible"));
        assert!(text.contains("Minimum Salary: $0"));
    }
}
