//! Candidate preferences: the closed delta type applied to profiles, the explicit
//! (tool/API driven) update path, and the free-text extractor.

pub mod extractor;
pub mod vocabulary;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateProfile;
use crate::models::job::LocationType;

/// Identifies one preference field of a `CandidateProfile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceField {
    MinSalary,
    MaxSalary,
    PreferredLocationTypes,
    PreferredTitles,
    PreferredLocations,
    PreferredIndustries,
    Skills,
}

impl PreferenceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceField::MinSalary => "min_salary",
            PreferenceField::MaxSalary => "max_salary",
            PreferenceField::PreferredLocationTypes => "preferred_location_types",
            PreferenceField::PreferredTitles => "preferred_titles",
            PreferenceField::PreferredLocations => "preferred_locations",
            PreferenceField::PreferredIndustries => "preferred_industries",
            PreferenceField::Skills => "skills",
        }
    }
}

impl fmt::Display for PreferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value rejected at the preference boundary. The field is dropped; other fields
/// from the same message or request still apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidPreferenceValue {
    pub field: PreferenceField,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for InvalidPreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = '{}': {}", self.field, self.value, self.reason)
    }
}

/// A set of preference changes, applied to one profile as a unit.
///
/// Scalars overwrite, `preferred_location_types` replaces the whole set, every other
/// list is append-if-absent (case-insensitive).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_salary: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_location_types: Option<Vec<LocationType>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_titles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_industries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

impl PreferenceDelta {
    pub fn is_empty(&self) -> bool {
        self.min_salary.is_none()
            && self.max_salary.is_none()
            && self.preferred_location_types.is_none()
            && self.preferred_titles.is_empty()
            && self.preferred_locations.is_empty()
            && self.preferred_industries.is_empty()
            && self.skills.is_empty()
    }

    /// Applies the delta and returns the fields whose value actually changed.
    pub fn apply(&self, profile: &mut CandidateProfile) -> BTreeSet<PreferenceField> {
        let mut changed = BTreeSet::new();

        if let Some(min) = self.min_salary {
            if profile.min_salary != min {
                profile.min_salary = min;
                changed.insert(PreferenceField::MinSalary);
            }
        }

        if let Some(max) = self.max_salary {
            if profile.max_salary != Some(max) {
                profile.max_salary = Some(max);
                changed.insert(PreferenceField::MaxSalary);
            }
        }

        if let Some(types) = &self.preferred_location_types {
            let mut next: Vec<LocationType> = Vec::with_capacity(types.len());
            for location_type in types {
                if !next.contains(location_type) {
                    next.push(*location_type);
                }
            }
            if profile.preferred_location_types != next {
                profile.preferred_location_types = next;
                changed.insert(PreferenceField::PreferredLocationTypes);
            }
        }

        // Newly stated titles go in front, keeping their stated order.
        let mut fresh_titles: Vec<String> = Vec::new();
        for title in &self.preferred_titles {
            if !contains_ignore_case(&profile.preferred_titles, title)
                && !contains_ignore_case(&fresh_titles, title)
            {
                fresh_titles.push(title.clone());
            }
        }
        if !fresh_titles.is_empty() {
            fresh_titles.append(&mut profile.preferred_titles);
            profile.preferred_titles = fresh_titles;
            changed.insert(PreferenceField::PreferredTitles);
        }

        if append_absent(&mut profile.preferred_locations, &self.preferred_locations) {
            changed.insert(PreferenceField::PreferredLocations);
        }
        if append_absent(&mut profile.preferred_industries, &self.preferred_industries) {
            changed.insert(PreferenceField::PreferredIndustries);
        }
        if append_absent(&mut profile.skills, &self.skills) {
            changed.insert(PreferenceField::Skills);
        }

        changed
    }
}

/// Loosely typed preference input, as sent by the language model's
/// `update_preferences` tool or the PATCH endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    #[serde(default)]
    pub min_salary: Option<i64>,
    #[serde(default)]
    pub max_salary: Option<i64>,
    #[serde(default)]
    pub preferred_titles: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_location_types: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_locations: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_industries: Option<Vec<String>>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
}

impl PreferenceUpdate {
    /// Validates field by field. Invalid fields are reported and left out of the delta.
    pub fn into_delta(self) -> (PreferenceDelta, Vec<InvalidPreferenceValue>) {
        let mut delta = PreferenceDelta::default();
        let mut rejected = Vec::new();

        if let Some(min) = self.min_salary {
            match u64::try_from(min) {
                Ok(min) => delta.min_salary = Some(min),
                Err(_) => rejected.push(InvalidPreferenceValue {
                    field: PreferenceField::MinSalary,
                    value: min.to_string(),
                    reason: "salary cannot be negative".to_string(),
                }),
            }
        }

        if let Some(max) = self.max_salary {
            match u64::try_from(max) {
                Ok(max) => delta.max_salary = Some(max),
                Err(_) => rejected.push(InvalidPreferenceValue {
                    field: PreferenceField::MaxSalary,
                    value: max.to_string(),
                    reason: "salary cannot be negative".to_string(),
                }),
            }
        }

        if let Some(raw_types) = self.preferred_location_types {
            let parsed: Result<Vec<LocationType>, _> =
                raw_types.iter().map(|raw| raw.parse::<LocationType>()).collect();
            match parsed {
                Ok(types) => delta.preferred_location_types = Some(types),
                Err(err) => rejected.push(InvalidPreferenceValue {
                    field: PreferenceField::PreferredLocationTypes,
                    value: err.0.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        delta.preferred_titles = clean_list(self.preferred_titles);
        delta.preferred_locations = clean_list(self.preferred_locations);
        delta.preferred_industries = clean_list(self.preferred_industries);
        delta.skills = clean_list(self.skills);

        (delta, rejected)
    }
}

fn clean_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub(crate) fn contains_ignore_case(list: &[String], item: &str) -> bool {
    list.iter().any(|existing| existing.eq_ignore_ascii_case(item))
}

fn append_absent(target: &mut Vec<String>, additions: &[String]) -> bool {
    let mut changed = false;
    for item in additions {
        if !contains_ignore_case(target, item) {
            target.push(item.clone());
            changed = true;
        }
    }
    changed
}
