//! Strict eligibility filters applied to candidate/job pairs.
//!
//! Filters run in a fixed order, cheapest first, and short-circuit on the first failure.

use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateProfile;
use crate::models::job::JobPosting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDimension {
    Declined,
    Salary,
    Location,
    Title,
    Industry,
}

/// Evaluation order for exact matching.
pub const FILTER_ORDER: [FilterDimension; 5] = [
    FilterDimension::Declined,
    FilterDimension::Salary,
    FilterDimension::Location,
    FilterDimension::Title,
    FilterDimension::Industry,
];

/// Order in which dimensions are relaxed to build alternatives, least negotiable last.
/// Declined jobs are never relaxed.
pub const RELAXATION_ORDER: [FilterDimension; 4] = [
    FilterDimension::Location,
    FilterDimension::Title,
    FilterDimension::Salary,
    FilterDimension::Industry,
];

impl FilterDimension {
    /// Whether the candidate has a constraint on this dimension at all.
    pub fn is_active(&self, candidate: &CandidateProfile) -> bool {
        match self {
            FilterDimension::Declined => !candidate.declined_job_ids.is_empty(),
            FilterDimension::Salary => candidate.min_salary > 0,
            FilterDimension::Location => !candidate.preferred_location_types.is_empty(),
            FilterDimension::Title => !candidate.preferred_titles.is_empty(),
            FilterDimension::Industry => !candidate.preferred_industries.is_empty(),
        }
    }

    pub fn passes(&self, candidate: &CandidateProfile, job: &JobPosting) -> bool {
        match self {
            FilterDimension::Declined => !candidate.has_declined(&job.id),
            FilterDimension::Salary => {
                candidate.min_salary == 0 || job.salary_max >= candidate.min_salary
            }
            FilterDimension::Location => {
                candidate.preferred_location_types.is_empty()
                    || candidate.preferred_location_types.contains(&job.location_type)
            }
            FilterDimension::Title => {
                let job_title = job.title.to_lowercase();
                candidate.preferred_titles.is_empty()
                    || candidate
                        .preferred_titles
                        .iter()
                        .any(|title| job_title.contains(&title.to_lowercase()))
            }
            FilterDimension::Industry => {
                candidate.preferred_industries.is_empty()
                    || candidate
                        .preferred_industries
                        .iter()
                        .any(|industry| industry.eq_ignore_ascii_case(&job.industry))
            }
        }
    }
}

/// First filter the job fails, or `None` when it is an exact match.
pub fn first_failure(candidate: &CandidateProfile, job: &JobPosting) -> Option<FilterDimension> {
    FILTER_ORDER
        .into_iter()
        .find(|dimension| !dimension.passes(candidate, job))
}

pub fn passes_all(candidate: &CandidateProfile, job: &JobPosting) -> bool {
    first_failure(candidate, job).is_none()
}

/// Runs the pipeline with `relaxed` disabled.
pub fn passes_except(
    candidate: &CandidateProfile,
    job: &JobPosting,
    relaxed: FilterDimension,
) -> bool {
    FILTER_ORDER
        .into_iter()
        .filter(|dimension| *dimension != relaxed)
        .all(|dimension| dimension.passes(candidate, job))
}
