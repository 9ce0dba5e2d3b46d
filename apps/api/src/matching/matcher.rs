//! Candidate Matcher: strict filtering, ranking, and relaxed alternatives.
//!
//! Algorithm:
//! 1. Build the priority order: similarity-ranked jobs first (in ranking order), then the
//!    rest of the pool ordered by the keyword heuristic.
//! 2. Keep the jobs that pass every strict filter, up to `limit`.
//! 3. If none survive, relax one dimension at a time (`RELAXATION_ORDER`) and collect up
//!    to `MAX_ALTERNATIVES` near misses, each annotated with the relaxed field, plus one
//!    suggestion per productive dimension.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::matching::filters::{passes_all, passes_except, FilterDimension, RELAXATION_ORDER};
use crate::models::candidate::CandidateProfile;
use crate::models::job::{format_usd, JobPosting, LocationType};
use crate::preferences::contains_ignore_case;
use crate::providers::ScoredId;

/// Total alternatives across every relaxation.
pub const MAX_ALTERNATIVES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedJob {
    pub job: JobPosting,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub job: JobPosting,
    pub relaxed_field: FilterDimension,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Matches {
        ranked: Vec<RankedJob>,
    },
    NoExactMatch {
        alternatives: Vec<Alternative>,
        suggestions: Vec<String>,
    },
}

impl MatchResult {
    pub fn job_ids(&self) -> Vec<&str> {
        match self {
            MatchResult::Matches { ranked } => ranked.iter().map(|r| r.job.id.as_str()).collect(),
            MatchResult::NoExactMatch { alternatives, .. } => {
                alternatives.iter().map(|a| a.job.id.as_str()).collect()
            }
        }
    }
}

/// Matches `candidate` against `pool`.
///
/// `ranking` comes from the similarity index; ids unknown to the pool are ignored.
/// `limit == 0` still runs the filters: surviving jobs yield an empty `Matches`,
/// no survivors yield the usual `NoExactMatch`.
pub fn match_jobs(
    candidate: &CandidateProfile,
    pool: &[JobPosting],
    ranking: Option<&[ScoredId]>,
    limit: usize,
) -> MatchResult {
    if pool.is_empty() {
        return MatchResult::NoExactMatch {
            alternatives: Vec::new(),
            suggestions: vec![
                "There are no job postings available right now. Please check back later."
                    .to_string(),
            ],
        };
    }

    let prioritized = prioritize(candidate, pool, ranking);

    let survivors: Vec<&(&JobPosting, f32)> = prioritized
        .iter()
        .filter(|(job, _)| passes_all(candidate, job))
        .collect();

    if !survivors.is_empty() {
        let ranked = survivors
            .into_iter()
            .take(limit)
            .map(|(job, score)| RankedJob {
                job: (*job).clone(),
                score: *score,
            })
            .collect();
        return MatchResult::Matches { ranked };
    }

    relax(candidate, &prioritized)
}

fn prioritize<'a>(
    candidate: &CandidateProfile,
    pool: &'a [JobPosting],
    ranking: Option<&[ScoredId]>,
) -> Vec<(&'a JobPosting, f32)> {
    let mut ordered: Vec<(&JobPosting, f32)> = Vec::with_capacity(pool.len());
    let mut seen: HashSet<&str> = HashSet::new();

    if let Some(ranking) = ranking {
        let by_id: HashMap<&str, &JobPosting> =
            pool.iter().map(|job| (job.id.as_str(), job)).collect();
        for hit in ranking {
            if let Some(&job) = by_id.get(hit.id.as_str()) {
                if seen.insert(job.id.as_str()) {
                    ordered.push((job, hit.score));
                }
            }
        }
    }

    let mut rest: Vec<(&JobPosting, f32)> = pool
        .iter()
        .filter(|job| !seen.contains(job.id.as_str()))
        .map(|job| (job, heuristic_score(candidate, job)))
        .collect();
    // Stable: equal scores keep pool order.
    rest.sort_by(|a, b| b.1.total_cmp(&a.1));
    ordered.extend(rest);
    ordered
}

/// Keyword score used when no similarity ranking is available, in `0.0..=1.0`.
pub fn heuristic_score(candidate: &CandidateProfile, job: &JobPosting) -> f32 {
    let skill_overlap = candidate
        .skills
        .iter()
        .filter(|skill| contains_ignore_case(&job.required_skills, skill))
        .count();

    let mut score = skill_overlap as f32 * 2.0;
    if job.salary_min >= candidate.min_salary {
        score += 3.0;
    }
    if contains_ignore_case(&candidate.preferred_industries, &job.industry) {
        score += 2.0;
    }
    if !candidate.preferred_titles.is_empty() {
        score += 3.0;
    }

    ((score / 10.0).min(1.0) * 100.0).round() / 100.0
}

fn relax(candidate: &CandidateProfile, prioritized: &[(&JobPosting, f32)]) -> MatchResult {
    let mut alternatives: Vec<Alternative> = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();

    for dimension in RELAXATION_ORDER {
        if alternatives.len() >= MAX_ALTERNATIVES {
            break;
        }
        if !dimension.is_active(candidate) {
            continue;
        }

        let relaxed: Vec<&JobPosting> = prioritized
            .iter()
            .map(|(job, _)| *job)
            .filter(|job| passes_except(candidate, job, dimension))
            .collect();
        if relaxed.is_empty() {
            continue;
        }

        suggestions.push(suggestion(dimension, candidate, &relaxed));
        for job in relaxed {
            if alternatives.len() >= MAX_ALTERNATIVES {
                break;
            }
            alternatives.push(Alternative {
                note: note(dimension, candidate, job),
                job: job.clone(),
                relaxed_field: dimension,
            });
        }
    }

    if suggestions.is_empty() {
        suggestions.push(
            "No postings come close to your current preferences. Could you tell me more about \
             what you are looking for, or loosen one of your requirements?"
                .to_string(),
        );
    }

    MatchResult::NoExactMatch {
        alternatives,
        suggestions,
    }
}

fn positions(count: usize) -> String {
    if count == 1 {
        "1 position".to_string()
    } else {
        format!("{count} positions")
    }
}

fn join_location_types(types: &[LocationType]) -> String {
    types
        .iter()
        .map(LocationType::as_str)
        .collect::<Vec<_>>()
        .join(" or ")
}

fn suggestion(
    dimension: FilterDimension,
    candidate: &CandidateProfile,
    relaxed: &[&JobPosting],
) -> String {
    let found = positions(relaxed.len());
    match dimension {
        FilterDimension::Location => {
            let mut types: Vec<LocationType> = Vec::new();
            for job in relaxed {
                if !types.contains(&job.location_type) {
                    types.push(job.location_type);
                }
            }
            format!(
                "Would you consider {} work? I found {found} matching everything else.",
                join_location_types(&types)
            )
        }
        FilterDimension::Title => format!(
            "Would you be open to roles other than {}? I found {found} matching everything else.",
            candidate.preferred_titles.join(" or ")
        ),
        FilterDimension::Salary => {
            let best = relaxed.iter().map(|job| job.salary_max).max().unwrap_or(0);
            format!(
                "Would you consider a salary below {}? I found {found} paying up to {}.",
                format_usd(candidate.min_salary),
                format_usd(best)
            )
        }
        FilterDimension::Industry => format!(
            "Would you consider industries beyond {}? I found {found} matching everything else.",
            candidate.preferred_industries.join(", ")
        ),
        FilterDimension::Declined => String::new(),
    }
}

fn note(dimension: FilterDimension, candidate: &CandidateProfile, job: &JobPosting) -> String {
    match dimension {
        FilterDimension::Location => format!(
            "This is {}, not {}",
            job.location_type,
            join_location_types(&candidate.preferred_location_types)
        ),
        FilterDimension::Title => format!(
            "Different role ({}) than {}",
            job.title,
            candidate.preferred_titles.join(" or ")
        ),
        FilterDimension::Salary => format!(
            "Pays up to {}, below your {} minimum",
            format_usd(job.salary_max),
            format_usd(candidate.min_salary)
        ),
        FilterDimension::Industry => {
            format!("In {}, outside your preferred industries", job.industry)
        }
        FilterDimension::Declined => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::filters::first_failure;

    fn job(
        id: &str,
        title: &str,
        location_type: LocationType,
        salary: (u64, u64),
        industry: &str,
    ) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: title.to_string(),
            company: "Acme".to_string(),
            description: format!("{title} at Acme"),
            required_skills: vec!["CDL".to_string(), "Customer Service".to_string()],
            preferred_skills: vec![],
            location_type,
            location: None,
            salary_min: salary.0,
            salary_max: salary.1,
            industry: industry.to_string(),
            department: None,
            benefits: vec![],
            min_years_experience: 0,
        }
    }

    fn sample_pool() -> Vec<JobPosting> {
        vec![
            job("j1", "Delivery Driver", LocationType::Onsite, (30_000, 45_000), "Logistics"),
            job("j2", "Remote Support Agent", LocationType::Remote, (25_000, 35_000), "Technology"),
            job("j3", "Registered Nurse", LocationType::Onsite, (60_000, 80_000), "Healthcare"),
            job("j4", "Truck Driver", LocationType::Hybrid, (15_000, 19_000), "Logistics"),
            job("j5", "Software Engineer", LocationType::Remote, (90_000, 130_000), "Technology"),
            job("j6", "Dispatch Driver", LocationType::Remote, (40_000, 50_000), "Logistics"),
        ]
    }

    fn candidates() -> Vec<CandidateProfile> {
        vec![
            CandidateProfile::default(),
            CandidateProfile {
                min_salary: 20_000,
                preferred_location_types: vec![LocationType::Remote],
                preferred_titles: vec!["Driver".to_string()],
                ..CandidateProfile::default()
            },
            CandidateProfile {
                min_salary: 100_000,
                preferred_industries: vec!["Technology".to_string()],
                declined_job_ids: vec!["j5".to_string()],
                ..CandidateProfile::default()
            },
            CandidateProfile {
                preferred_titles: vec!["nurse".to_string(), "driver".to_string()],
                preferred_location_types: vec![LocationType::Onsite, LocationType::Hybrid],
                declined_job_ids: vec!["j1".to_string(), "j3".to_string()],
                ..CandidateProfile::default()
            },
            CandidateProfile {
                preferred_titles: vec!["Pilot".to_string()],
                preferred_industries: vec!["Aviation".to_string()],
                min_salary: 500_000,
                ..CandidateProfile::default()
            },
        ]
    }

    #[test]
    fn test_every_match_passes_every_filter() {
        let pool = sample_pool();
        for candidate in candidates() {
            if let MatchResult::Matches { ranked } = match_jobs(&candidate, &pool, None, 10) {
                for r in ranked {
                    assert_eq!(first_failure(&candidate, &r.job), None, "{}", r.job.id);
                }
            }
        }
    }

    #[test]
    fn test_declined_jobs_never_appear() {
        let pool = sample_pool();
        let ranking: Vec<ScoredId> = pool
            .iter()
            .map(|j| ScoredId {
                id: j.id.clone(),
                score: 0.5,
            })
            .collect();
        for candidate in candidates() {
            for ranking in [None, Some(ranking.as_slice())] {
                let result = match_jobs(&candidate, &pool, ranking, 10);
                for id in result.job_ids() {
                    assert!(!candidate.has_declined(id), "declined {id} was returned");
                }
            }
        }
    }

    #[test]
    fn test_remote_driver_falls_back_to_onsite_alternative() {
        let candidate = CandidateProfile {
            min_salary: 20_000,
            preferred_location_types: vec![LocationType::Remote],
            preferred_titles: vec!["Driver".to_string()],
            ..CandidateProfile::default()
        };
        let pool = vec![
            job("j1", "Delivery Driver", LocationType::Onsite, (30_000, 45_000), "Logistics"),
            job("j2", "Line Cook", LocationType::Onsite, (25_000, 30_000), "Hospitality"),
        ];

        match match_jobs(&candidate, &pool, None, 3) {
            MatchResult::NoExactMatch {
                alternatives,
                suggestions,
            } => {
                assert_eq!(alternatives.len(), 1);
                assert_eq!(alternatives[0].job.id, "j1");
                assert_eq!(alternatives[0].relaxed_field, FilterDimension::Location);
                assert_eq!(alternatives[0].note, "This is onsite, not remote");
                assert_eq!(suggestions.len(), 1);
                assert!(suggestions[0].contains("onsite work"), "{}", suggestions[0]);
            }
            other => panic!("expected NoExactMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_pool_reports_no_postings() {
        let result = match_jobs(&CandidateProfile::default(), &[], None, 3);
        match result {
            MatchResult::NoExactMatch {
                alternatives,
                suggestions,
            } => {
                assert!(alternatives.is_empty());
                assert_eq!(suggestions.len(), 1);
                assert!(suggestions[0].contains("no job postings"));
            }
            other => panic!("expected NoExactMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_limit_returns_empty_matches() {
        let result = match_jobs(&CandidateProfile::default(), &sample_pool(), None, 0);
        assert_eq!(result, MatchResult::Matches { ranked: vec![] });
    }

    #[test]
    fn test_zero_limit_still_computes_alternatives() {
        // j6 is the only remote driver; declining it leaves no exact match.
        let candidate = CandidateProfile {
            preferred_titles: vec!["Driver".to_string()],
            preferred_location_types: vec![LocationType::Remote],
            min_salary: 45_000,
            declined_job_ids: vec!["j6".to_string()],
            ..CandidateProfile::default()
        };
        let result = match_jobs(&candidate, &sample_pool(), None, 0);
        assert!(matches!(result, MatchResult::NoExactMatch { .. }));
    }

    #[test]
    fn test_limit_truncates_matches() {
        let result = match_jobs(&CandidateProfile::default(), &sample_pool(), None, 2);
        assert_eq!(result.job_ids().len(), 2);
    }

    #[test]
    fn test_ranking_order_is_respected() {
        let pool = sample_pool();
        let ranking = vec![
            ScoredId {
                id: "j5".to_string(),
                score: 0.93,
            },
            ScoredId {
                id: "unknown".to_string(),
                score: 0.9,
            },
            ScoredId {
                id: "j2".to_string(),
                score: 0.71,
            },
        ];
        match match_jobs(&CandidateProfile::default(), &pool, Some(&ranking), 3) {
            MatchResult::Matches { ranked } => {
                assert_eq!(ranked[0].job.id, "j5");
                assert_eq!(ranked[0].score, 0.93);
                assert_eq!(ranked[1].job.id, "j2");
                assert_eq!(ranked.len(), 3);
            }
            other => panic!("expected Matches, got {other:?}"),
        }
    }

    #[test]
    fn test_alternatives_are_capped_and_follow_relaxation_order() {
        let candidate = CandidateProfile {
            preferred_location_types: vec![LocationType::Remote],
            preferred_titles: vec!["Astronaut".to_string()],
            ..CandidateProfile::default()
        };
        let pool: Vec<JobPosting> = (0..4)
            .map(|i| {
                job(&format!("onsite-{i}"), "Astronaut", LocationType::Onsite, (1, 2), "Space")
            })
            .chain((0..4).map(|i| {
                job(&format!("remote-{i}"), "Clerk", LocationType::Remote, (1, 2), "Space")
            }))
            .collect();

        match match_jobs(&candidate, &pool, None, 3) {
            MatchResult::NoExactMatch {
                alternatives,
                suggestions,
            } => {
                assert_eq!(alternatives.len(), MAX_ALTERNATIVES);
                assert!(alternatives[..4]
                    .iter()
                    .all(|a| a.relaxed_field == FilterDimension::Location));
                assert_eq!(alternatives[4].relaxed_field, FilterDimension::Title);
                assert_eq!(suggestions.len(), 2);
            }
            other => panic!("expected NoExactMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unproductive_dimensions_get_no_suggestion() {
        let candidate = CandidateProfile {
            preferred_titles: vec!["Pilot".to_string()],
            preferred_industries: vec!["Aviation".to_string()],
            ..CandidateProfile::default()
        };
        match match_jobs(&candidate, &sample_pool(), None, 3) {
            MatchResult::NoExactMatch {
                alternatives,
                suggestions,
            } => {
                assert!(alternatives.is_empty());
                assert_eq!(suggestions.len(), 1);
                assert!(suggestions[0].contains("loosen"));
            }
            other => panic!("expected NoExactMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_salary_relaxation_note() {
        let candidate = CandidateProfile {
            min_salary: 60_000,
            preferred_titles: vec!["Driver".to_string()],
            preferred_industries: vec!["Logistics".to_string()],
            ..CandidateProfile::default()
        };
        match match_jobs(&candidate, &sample_pool(), None, 3) {
            MatchResult::NoExactMatch { alternatives, .. } => {
                assert_eq!(alternatives[0].relaxed_field, FilterDimension::Salary);
                assert_eq!(
                    alternatives[0].note,
                    "Pays up to $45,000, below your $60,000 minimum"
                );
            }
            other => panic!("expected NoExactMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_heuristic_score_is_normalized() {
        let candidate = CandidateProfile {
            skills: vec!["cdl".to_string(), "customer service".to_string()],
            preferred_industries: vec!["Logistics".to_string()],
            preferred_titles: vec!["Driver".to_string()],
            min_salary: 20_000,
            ..CandidateProfile::default()
        };
        let posting = job("j1", "Driver", LocationType::Onsite, (30_000, 45_000), "Logistics");
        assert_eq!(heuristic_score(&candidate, &posting), 1.0);

        let bare = CandidateProfile {
            min_salary: 90_000,
            ..CandidateProfile::default()
        };
        assert_eq!(heuristic_score(&bare, &posting), 0.0);
    }

    #[test]
    fn test_result_serializes_with_kind_tag() {
        let json = serde_json::to_value(MatchResult::Matches { ranked: vec![] }).unwrap();
        assert_eq!(json["kind"], "matches");
        let json = serde_json::to_value(match_jobs(&CandidateProfile::default(), &[], None, 1))
            .unwrap();
        assert_eq!(json["kind"], "no_exact_match");
    }
}
