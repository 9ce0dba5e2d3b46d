//! Command Registry: the closed set of actions the language model may take.
//!
//! A tool call (name + JSON input) is parsed into a `Command` up front, so an unknown
//! tool or malformed input is rejected before anything runs. `execute` performs the
//! command against the stores and returns a serializable `CommandOutcome`, which the
//! orchestrator hands back to the model as the tool result.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::ToolDefinition;
use crate::matching::matcher::MatchResult;
use crate::matching::service::{MatchService, MAX_MATCHES};
use crate::models::candidate::CandidateProfile;
use crate::models::job::JobPosting;
use crate::preferences::{InvalidPreferenceValue, PreferenceField, PreferenceUpdate};
use crate::providers::EntityKind;
use crate::refresh::RefreshQueue;
use crate::store::jobs::JobPool;
use crate::store::profiles::{DeclineOutcome, ProfileStore, ProfileUpdate};

pub const SEARCH_JOBS: &str = "search_jobs";
pub const ACCEPT_JOB: &str = "accept_job";
pub const DECLINE_JOBS: &str = "decline_jobs";
pub const UPDATE_PREFERENCES: &str = "update_preferences";
pub const GET_CANDIDATE_PROFILE: &str = "get_candidate_profile";
pub const GET_JOB_DETAILS: &str = "get_job_details";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search {
        additional_criteria: Option<String>,
        /// `None` means the configured default.
        num_results: Option<i64>,
    },
    Accept {
        job_id: String,
    },
    Decline {
        job_ids: Vec<String>,
    },
    UpdatePreferences(PreferenceUpdate),
    GetProfile,
    JobDetails {
        job_id: String,
    },
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    additional_criteria: Option<String>,
    #[serde(default)]
    num_results: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct JobArgs {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct DeclineArgs {
    job_ids: Vec<String>,
}

impl Command {
    pub fn parse(name: &str, input: &Value) -> Result<Self, AppError> {
        let command = match name {
            SEARCH_JOBS => {
                let args: SearchArgs = decode(name, input)?;
                Command::Search {
                    additional_criteria: args.additional_criteria,
                    num_results: args.num_results,
                }
            }
            ACCEPT_JOB => {
                let args: JobArgs = decode(name, input)?;
                Command::Accept {
                    job_id: args.job_id,
                }
            }
            DECLINE_JOBS => {
                let args: DeclineArgs = decode(name, input)?;
                Command::Decline {
                    job_ids: args.job_ids,
                }
            }
            UPDATE_PREFERENCES => Command::UpdatePreferences(decode(name, input)?),
            GET_CANDIDATE_PROFILE => Command::GetProfile,
            GET_JOB_DETAILS => {
                let args: JobArgs = decode(name, input)?;
                Command::JobDetails {
                    job_id: args.job_id,
                }
            }
            other => return Err(AppError::Validation(format!("Unknown tool '{other}'"))),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Search { .. } => SEARCH_JOBS,
            Command::Accept { .. } => ACCEPT_JOB,
            Command::Decline { .. } => DECLINE_JOBS,
            Command::UpdatePreferences(_) => UPDATE_PREFERENCES,
            Command::GetProfile => GET_CANDIDATE_PROFILE,
            Command::JobDetails { .. } => GET_JOB_DETAILS,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &str, input: &Value) -> Result<T, AppError> {
    // Tools without required arguments may be called with `null` input.
    let input = if input.is_null() { json!({}) } else { input.clone() };
    serde_json::from_value(input)
        .map_err(|e| AppError::Validation(format!("Invalid input for tool '{tool}': {e}")))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Search {
        result: MatchResult,
    },
    Accepted {
        job: JobPosting,
    },
    Declined {
        newly_declined: Vec<String>,
        total_declined: usize,
    },
    PreferencesUpdated {
        changed: Vec<PreferenceField>,
        rejected: Vec<InvalidPreferenceValue>,
        profile: CandidateProfile,
    },
    Profile {
        profile: CandidateProfile,
    },
    JobDetails {
        job: JobPosting,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

pub struct CommandRegistry {
    profiles: Arc<ProfileStore>,
    jobs: Arc<JobPool>,
    matcher: Arc<MatchService>,
    refresh: RefreshQueue,
    default_num_results: usize,
}

impl CommandRegistry {
    pub fn new(
        profiles: Arc<ProfileStore>,
        jobs: Arc<JobPool>,
        matcher: Arc<MatchService>,
        refresh: RefreshQueue,
        default_num_results: usize,
    ) -> Self {
        Self {
            profiles,
            jobs,
            matcher,
            refresh,
            default_num_results,
        }
    }

    pub async fn execute(
        &self,
        candidate_id: &str,
        command: Command,
    ) -> Result<CommandOutcome, AppError> {
        debug!(candidate_id, tool = command.name(), "executing command");

        match command {
            Command::Search {
                additional_criteria,
                num_results,
            } => {
                let limit = self.result_count(num_results);
                let result = self
                    .matcher
                    .search(candidate_id, additional_criteria.as_deref(), limit)
                    .await?;
                Ok(CommandOutcome::Search { result })
            }
            Command::Accept { job_id } => {
                let job = self.job(&job_id)?;
                self.profiles.accept(candidate_id, &job_id).await?;
                Ok(CommandOutcome::Accepted { job })
            }
            Command::Decline { job_ids } => {
                let outcome = self.decline(candidate_id, &job_ids).await?;
                Ok(CommandOutcome::Declined {
                    total_declined: outcome.profile.declined_job_ids.len(),
                    newly_declined: outcome.newly_declined,
                })
            }
            Command::UpdatePreferences(update) => {
                let update = self.update_preferences(candidate_id, update).await?;
                Ok(CommandOutcome::PreferencesUpdated {
                    changed: update.changed.into_iter().collect(),
                    rejected: update.rejected,
                    profile: update.profile,
                })
            }
            Command::GetProfile => Ok(CommandOutcome::Profile {
                profile: self.profiles.get(candidate_id).await?,
            }),
            Command::JobDetails { job_id } => Ok(CommandOutcome::JobDetails {
                job: self.job(&job_id)?,
            }),
        }
    }

    /// Validates and applies an explicit preference update. Fails with
    /// `InvalidPreference` only when every supplied field was rejected.
    pub async fn update_preferences(
        &self,
        candidate_id: &str,
        update: PreferenceUpdate,
    ) -> Result<ProfileUpdate, AppError> {
        let (delta, rejected) = update.into_delta();
        if delta.is_empty() {
            if let Some(first) = rejected.first() {
                return Err(AppError::InvalidPreference(first.clone()));
            }
        }

        let mut result = self.profiles.apply_delta(candidate_id, &delta).await?;
        result.rejected = rejected;
        if !result.changed.is_empty() {
            self.refresh_candidate(&result.profile);
        }
        Ok(result)
    }

    /// Records declines after checking every id against the job pool.
    pub async fn decline(
        &self,
        candidate_id: &str,
        job_ids: &[String],
    ) -> Result<DeclineOutcome, AppError> {
        if job_ids.is_empty() {
            return Err(AppError::Validation("job_ids cannot be empty".to_string()));
        }
        if let Some(unknown) = job_ids.iter().find(|id| !self.jobs.contains(id)) {
            return Err(AppError::job_not_found(unknown));
        }
        self.profiles.decline(candidate_id, job_ids).await
    }

    /// Queues a re-embedding of the profile. A full queue only delays freshness.
    pub fn refresh_candidate(&self, profile: &CandidateProfile) {
        if self
            .refresh
            .enqueue(&profile.id, EntityKind::Candidate, profile.to_embedding_text())
            .is_ok()
        {
            info!(candidate_id = %profile.id, "candidate embedding refresh queued");
        }
    }

    pub fn default_num_results(&self) -> usize {
        self.default_num_results
    }

    fn result_count(&self, requested: Option<i64>) -> usize {
        match requested {
            Some(n) => usize::try_from(n).unwrap_or(0).min(MAX_MATCHES),
            None => self.default_num_results,
        }
    }

    fn job(&self, job_id: &str) -> Result<JobPosting, AppError> {
        self.jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| AppError::job_not_found(job_id))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tool definitions
// ────────────────────────────────────────────────────────────────────────────

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: SEARCH_JOBS,
            description: "Search job postings matching the candidate's profile and stated \
                preferences. Returns ranked matches, or alternatives with suggestions when \
                nothing matches exactly.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "additional_criteria": {
                        "type": "string",
                        "description": "Extra free-text criteria from the conversation"
                    },
                    "num_results": {
                        "type": "integer",
                        "description": "Number of results to return (default 3)"
                    }
                }
            }),
        },
        ToolDefinition {
            name: ACCEPT_JOB,
            description: "Record that the candidate accepts a job posting.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "job_id": {"type": "string", "description": "Id of the accepted job"}
                },
                "required": ["job_id"]
            }),
        },
        ToolDefinition {
            name: DECLINE_JOBS,
            description: "Record that the candidate declines one or more job postings. \
                Declined jobs are never suggested again.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "job_ids": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Ids of the declined jobs"
                    }
                },
                "required": ["job_ids"]
            }),
        },
        ToolDefinition {
            name: UPDATE_PREFERENCES,
            description: "Update the candidate's job preferences. Only include the fields \
                the candidate mentioned.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "min_salary": {"type": "integer", "description": "Minimum acceptable salary in USD"},
                    "max_salary": {"type": "integer", "description": "Maximum expected salary in USD"},
                    "preferred_titles": {"type": "array", "items": {"type": "string"}},
                    "preferred_location_types": {
                        "type": "array",
                        "items": {"type": "string", "enum": ["remote", "hybrid", "onsite"]}
                    },
                    "preferred_locations": {"type": "array", "items": {"type": "string"}},
                    "preferred_industries": {"type": "array", "items": {"type": "string"}},
                    "skills": {"type": "array", "items": {"type": "string"}}
                }
            }),
        },
        ToolDefinition {
            name: GET_CANDIDATE_PROFILE,
            description: "Get the candidate's stored profile and preferences.",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: GET_JOB_DETAILS,
            description: "Get the full details of one job posting.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "job_id": {"type": "string", "description": "Id of the job"}
                },
                "required": ["job_id"]
            }),
        },
    ]
}
