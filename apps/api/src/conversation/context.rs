//! Conversation Context Builder: the prompt text handed to the language model.
//!
//! Layout, in this order:
//! 1. candidate identity line
//! 2. stated preferences line (`none` when nothing is set)
//! 3. the last `max_turns` turns, oldest first
//! 4. the current message

use std::fmt::Write;

use crate::models::candidate::CandidateProfile;
use crate::models::conversation::ConversationTurn;
use crate::models::job::{format_usd, LocationType};

pub const DEFAULT_HISTORY_TURNS: usize = 6;

#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    max_turns: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_TURNS)
    }
}

impl ContextBuilder {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    /// Older turns beyond `max_turns` are dropped, never summarized.
    pub fn build(
        &self,
        candidate: &CandidateProfile,
        current_message: &str,
        history: &[ConversationTurn],
    ) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{}", identity_line(candidate));
        let _ = writeln!(out, "Stated preferences: {}", preferences_line(candidate));

        let start = history.len().saturating_sub(self.max_turns);
        let recent = &history[start..];
        if !recent.is_empty() {
            out.push_str("Recent conversation:\n");
            for turn in recent {
                let _ = writeln!(out, "{}: {}", turn.role.as_str(), turn.text);
            }
        }

        let _ = write!(out, "Current message: {current_message}");
        out
    }
}

fn identity_line(candidate: &CandidateProfile) -> String {
    let mut line = format!("Candidate ID: {}", candidate.id);
    if !candidate.name.is_empty() {
        let _ = write!(line, " | Name: {}", candidate.name);
    }
    if let Some(title) = &candidate.current_title {
        let _ = write!(line, " | Current title: {title}");
    }
    if candidate.years_experience > 0 {
        let _ = write!(line, " | Experience: {} years", candidate.years_experience);
    }
    line
}

/// Every non-default preference-bearing field, `; `-separated.
fn preferences_line(candidate: &CandidateProfile) -> String {
    let mut parts: Vec<String> = Vec::new();

    if candidate.min_salary > 0 {
        parts.push(format!("min salary {}", format_usd(candidate.min_salary)));
    }
    if let Some(max) = candidate.effective_max_salary() {
        parts.push(format!("max salary {}", format_usd(max)));
    }
    if !candidate.preferred_location_types.is_empty() {
        let types: Vec<&str> = candidate
            .preferred_location_types
            .iter()
            .map(LocationType::as_str)
            .collect();
        parts.push(format!("location types {}", types.join(", ")));
    }
    if !candidate.preferred_titles.is_empty() {
        parts.push(format!("titles {}", candidate.preferred_titles.join(", ")));
    }
    if !candidate.preferred_locations.is_empty() {
        parts.push(format!("locations {}", candidate.preferred_locations.join(", ")));
    }
    if !candidate.preferred_industries.is_empty() {
        parts.push(format!(
            "industries {}",
            candidate.preferred_industries.join(", ")
        ));
    }
    if !candidate.skills.is_empty() {
        parts.push(format!("skills {}", candidate.skills.join(", ")));
    }
    if !candidate.declined_job_ids.is_empty() {
        parts.push(format!("declined {}", candidate.declined_job_ids.join(", ")));
    }
    if let Some(job_id) = &candidate.accepted_job_id {
        parts.push(format!("accepted {job_id}"));
    }

    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join("; ")
    }
}
