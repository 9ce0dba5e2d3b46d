//! Chat Orchestrator: one conversational turn, end to end.
//!
//! The extractor runs before the model is consulted, so preferences stated in a
//! message are persisted even when the model is unavailable. A session is only
//! created once there is an exchange to record in it. The model then gets a
//! bounded number of rounds to call tools; the final round is offered no tools and
//! must answer in text.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::commands::{tool_definitions, Command, CommandRegistry};
use crate::cache::TtlCache;
use crate::conversation::context::ContextBuilder;
use crate::conversation::sessions::SessionStore;
use crate::errors::AppError;
use crate::llm_client::prompts::{AGENT_SYSTEM, FINAL_ROUND_INSTRUCTION};
use crate::llm_client::{ChatMessage, ChatModel, ContentBlock, ToolCall, ToolDefinition};
use crate::models::conversation::{ConversationTurn, Role};
use crate::preferences::PreferenceField;
use crate::store::profiles::ProfileStore;

/// Upper bound on model calls per chat turn.
pub const MAX_LLM_ROUNDS: usize = 4;

const EMPTY_REPLY: &str =
    "Sorry, I couldn't put a reply together just now. Could you rephrase that?";

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub response: String,
    pub changed_fields: Vec<PreferenceField>,
    pub timestamp: DateTime<Utc>,
}

pub struct ChatOrchestrator {
    profiles: Arc<ProfileStore>,
    sessions: Arc<SessionStore>,
    registry: Arc<CommandRegistry>,
    llm: Arc<dyn ChatModel>,
    context: ContextBuilder,
    known_candidates: Arc<TtlCache<bool>>,
    cache_ttl: Duration,
}

impl ChatOrchestrator {
    pub fn new(
        profiles: Arc<ProfileStore>,
        sessions: Arc<SessionStore>,
        registry: Arc<CommandRegistry>,
        llm: Arc<dyn ChatModel>,
        context: ContextBuilder,
        known_candidates: Arc<TtlCache<bool>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            profiles,
            sessions,
            registry,
            llm,
            context,
            known_candidates,
            cache_ttl,
        }
    }

    pub async fn chat(
        &self,
        candidate_id: &str,
        session_id: Option<Uuid>,
        message: &str,
    ) -> Result<ChatResponse, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("message cannot be empty".to_string()));
        }

        self.ensure_candidate(candidate_id).await?;
        let existing = self.sessions.resolve(candidate_id, session_id).await?;

        let update = self.profiles.apply_message(candidate_id, message).await?;
        if !update.changed.is_empty() {
            info!(candidate_id, changed = ?update.changed, "preferences extracted from message");
            self.registry.refresh_candidate(&update.profile);
        }
        for rejected in &update.rejected {
            debug!(candidate_id, "ignored preference value: {rejected}");
        }

        // A session evicted since `resolve` simply has no history left.
        let history = match existing {
            Some(id) => self.sessions.history(id).await.unwrap_or_default(),
            None => Vec::new(),
        };
        let prompt = self.context.build(&update.profile, message, &history);
        let response = self.converse(candidate_id, prompt).await?;

        let session_id = self
            .sessions
            .record(
                candidate_id,
                existing,
                [
                    ConversationTurn::user(message),
                    ConversationTurn::assistant(response.clone()),
                ],
            )
            .await;

        Ok(ChatResponse {
            session_id,
            response,
            changed_fields: update.changed.into_iter().collect(),
            timestamp: Utc::now(),
        })
    }

    /// Only positive lookups are memoized; a candidate created later is found on the
    /// next call.
    async fn ensure_candidate(&self, candidate_id: &str) -> Result<(), AppError> {
        let key = format!("candidate:{candidate_id}");
        if self.known_candidates.get(&key).is_some() {
            return Ok(());
        }
        if !self.profiles.exists(candidate_id).await {
            return Err(AppError::candidate_not_found(candidate_id));
        }
        self.known_candidates.set(key, true, self.cache_ttl);
        Ok(())
    }

    async fn converse(&self, candidate_id: &str, prompt: String) -> Result<String, AppError> {
        let tools = tool_definitions();
        let mut messages = vec![ChatMessage::user_text(prompt)];

        for round in 1..=MAX_LLM_ROUNDS {
            let last_round = round == MAX_LLM_ROUNDS;
            let offered: &[ToolDefinition] = if last_round { &[] } else { &tools };
            if last_round {
                if let Some(last) = messages.last_mut() {
                    last.content.push(ContentBlock::Text {
                        text: FINAL_ROUND_INSTRUCTION.to_string(),
                    });
                }
            }

            let reply = self
                .llm
                .complete(AGENT_SYSTEM, &messages, offered)
                .await
                .map_err(|e| AppError::LlmUnavailable(e.to_string()))?;

            let calls = reply.tool_calls();
            if calls.is_empty() || last_round {
                let text = reply.text();
                return Ok(if text.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    text
                });
            }

            debug!(candidate_id, round, calls = calls.len(), "model requested tools");
            messages.push(reply.into_message());

            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run_tool(candidate_id, call).await);
            }
            messages.push(ChatMessage {
                role: Role::User,
                content: results,
            });
        }

        Ok(EMPTY_REPLY.to_string())
    }

    /// Failures become error results the model can explain; they never abort the turn.
    async fn run_tool(&self, candidate_id: &str, call: ToolCall) -> ContentBlock {
        let outcome = match Command::parse(&call.name, &call.input) {
            Ok(command) => self.registry.execute(candidate_id, command).await,
            Err(e) => Err(e),
        };

        let (content, is_error) = match outcome.map(|o| serde_json::to_string(&o)) {
            Ok(Ok(json)) => (json, false),
            Ok(Err(e)) => (format!("Failed to encode tool result: {e}"), true),
            Err(e) => {
                warn!(candidate_id, tool = %call.name, "tool call failed: {e}");
                (e.to_string(), true)
            }
        };

        ContentBlock::ToolResult {
            tool_use_id: call.id,
            content,
            is_error,
        }
    }
}
