use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::conversation::{ConversationTurn, SessionInfo};

#[derive(Debug, Clone)]
struct Session {
    candidate_id: String,
    created_at: DateTime<Utc>,
    last_active: Instant,
    turns: Vec<ConversationTurn>,
}

impl Session {
    fn new(candidate_id: &str, now: Instant) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            created_at: Utc::now(),
            last_active: now,
            turns: Vec::new(),
        }
    }
}

/// In-memory chat sessions. History is append-only and handed out as copies, so a
/// reader never observes a half-appended exchange. Sessions idle for longer than the
/// configured limit are dropped by `evict_idle`.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, candidate_id: &str) -> SessionInfo {
        let session_id = Uuid::new_v4();
        let session = Session::new(candidate_id, Instant::now());
        let info = info_of(session_id, &session);
        self.sessions.write().await.insert(session_id, session);
        info
    }

    /// Checks the session a chat turn asks for. `None` means the turn starts a new
    /// session once it has something to record; a session owned by another candidate
    /// is refused.
    pub async fn resolve(
        &self,
        candidate_id: &str,
        session_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        let Some(id) = session_id else {
            return Ok(None);
        };
        match self.sessions.read().await.get(&id) {
            Some(session) if session.candidate_id != candidate_id => Err(AppError::Validation(
                format!("Session {id} belongs to a different candidate"),
            )),
            Some(_) => Ok(Some(id)),
            None => Ok(None),
        }
    }

    pub async fn info(&self, session_id: Uuid) -> Result<SessionInfo, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|session| info_of(session_id, session))
            .ok_or_else(|| session_not_found(session_id))
    }

    /// Copy of the full history, oldest first.
    pub async fn history(&self, session_id: Uuid) -> Result<Vec<ConversationTurn>, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|session| session.turns.clone())
            .ok_or_else(|| session_not_found(session_id))
    }

    /// Appends an exchange in one step. Without a live session (none requested, or
    /// evicted since `resolve`) a new one is started for `candidate_id`.
    pub async fn record(
        &self,
        candidate_id: &str,
        session_id: Option<Uuid>,
        turns: impl IntoIterator<Item = ConversationTurn>,
    ) -> Uuid {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let id = session_id
            .filter(|id| sessions.contains_key(id))
            .unwrap_or_else(Uuid::new_v4);
        let session = sessions
            .entry(id)
            .or_insert_with(|| Session::new(candidate_id, now));
        session.turns.extend(turns);
        session.last_active = now;
        id
    }

    pub async fn candidate_of(&self, session_id: Uuid) -> Result<String, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .map(|session| session.candidate_id.clone())
            .ok_or_else(|| session_not_found(session_id))
    }

    /// Drops sessions with no activity for longer than `max_idle`. Returns how many.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_at(max_idle, Instant::now()).await
    }

    async fn evict_idle_at(&self, max_idle: Duration, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            now.saturating_duration_since(session.last_active) <= max_idle
        });
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn info_of(session_id: Uuid, session: &Session) -> SessionInfo {
    SessionInfo {
        session_id,
        candidate_id: session.candidate_id.clone(),
        created_at: session.created_at,
        message_count: session.turns.len(),
    }
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {session_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_record() {
        let store = SessionStore::new();
        let info = store.create("c1").await;
        assert_eq!(info.message_count, 0);

        let id = store
            .record(
                "c1",
                Some(info.session_id),
                [ConversationTurn::user("hi"), ConversationTurn::assistant("hello")],
            )
            .await;
        assert_eq!(id, info.session_id);

        let history = store.history(info.session_id).await.unwrap();
        assert_eq!(history[0].text, "hi");
        assert_eq!(history[1].text, "hello");
        assert_eq!(store.info(info.session_id).await.unwrap().message_count, 2);
    }

    #[tokio::test]
    async fn test_resolve_never_creates() {
        let store = SessionStore::new();
        let existing = store.create("c1").await.session_id;

        assert_eq!(store.resolve("c1", Some(existing)).await.unwrap(), Some(existing));
        assert_eq!(store.resolve("c1", Some(Uuid::new_v4())).await.unwrap(), None);
        assert_eq!(store.resolve("c1", None).await.unwrap(), None);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_record_without_live_session_starts_one() {
        let store = SessionStore::new();
        let id = store
            .record("c1", Some(Uuid::new_v4()), [ConversationTurn::user("hi")])
            .await;
        assert_eq!(store.candidate_of(id).await.unwrap(), "c1");
        assert_eq!(store.history(id).await.unwrap().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_refuses_foreign_session() {
        let store = SessionStore::new();
        let theirs = store.create("c2").await.session_id;
        assert!(matches!(
            store.resolve("c1", Some(theirs)).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.info(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.history(id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_history_is_a_snapshot() {
        let store = SessionStore::new();
        let id = store.create("c1").await.session_id;
        store.record("c1", Some(id), [ConversationTurn::user("one")]).await;
        let snapshot = store.history(id).await.unwrap();
        store.record("c1", Some(id), [ConversationTurn::user("two")]).await;
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_idle_sessions_are_evicted() {
        let store = SessionStore::new();
        let idle = store.create("c1").await.session_id;
        let busy = store.create("c2").await.session_id;

        let later = Instant::now() + Duration::from_secs(120);
        {
            let mut sessions = store.sessions.write().await;
            if let Some(session) = sessions.get_mut(&busy) {
                session.last_active = later;
            }
        }

        assert_eq!(store.evict_idle_at(Duration::from_secs(60), later).await, 1);
        assert!(store.info(idle).await.is_err());
        assert!(store.info(busy).await.is_ok());
    }
}
