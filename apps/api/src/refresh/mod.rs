//! Async Embedding Refresh Queue: recomputes embeddings off the request path.
//!
//! `enqueue` never blocks: it `try_send`s into a bounded channel and reports a full
//! queue as `EnqueueError::QueueFull`. A fixed pool of tokio workers shares the receiver;
//! each job is received by exactly one worker, which embeds the text and upserts the
//! vector into the similarity index. Failed attempts are retried in place with
//! exponential backoff up to `max_attempts`, after which the job is counted as failed
//! and dropped. Results only influence the next similarity search.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::models::job::JobPosting;
use crate::providers::{EntityKind, Embedder, ProviderError, SimilarityIndex};

#[derive(Debug, Clone)]
pub struct RefreshJob {
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub new_text: String,
    pub enqueued_at: DateTime<Utc>,
    pub attempts: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("refresh queue is full")]
    QueueFull,

    #[error("refresh queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Jobs a worker is processing right now, including retry backoff.
    pub running: u64,
    /// Accepted jobs that have not reached a terminal state yet (queued or running).
    pub pending: u64,
    pub completed: u64,
    pub failed: u64,
    pub enqueued: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub workers: usize,
    pub capacity: usize,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            workers: 2,
            capacity: 256,
            max_attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Default)]
struct Counters {
    running: AtomicU64,
    pending: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    enqueued: AtomicU64,
    rejected: AtomicU64,
}

/// Producer handle. Cloning is cheap; every clone feeds the same workers.
#[derive(Clone)]
pub struct RefreshQueue {
    sender: mpsc::Sender<RefreshJob>,
    counters: Arc<Counters>,
}

impl RefreshQueue {
    /// Spawns the worker pool on the current tokio runtime.
    pub fn start(
        settings: RefreshSettings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(settings.capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());
        let settings = Arc::new(settings);

        for worker_id in 0..settings.workers.max(1) {
            let receiver = receiver.clone();
            let counters = counters.clone();
            let settings = settings.clone();
            let embedder = embedder.clone();
            let index = index.clone();

            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(job) = next else { break };
                    process(job, &*embedder, &*index, &settings, &counters).await;
                }
                debug!(worker_id, "refresh worker stopped");
            });
        }

        info!(
            workers = settings.workers.max(1),
            capacity = settings.capacity.max(1),
            embedder = embedder.name(),
            "refresh queue started"
        );

        Self { sender, counters }
    }

    pub fn enqueue(
        &self,
        entity_id: &str,
        entity_kind: EntityKind,
        new_text: String,
    ) -> Result<(), EnqueueError> {
        let job = RefreshJob {
            entity_id: entity_id.to_string(),
            entity_kind,
            new_text,
            enqueued_at: Utc::now(),
            attempts: 0,
        };

        // Counted before sending so a fast worker never decrements below zero.
        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(job) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
                debug!(entity_id, kind = entity_kind.as_str(), "refresh enqueued");
                Ok(())
            }
            Err(e) => {
                self.counters.pending.fetch_sub(1, Ordering::SeqCst);
                self.counters.rejected.fetch_add(1, Ordering::SeqCst);
                let err = match e {
                    mpsc::error::TrySendError::Full(_) => EnqueueError::QueueFull,
                    mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
                };
                warn!(entity_id, kind = entity_kind.as_str(), "refresh rejected: {err}");
                Err(err)
            }
        }
    }

    /// Enqueues every posting, waiting for room instead of rejecting. Meant for the
    /// startup warm-up task, never for request handlers.
    pub async fn warm_jobs(&self, jobs: &[JobPosting]) -> usize {
        let mut accepted = 0;
        for job in jobs {
            let refresh = RefreshJob {
                entity_id: job.id.clone(),
                entity_kind: EntityKind::Job,
                new_text: job.to_embedding_text(),
                enqueued_at: Utc::now(),
                attempts: 0,
            };
            self.counters.pending.fetch_add(1, Ordering::SeqCst);
            if self.sender.send(refresh).await.is_err() {
                self.counters.pending.fetch_sub(1, Ordering::SeqCst);
                self.counters.rejected.fetch_add(1, Ordering::SeqCst);
                warn!("refresh queue closed during warm-up");
                break;
            }
            self.counters.enqueued.fetch_add(1, Ordering::SeqCst);
            accepted += 1;
        }
        info!(accepted, total = jobs.len(), "job embeddings queued for warm-up");
        accepted
    }

    pub fn status(&self) -> QueueStatus {
        let c = &self.counters;
        QueueStatus {
            running: c.running.load(Ordering::SeqCst),
            pending: c.pending.load(Ordering::SeqCst),
            completed: c.completed.load(Ordering::SeqCst),
            failed: c.failed.load(Ordering::SeqCst),
            enqueued: c.enqueued.load(Ordering::SeqCst),
            rejected: c.rejected.load(Ordering::SeqCst),
        }
    }
}

async fn process(
    mut job: RefreshJob,
    embedder: &dyn Embedder,
    index: &dyn SimilarityIndex,
    settings: &RefreshSettings,
    counters: &Counters,
) {
    counters.running.fetch_add(1, Ordering::SeqCst);

    let outcome = loop {
        job.attempts += 1;
        match refresh_once(&job, embedder, index).await {
            Ok(()) => break Ok(()),
            Err(e) if job.attempts < settings.max_attempts => {
                let delay = backoff(settings.base_backoff, job.attempts);
                warn!(
                    entity_id = %job.entity_id,
                    attempt = job.attempts,
                    "refresh failed, retrying after {}ms: {e}",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => break Err(e),
        }
    };

    // Terminal counter first, then pending, so pending + completed + failed never dips.
    match outcome {
        Ok(()) => {
            counters.completed.fetch_add(1, Ordering::SeqCst);
            debug!(
                entity_id = %job.entity_id,
                kind = job.entity_kind.as_str(),
                attempts = job.attempts,
                queued_ms = (Utc::now() - job.enqueued_at).num_milliseconds(),
                "embedding refreshed"
            );
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::SeqCst);
            error!(
                entity_id = %job.entity_id,
                kind = job.entity_kind.as_str(),
                attempts = job.attempts,
                "embedding refresh failed permanently: {e}"
            );
        }
    }
    counters.pending.fetch_sub(1, Ordering::SeqCst);
    counters.running.fetch_sub(1, Ordering::SeqCst);
}

async fn refresh_once(
    job: &RefreshJob,
    embedder: &dyn Embedder,
    index: &dyn SimilarityIndex,
) -> Result<(), ProviderError> {
    let vector = embedder.embed(&job.new_text).await?;
    index.upsert(job.entity_kind, &job.entity_id, vector).await
}

/// `base`, `2 × base`, `4 × base`, … capped at `64 × base`.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * (1u32 << attempt.saturating_sub(1).min(6))
}
