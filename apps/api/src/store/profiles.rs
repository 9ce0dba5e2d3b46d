//! Profile Store: authoritative, persisted candidate profiles.
//!
//! Each profile sits behind its own `tokio::sync::Mutex`, so mutations of one candidate
//! are serialized while different candidates never block each other. The outer
//! `RwLock` only guards the id → slot map. A mutation is computed on a copy, persisted,
//! and only then committed: a failed save leaves the profile untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::candidate::CandidateProfile;
use crate::preferences::extractor::extract_delta;
use crate::preferences::{InvalidPreferenceValue, PreferenceDelta, PreferenceField};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub profile: CandidateProfile,
    pub changed: BTreeSet<PreferenceField>,
    pub rejected: Vec<InvalidPreferenceValue>,
}

#[derive(Debug, Clone)]
pub struct DeclineOutcome {
    pub profile: CandidateProfile,
    /// Ids that were not already declined.
    pub newly_declined: Vec<String>,
}

pub struct ProfileStore {
    profiles: RwLock<HashMap<String, Arc<Mutex<CandidateProfile>>>>,
    backend: Arc<dyn RecordStore<CandidateProfile>>,
}

impl ProfileStore {
    /// Loads every persisted profile into memory.
    pub async fn load(backend: Arc<dyn RecordStore<CandidateProfile>>) -> Result<Self> {
        let records = backend.load_all().await?;
        let profiles: HashMap<String, Arc<Mutex<CandidateProfile>>> = records
            .into_iter()
            .map(|profile| (profile.id.clone(), Arc::new(Mutex::new(profile))))
            .collect();
        info!(count = profiles.len(), "candidate profiles loaded");

        Ok(Self {
            profiles: RwLock::new(profiles),
            backend,
        })
    }

    /// Adds a new profile. The id is reserved before the write, so concurrent creates
    /// with one id see exactly one winner; a failed write releases it again.
    pub async fn create(&self, profile: CandidateProfile) -> Result<(), AppError> {
        let slot = Arc::new(Mutex::new(profile.clone()));
        let guard = slot.clone().lock_owned().await;
        {
            let mut profiles = self.profiles.write().await;
            if profiles.contains_key(&profile.id) {
                return Err(AppError::Validation(format!(
                    "Candidate {} already exists",
                    profile.id
                )));
            }
            profiles.insert(profile.id.clone(), slot);
        }

        if let Err(e) = self.backend.save(&profile.id, &profile).await {
            self.profiles.write().await.remove(&profile.id);
            drop(guard);
            return Err(storage_error(e));
        }
        drop(guard);
        info!(candidate_id = %profile.id, "candidate created");
        Ok(())
    }

    pub async fn exists(&self, candidate_id: &str) -> bool {
        self.profiles.read().await.contains_key(candidate_id)
    }

    /// Snapshot of one profile.
    pub async fn get(&self, candidate_id: &str) -> Result<CandidateProfile, AppError> {
        let slot = self.slot(candidate_id).await?;
        let profile = slot.lock().await.clone();
        Ok(profile)
    }

    /// Snapshots of every profile, ordered by id.
    pub async fn list(&self) -> Vec<CandidateProfile> {
        let slots: Vec<Arc<Mutex<CandidateProfile>>> =
            self.profiles.read().await.values().cloned().collect();
        let mut profiles = Vec::with_capacity(slots.len());
        for slot in slots {
            profiles.push(slot.lock().await.clone());
        }
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }

    /// Runs the preference extractor on `message` and applies the result.
    /// No signal means no write.
    pub async fn apply_message(
        &self,
        candidate_id: &str,
        message: &str,
    ) -> Result<ProfileUpdate, AppError> {
        let (delta, rejected) = extract_delta(message);
        let mut update = self.apply_delta(candidate_id, &delta).await?;
        update.rejected = rejected;
        Ok(update)
    }

    /// Applies `delta` as one unit under the candidate's lock.
    pub async fn apply_delta(
        &self,
        candidate_id: &str,
        delta: &PreferenceDelta,
    ) -> Result<ProfileUpdate, AppError> {
        let (profile, changed) = self
            .mutate(candidate_id, |profile| {
                let changed = delta.apply(profile);
                (!changed.is_empty(), changed)
            })
            .await?;

        if !changed.is_empty() {
            debug!(candidate_id, ?changed, "preferences updated");
        }
        Ok(ProfileUpdate {
            profile,
            changed,
            rejected: Vec::new(),
        })
    }

    /// Records `job_id` as accepted, replacing any earlier acceptance.
    pub async fn accept(
        &self,
        candidate_id: &str,
        job_id: &str,
    ) -> Result<CandidateProfile, AppError> {
        let (profile, _) = self
            .mutate(candidate_id, |profile| {
                let dirty = profile.accepted_job_id.as_deref() != Some(job_id);
                profile.accepted_job_id = Some(job_id.to_string());
                (dirty, ())
            })
            .await?;
        info!(candidate_id, job_id, "job accepted");
        Ok(profile)
    }

    /// Adds `job_ids` to the declined list, skipping ids already present.
    pub async fn decline(
        &self,
        candidate_id: &str,
        job_ids: &[String],
    ) -> Result<DeclineOutcome, AppError> {
        let (profile, newly_declined) = self
            .mutate(candidate_id, |profile| {
                let mut added = Vec::new();
                for job_id in job_ids {
                    if !profile.has_declined(job_id) {
                        profile.declined_job_ids.push(job_id.clone());
                        added.push(job_id.clone());
                    }
                }
                (!added.is_empty(), added)
            })
            .await?;
        info!(candidate_id, count = newly_declined.len(), "jobs declined");
        Ok(DeclineOutcome {
            profile,
            newly_declined,
        })
    }

    async fn slot(&self, candidate_id: &str) -> Result<Arc<Mutex<CandidateProfile>>, AppError> {
        self.profiles
            .read()
            .await
            .get(candidate_id)
            .cloned()
            .ok_or_else(|| AppError::candidate_not_found(candidate_id))
    }

    /// Applies `f` to a copy of the profile. When `f` reports a change, the copy is
    /// persisted and then committed.
    async fn mutate<R>(
        &self,
        candidate_id: &str,
        f: impl FnOnce(&mut CandidateProfile) -> (bool, R),
    ) -> Result<(CandidateProfile, R), AppError> {
        let slot = self.slot(candidate_id).await?;
        let mut guard = slot.lock().await;

        let mut next = guard.clone();
        let (dirty, result) = f(&mut next);
        if dirty {
            self.backend
                .save(candidate_id, &next)
                .await
                .map_err(storage_error)?;
            *guard = next.clone();
        }
        Ok((next, result))
    }
}

fn storage_error(e: anyhow::Error) -> AppError {
    AppError::Storage(format!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::LocationType;
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    async fn store_with(profile: CandidateProfile) -> ProfileStore {
        let backend: Arc<dyn RecordStore<CandidateProfile>> = Arc::new(MemoryStore::new());
        backend.save(&profile.id, &profile).await.unwrap();
        ProfileStore::load(backend).await.unwrap()
    }

    fn candidate(id: &str) -> CandidateProfile {
        CandidateProfile {
            id: id.to_string(),
            name: "Sam".to_string(),
            ..CandidateProfile::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_candidate_is_not_found() {
        let store = store_with(candidate("c1")).await;
        assert!(matches!(store.get("nope").await, Err(AppError::NotFound(_))));
        assert!(matches!(
            store.accept("nope", "j1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(!store.exists("nope").await);
    }

    #[tokio::test]
    async fn test_apply_message_persists_changes() {
        let backend = Arc::new(MemoryStore::new());
        backend.save("c1", &candidate("c1")).await.unwrap();
        let store = ProfileStore::load(backend.clone()).await.unwrap();

        let update = store
            .apply_message("c1", "I want $20,000 minimum, fully remote, driver jobs")
            .await
            .unwrap();
        assert_eq!(update.changed.len(), 3);

        let persisted = backend.load("c1").await.unwrap().unwrap();
        assert_eq!(persisted.min_salary, 20_000);
        assert_eq!(persisted.preferred_location_types, vec![LocationType::Remote]);
        assert_eq!(store.get("c1").await.unwrap(), persisted);
    }

    #[tokio::test]
    async fn test_decline_is_deduplicated() {
        let store = store_with(candidate("c1")).await;
        let first = store
            .decline("c1", &["j1".to_string(), "j2".to_string()])
            .await
            .unwrap();
        assert_eq!(first.newly_declined, vec!["j1", "j2"]);

        let second = store
            .decline("c1", &["j2".to_string(), "j3".to_string()])
            .await
            .unwrap();
        assert_eq!(second.newly_declined, vec!["j3"]);
        assert_eq!(second.profile.declined_job_ids, vec!["j1", "j2", "j3"]);
    }

    #[tokio::test]
    async fn test_accept_overwrites_previous() {
        let store = store_with(candidate("c1")).await;
        store.accept("c1", "j1").await.unwrap();
        let profile = store.accept("c1", "j2").await.unwrap();
        assert_eq!(profile.accepted_job_id.as_deref(), Some("j2"));
    }

    #[tokio::test]
    async fn test_concurrent_declines_are_all_recorded() {
        let store = Arc::new(store_with(candidate("c1")).await);
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.decline("c1", &[format!("j{i}")]).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(store.get("c1").await.unwrap().declined_job_ids.len(), 20);
    }

    #[tokio::test]
    async fn test_concurrent_creates_have_one_winner() {
        let backend: Arc<MemoryStore<CandidateProfile>> = Arc::new(MemoryStore::new());
        let store = Arc::new(ProfileStore::load(backend.clone()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let profile = CandidateProfile {
                    name: format!("Sam {i}"),
                    ..candidate("c9")
                };
                store.create(profile).await
            }));
        }
        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => created += 1,
                Err(e) => assert!(matches!(e, AppError::Validation(_))),
            }
        }
        assert_eq!(created, 1);

        let stored = store.get("c9").await.unwrap();
        assert_eq!(backend.load("c9").await.unwrap().unwrap(), stored);
    }

    /// Blocks saves for `c1` until released; other ids save straight through.
    struct GatedStore {
        inner: MemoryStore<CandidateProfile>,
        gate: Arc<tokio::sync::Semaphore>,
        entered: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl RecordStore<CandidateProfile> for GatedStore {
        async fn load(&self, id: &str) -> Result<Option<CandidateProfile>> {
            self.inner.load(id).await
        }

        async fn load_all(&self) -> Result<Vec<CandidateProfile>> {
            self.inner.load_all().await
        }

        async fn save(&self, id: &str, record: &CandidateProfile) -> Result<()> {
            if id == "c1" {
                self.entered.notify_one();
                self.gate.acquire().await?.forget();
            }
            self.inner.save(id, record).await
        }
    }

    #[tokio::test]
    async fn test_mutation_of_one_candidate_does_not_block_another() {
        let inner: MemoryStore<CandidateProfile> = MemoryStore::new();
        inner.save("c1", &candidate("c1")).await.unwrap();
        inner.save("c2", &candidate("c2")).await.unwrap();
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let entered = Arc::new(tokio::sync::Notify::new());
        let backend = GatedStore {
            inner,
            gate: gate.clone(),
            entered: entered.clone(),
        };
        let store = Arc::new(ProfileStore::load(Arc::new(backend)).await.unwrap());

        let held = {
            let store = store.clone();
            tokio::spawn(async move { store.decline("c1", &["j1".to_string()]).await })
        };
        entered.notified().await;

        let other = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            store.decline("c2", &["j1".to_string()]),
        )
        .await
        .expect("c2 decline blocked behind c1")
        .unwrap();
        assert_eq!(other.newly_declined, vec!["j1"]);
        assert!(!held.is_finished());

        gate.add_permits(1);
        let first = held.await.unwrap().unwrap();
        assert_eq!(first.profile.declined_job_ids, vec!["j1"]);
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore<CandidateProfile> for FailingStore {
        async fn load(&self, _id: &str) -> Result<Option<CandidateProfile>> {
            Ok(None)
        }

        async fn load_all(&self) -> Result<Vec<CandidateProfile>> {
            Ok(vec![candidate("c1")])
        }

        async fn save(&self, _id: &str, _record: &CandidateProfile) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn test_failed_save_leaves_profile_unchanged() {
        let store = ProfileStore::load(Arc::new(FailingStore)).await.unwrap();
        let result = store.apply_message("c1", "minimum $50k").await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(store.get("c1").await.unwrap().min_salary, 0);

        assert!(matches!(
            store.create(candidate("c2")).await,
            Err(AppError::Storage(_))
        ));
        assert!(!store.exists("c2").await);
    }

    #[tokio::test]
    async fn test_no_signal_skips_write() {
        let store = ProfileStore::load(Arc::new(FailingStore)).await.unwrap();
        let update = store.apply_message("c1", "hello there").await.unwrap();
        assert!(update.changed.is_empty());
    }
}
