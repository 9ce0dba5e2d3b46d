//! Durable record storage and the in-memory stores built on top of it.

pub mod file;
pub mod jobs;
pub mod profiles;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

/// Keyed persistence for one record type. Within a process the store is treated as
/// always consistent: a successful `save` is visible to the next `load`.
#[async_trait]
pub trait RecordStore<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self, id: &str) -> Result<Option<T>>;

    async fn load_all(&self) -> Result<Vec<T>>;

    async fn save(&self, id: &str, record: &T) -> Result<()>;
}

/// Non-durable store, used in tests and when running without a data directory.
pub struct MemoryStore<T> {
    records: RwLock<HashMap<String, T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> RecordStore<T> for MemoryStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self, id: &str) -> Result<Option<T>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<T>> {
        let records = self.records.read().await;
        let mut ids: Vec<&String> = records.keys().collect();
        ids.sort();
        Ok(ids.into_iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    async fn save(&self, id: &str, record: &T) -> Result<()> {
        self.records
            .write()
            .await
            .insert(id.to_string(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store: MemoryStore<Vec<u32>> = MemoryStore::new();
        assert_eq!(store.load("a").await.unwrap(), None);

        store.save("b", &vec![2]).await.unwrap();
        store.save("a", &vec![1]).await.unwrap();
        assert_eq!(store.load("a").await.unwrap(), Some(vec![1]));
        assert_eq!(store.load_all().await.unwrap(), vec![vec![1], vec![2]]);
    }
}
