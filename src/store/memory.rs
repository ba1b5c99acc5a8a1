//! In-memory stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CacheKey, CachedModel, GraphStore, ModelStore};
use crate::domain::{Depth, GraphSnapshot};
use crate::error::StoreError;

/// Model cache held in process memory
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    entries: RwLock<HashMap<CacheKey, CachedModel>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached models
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ModelStore for MemoryModelStore {
    async fn read_cached_model(&self, key: &CacheKey) -> Result<Option<CachedModel>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write_cached_model(
        &self,
        key: &CacheKey,
        text: String,
        moment: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.entries
            .write()
            .await
            .insert(key.clone(), CachedModel { text, moment });
        Ok(())
    }
}

/// Graph snapshots held in process memory, keyed by root
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    snapshots: RwLock<HashMap<String, GraphSnapshot>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the given snapshots
    pub fn with_snapshots(snapshots: impl IntoIterator<Item = GraphSnapshot>) -> Self {
        let snapshots = snapshots.into_iter().map(|s| (s.root.clone(), s)).collect();
        Self {
            snapshots: RwLock::new(snapshots),
        }
    }

    /// Add or replace the snapshot of its root
    pub async fn insert(&self, snapshot: GraphSnapshot) {
        self.snapshots
            .write()
            .await
            .insert(snapshot.root.clone(), snapshot);
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn read_snapshot(&self, root: &str, depth: Depth) -> Result<Option<GraphSnapshot>, StoreError> {
        Ok(self
            .snapshots
            .read()
            .await
            .get(root)
            .cloned()
            .map(|s| s.truncate(depth)))
    }

    async fn read_last_modified(&self, root: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.snapshots.read().await.get(root).map(|s| s.last_modified))
    }
}
