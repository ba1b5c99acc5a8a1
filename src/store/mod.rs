//! Graph snapshot and model cache storage
//!
//! This module provides:
//! - The graph store capability: snapshots and last-modified moments
//! - The model store capability: cached model text keyed by (root, depth)
//! - In-memory and file-backed implementations of both
//! - File-backed package records for refreshed version lists

mod file;
mod memory;

pub use file::{FileGraphStore, FileModelStore, FilePackageStore};
pub use memory::{MemoryGraphStore, MemoryModelStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{Depth, GraphSnapshot};
use crate::error::StoreError;

/// Identity of a cached model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub root: String,
    pub depth: Depth,
}

impl CacheKey {
    pub fn new(root: impl Into<String>, depth: Depth) -> Self {
        Self {
            root: root.into(),
            depth,
        }
    }

    /// File name of the entry; distinct keys never share a name
    pub fn file_name(&self) -> String {
        format!("{}@{}.json", encode_name(&self.root), i64::from(self.depth))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.root, self.depth)
    }
}

/// Cached model text with the moment it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedModel {
    pub text: String,
    pub moment: DateTime<Utc>,
}

impl CachedModel {
    /// Usable only if written strictly after the root was last modified
    pub fn is_fresh(&self, last_modified: DateTime<Utc>) -> bool {
        self.moment > last_modified
    }
}

/// Source of dependency-graph snapshots
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Snapshot of the graph below `root`, limited to `depth`
    async fn read_snapshot(&self, root: &str, depth: Depth) -> Result<Option<GraphSnapshot>, StoreError>;

    /// Moment the root's requirement file last changed
    async fn read_last_modified(&self, root: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
}

/// Persistent cache of serialized models
#[async_trait]
pub trait ModelStore: Send + Sync {
    async fn read_cached_model(&self, key: &CacheKey) -> Result<Option<CachedModel>, StoreError>;

    /// Replace the entry of `key`
    async fn write_cached_model(
        &self,
        key: &CacheKey,
        text: String,
        moment: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Percent-encode everything but unreserved characters, so `@`, `/` and
/// `%` never appear literally and the mapping stays injective.
pub(crate) fn encode_name(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}
