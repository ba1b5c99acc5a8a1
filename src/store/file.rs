//! File-backed stores
//!
//! Names are percent-encoded in file names. Snapshots live in
//! `<dir>/<root>.json`. Cached models live in
//! `<dir>/<root>@<depth>.json` and package records in
//! `<dir>/<ecosystem>/<name>.json`. Written entries are replaced by writing
//! a temporary file and renaming it over the entry, so readers never see a
//! partial write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::{encode_name, CacheKey, CachedModel, GraphStore, ModelStore};
use crate::domain::{Depth, Ecosystem, GraphSnapshot, Package};
use crate::error::StoreError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Read a file, mapping a missing file to `None`
async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::read_error(path, e)),
    }
}

/// Serialize `value` and replace the file at `path` with it
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::write_error(dir, e))?;

    let body = serde_json::to_string(value).map_err(|e| StoreError::write_error(path, std::io::Error::other(e)))?;

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp = dir.join(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    tokio::fs::write(&temp, body)
        .await
        .map_err(|e| StoreError::write_error(&temp, e))?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(StoreError::write_error(path, e));
    }
    Ok(())
}

/// Model cache with one file per key
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
}

impl FileModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

#[async_trait]
impl ModelStore for FileModelStore {
    async fn read_cached_model(&self, key: &CacheKey) -> Result<Option<CachedModel>, StoreError> {
        let path = self.path_of(key);
        let Some(text) = read_optional(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CachedModel>(&text) {
            Ok(cached) => Ok(Some(cached)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache entry, ignoring it");
                Ok(None)
            }
        }
    }

    async fn write_cached_model(
        &self,
        key: &CacheKey,
        text: String,
        moment: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let path = self.path_of(key);
        write_json(&path, &CachedModel { text, moment }).await?;
        debug!(key = %key, path = %path.display(), "cache entry written");
        Ok(())
    }
}

/// Graph snapshots read from `<dir>/<root>.json`
#[derive(Debug, Clone)]
pub struct FileGraphStore {
    dir: PathBuf,
}

impl FileGraphStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_of(&self, root: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_name(root)))
    }

    async fn load(&self, root: &str) -> Result<Option<GraphSnapshot>, StoreError> {
        let path = self.path_of(root);
        let Some(text) = read_optional(&path).await? else {
            debug!(root, path = %path.display(), "no snapshot for root");
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StoreError::MalformedSnapshot {
                path,
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl GraphStore for FileGraphStore {
    async fn read_snapshot(&self, root: &str, depth: Depth) -> Result<Option<GraphSnapshot>, StoreError> {
        Ok(self.load(root).await?.map(|s| s.truncate(depth)))
    }

    async fn read_last_modified(&self, root: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.load(root).await?.map(|s| s.last_modified))
    }
}

/// Package records with their numbered versions
#[derive(Debug, Clone)]
pub struct FilePackageStore {
    dir: PathBuf,
}

impl FilePackageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_of(&self, ecosystem: Ecosystem, name: &str) -> PathBuf {
        self.dir
            .join(ecosystem.to_string().to_lowercase())
            .join(format!("{}.json", encode_name(name)))
    }

    /// Stored record of a package; an unreadable record counts as absent
    pub async fn read_package(&self, ecosystem: Ecosystem, name: &str) -> Result<Option<Package>, StoreError> {
        let path = self.path_of(ecosystem, name);
        let Some(text) = read_optional(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Package>(&text) {
            Ok(package) => Ok(Some(package)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable package record, ignoring it");
                Ok(None)
            }
        }
    }

    /// Replace the record of a package
    pub async fn write_package(&self, package: &Package) -> Result<(), StoreError> {
        let path = self.path_of(package.ecosystem, &package.name);
        write_json(&path, package).await?;
        debug!(package = %package.name, path = %path.display(), "package record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ecosystem, RequirementEdge};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn moment() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_model_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileModelStore::new(dir.path().join("cache"));
        let key = CacheKey::new("app", Depth::Levels(2));

        assert!(store.read_cached_model(&key).await.unwrap().is_none());
        store
            .write_cached_model(&key, "{\"format\":1}".to_string(), moment())
            .await
            .unwrap();
        let cached = store.read_cached_model(&key).await.unwrap().unwrap();
        assert_eq!(cached.text, "{\"format\":1}");
        assert_eq!(cached.moment, moment());
    }

    #[tokio::test]
    async fn test_write_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let store = FileModelStore::new(dir.path());
        let key = CacheKey::new("app", Depth::Unbounded);
        store.write_cached_model(&key, "a".to_string(), moment()).await.unwrap();
        store.write_cached_model(&key, "b".to_string(), moment()).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![key.file_name()]);
    }

    #[tokio::test]
    async fn test_similar_roots_do_not_share_an_entry() {
        let dir = TempDir::new().unwrap();
        let store = FileModelStore::new(dir.path());
        let slash = CacheKey::new("org/app", Depth::Unbounded);
        store
            .write_cached_model(&slash, "model of org/app".to_string(), moment())
            .await
            .unwrap();

        for other in ["org:app", "org@app", "org_app"] {
            let key = CacheKey::new(other, Depth::Unbounded);
            assert!(store.read_cached_model(&key).await.unwrap().is_none(), "{} hit", other);
        }
        let cached = store.read_cached_model(&slash).await.unwrap().unwrap();
        assert_eq!(cached.text, "model of org/app");
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let store = FileModelStore::new(dir.path());
        let key = CacheKey::new("app", Depth::Unbounded);
        std::fs::write(dir.path().join(key.file_name()), "garbage").unwrap();
        assert!(store.read_cached_model(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_graph_store() {
        let dir = TempDir::new().unwrap();
        let snapshot = GraphSnapshot::new("app", Ecosystem::Cargo, moment())
            .with_edge(RequirementEdge::direct("serde", "1.0"));
        std::fs::write(
            dir.path().join("app.json"),
            serde_json::to_string(&snapshot).unwrap(),
        )
        .unwrap();

        let store = FileGraphStore::new(dir.path());
        let read = store.read_snapshot("app", Depth::Unbounded).await.unwrap().unwrap();
        assert_eq!(read, snapshot);
        assert_eq!(store.read_last_modified("app").await.unwrap(), Some(moment()));
        assert!(store.read_snapshot("missing", Depth::Unbounded).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app.json"), "{").unwrap();
        let store = FileGraphStore::new(dir.path());
        let err = store.read_snapshot("app", Depth::Unbounded).await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedSnapshot { .. }));
    }

    #[tokio::test]
    async fn test_package_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FilePackageStore::new(dir.path());
        assert!(store.read_package(Ecosystem::Maven, "org.slf4j:slf4j-api").await.unwrap().is_none());

        let mut package = Package::new(Ecosystem::Maven, "org.slf4j:slf4j-api", moment());
        package.versions.push(crate::domain::Version::new("2.0.13", 7));
        store.write_package(&package).await.unwrap();

        let read = store
            .read_package(Ecosystem::Maven, "org.slf4j:slf4j-api")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read, package);
        assert!(store.read_package(Ecosystem::Npm, "org.slf4j:slf4j-api").await.unwrap().is_none());
        assert!(store.read_package(Ecosystem::Maven, "org.slf4j_slf4j-api").await.unwrap().is_none());
    }
}
