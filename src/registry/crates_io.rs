//! crates.io API provider
//!
//! Fetches crate versions and their dependencies from crates.io.
//! API endpoints:
//! - https://crates.io/api/v1/crates/{crate}
//! - https://crates.io/api/v1/crates/{crate}/{version}/dependencies
//!
//! Note: crates.io requires a User-Agent header (handled by HttpClient)
//! and has rate limiting (1 request/second).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::Semaphore;
use tokio::time::{Duration, Instant};

use crate::domain::Ecosystem;
use crate::error::RegistryError;
use crate::registry::{or_empty, HttpClient, MetadataProvider};
use crate::version::compare_versions;

/// crates.io API base URL
const CRATES_IO_API_URL: &str = "https://crates.io/api/v1/crates";

/// Rate limit: 1 request per second
const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

/// crates.io provider with rate limiting
pub struct CratesIoProvider {
    client: HttpClient,
    rate_limiter: Semaphore,
    last_request: Mutex<Option<Instant>>,
}

/// crates.io crate response
#[derive(Debug, Default, Deserialize)]
struct CrateResponse {
    #[serde(default)]
    versions: Vec<CrateVersion>,
}

/// Crate version information
#[derive(Debug, Deserialize)]
struct CrateVersion {
    /// Version number
    num: String,
    /// Whether this version is yanked
    #[serde(default)]
    yanked: bool,
}

/// crates.io dependencies response
#[derive(Debug, Default, Deserialize)]
struct DependenciesResponse {
    #[serde(default)]
    dependencies: Vec<CrateDependency>,
}

#[derive(Debug, Deserialize)]
struct CrateDependency {
    crate_id: String,
    req: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    optional: bool,
}

impl CrateDependency {
    /// Normal, non-optional dependencies are the ones every build needs
    fn is_required(&self) -> bool {
        !self.optional && self.kind.as_deref().is_none_or(|k| k == "normal")
    }
}

impl CratesIoProvider {
    /// Create a new crates.io provider
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            rate_limiter: Semaphore::new(1),
            last_request: Mutex::new(None),
        }
    }

    /// Build the URL for a crate
    fn build_url(&self, crate_name: &str) -> String {
        format!("{}/{}", CRATES_IO_API_URL, crate_name)
    }

    fn dependencies_url(&self, crate_name: &str, version: &str) -> String {
        format!("{}/{}/{}/dependencies", CRATES_IO_API_URL, crate_name, version)
    }

    /// Apply rate limiting before making a request
    async fn apply_rate_limit(&self) {
        // The semaphore is never closed
        let Ok(_permit) = self.rate_limiter.acquire().await else {
            return;
        };

        let elapsed = {
            let last_request = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
            last_request.map(|t| t.elapsed())
        };

        if let Some(elapsed) = elapsed {
            if elapsed < RATE_LIMIT_INTERVAL {
                tokio::time::sleep(RATE_LIMIT_INTERVAL - elapsed).await;
            }
        }

        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }
}

#[async_trait]
impl MetadataProvider for CratesIoProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cargo
    }

    fn registry_name(&self) -> &'static str {
        "crates.io"
    }

    async fn list_versions(&self, crate_name: &str) -> Result<Vec<String>, RegistryError> {
        self.apply_rate_limit().await;

        let url = self.build_url(crate_name);
        let response: CrateResponse = or_empty(
            self.client
                .get_json(&url, crate_name, self.registry_name())
                .await,
        )?;

        let mut versions: Vec<String> = response
            .versions
            .into_iter()
            .filter(|v| !v.yanked)
            .map(|v| v.num)
            .collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }

    async fn get_requirements(
        &self,
        crate_name: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        self.apply_rate_limit().await;

        let url = self.dependencies_url(crate_name, version);
        let response: DependenciesResponse = or_empty(
            self.client
                .get_json(&url, crate_name, self.registry_name())
                .await,
        )?;

        Ok(response
            .dependencies
            .into_iter()
            .filter(CrateDependency::is_required)
            .map(|d| (d.crate_id, d.req))
            .collect())
    }
}
