//! npm Registry provider
//!
//! Fetches package version information from the npm registry.
//! API endpoints:
//! - https://registry.npmjs.org/{package}
//! - https://registry.npmjs.org/{package}/{version}

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::domain::Ecosystem;
use crate::error::RegistryError;
use crate::registry::{or_empty, HttpClient, MetadataProvider};
use crate::version::compare_versions;

/// npm registry base URL
const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// npm Registry provider
pub struct NpmProvider {
    client: HttpClient,
}

/// npm package document
#[derive(Debug, Default, Deserialize)]
struct PackageDocument {
    /// Version manifests keyed by version
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
}

/// npm version manifest
#[derive(Debug, Default, Deserialize)]
struct VersionManifest {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

impl NpmProvider {
    /// Create a new npm provider
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for a package
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}", NPM_REGISTRY_URL, package)
    }

    fn version_url(&self, package: &str, version: &str) -> String {
        format!("{}/{}/{}", NPM_REGISTRY_URL, package, version)
    }
}

#[async_trait]
impl MetadataProvider for NpmProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn registry_name(&self) -> &'static str {
        "npm"
    }

    async fn list_versions(&self, package: &str) -> Result<Vec<String>, RegistryError> {
        let url = self.build_url(package);
        let document: PackageDocument = or_empty(
            self.client
                .get_json(&url, package, self.registry_name())
                .await,
        )?;

        let mut versions: Vec<String> = document.versions.into_keys().collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }

    async fn get_requirements(
        &self,
        package: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        let url = self.version_url(package, version);
        let manifest: VersionManifest = or_empty(
            self.client
                .get_json(&url, package, self.registry_name())
                .await,
        )?;
        Ok(manifest.dependencies)
    }
}
