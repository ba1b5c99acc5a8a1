//! RubyGems Registry provider
//!
//! Fetches gem versions and runtime dependencies from RubyGems.
//! API endpoints:
//! - https://rubygems.org/api/v1/versions/{gem}.json
//! - https://rubygems.org/api/v2/rubygems/{gem}/versions/{version}.json

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::domain::Ecosystem;
use crate::error::RegistryError;
use crate::registry::{or_empty, HttpClient, MetadataProvider};
use crate::version::compare_versions;

/// RubyGems registry base URL
const RUBYGEMS_URL: &str = "https://rubygems.org/api";

/// RubyGems Registry provider
pub struct RubyGemsProvider {
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct GemVersion {
    number: String,
    #[serde(default)]
    platform: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GemVersionDetail {
    #[serde(default)]
    dependencies: GemDependencies,
}

#[derive(Debug, Default, Deserialize)]
struct GemDependencies {
    #[serde(default)]
    runtime: Vec<GemDependency>,
}

#[derive(Debug, Deserialize)]
struct GemDependency {
    name: String,
    requirements: String,
}

impl RubyGemsProvider {
    /// Create a new RubyGems provider
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the URL for a gem
    fn build_url(&self, gem: &str) -> String {
        format!("{}/v1/versions/{}.json", RUBYGEMS_URL, gem)
    }

    fn version_url(&self, gem: &str, version: &str) -> String {
        format!("{}/v2/rubygems/{}/versions/{}.json", RUBYGEMS_URL, gem, version)
    }
}

#[async_trait]
impl MetadataProvider for RubyGemsProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::RubyGems
    }

    fn registry_name(&self) -> &'static str {
        "RubyGems"
    }

    async fn list_versions(&self, gem: &str) -> Result<Vec<String>, RegistryError> {
        let url = self.build_url(gem);
        let listed: Vec<GemVersion> = or_empty(self.client.get_json(&url, gem, self.registry_name()).await)?;

        // Platform builds share the number of the pure-Ruby release
        let mut versions: Vec<String> = listed
            .into_iter()
            .filter(|v| v.platform.as_deref().is_none_or(|p| p == "ruby"))
            .map(|v| v.number)
            .collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup();
        Ok(versions)
    }

    async fn get_requirements(
        &self,
        gem: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        let url = self.version_url(gem, version);
        let detail: GemVersionDetail = or_empty(self.client.get_json(&url, gem, self.registry_name()).await)?;
        Ok(detail
            .dependencies
            .runtime
            .into_iter()
            .map(|d| (d.name, d.requirements))
            .collect())
    }
}
