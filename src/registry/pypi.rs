//! PyPI JSON API provider
//!
//! Fetches release lists and `requires_dist` metadata from PyPI.
//! API endpoints:
//! - https://pypi.org/pypi/{package}/json
//! - https://pypi.org/pypi/{package}/{version}/json

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::warn;

use crate::domain::Ecosystem;
use crate::error::RegistryError;
use crate::registry::{or_empty, HttpClient, MetadataProvider};
use crate::version::compare_versions;

/// PyPI API base URL
const PYPI_API_URL: &str = "https://pypi.org/pypi";

/// Project name at the start of a `requires_dist` entry
static REQUIREMENT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z0-9][A-Za-z0-9._-]*)\s*(.*)$").unwrap());

/// PyPI provider
pub struct PyPIProvider {
    client: HttpClient,
}

/// PyPI project metadata response
#[derive(Debug, Deserialize)]
struct ProjectResponse {
    /// Release files keyed by version
    releases: HashMap<String, serde_json::Value>,
}

/// PyPI release metadata response
#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    info: ReleaseInfo,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

impl PyPIProvider {
    /// Create a new PyPI provider
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn project_url(&self, package: &str) -> String {
        format!("{}/{}/json", PYPI_API_URL, package)
    }

    fn release_url(&self, package: &str, version: &str) -> String {
        format!("{}/{}/{}/json", PYPI_API_URL, package, version)
    }
}

/// Normalized project name (lowercase, runs of `.`, `_`, `-` become `-`)
fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '.' | '_' | '-') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}

/// Split a `requires_dist` entry into project name and constraint
///
/// The constraint keeps any extras and environment marker; the normalizer
/// decides whether they exclude the requirement.
fn parse_requirement(entry: &str) -> Option<(String, String)> {
    let caps = REQUIREMENT_NAME_RE.captures(entry)?;
    let name = normalize_name(&caps[1]);
    let constraint = caps[2].trim().to_string();
    Some((name, constraint))
}

#[async_trait]
impl MetadataProvider for PyPIProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPI
    }

    fn registry_name(&self) -> &'static str {
        "PyPI"
    }

    async fn list_versions(&self, package: &str) -> Result<Vec<String>, RegistryError> {
        let url = self.project_url(package);
        let response = or_empty(
            self.client
                .get_json::<ProjectResponse>(&url, package, self.registry_name())
                .await
                .map(Some),
        )?;
        let Some(response) = response else {
            return Ok(Vec::new());
        };

        let mut versions: Vec<String> = response.releases.into_keys().collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }

    async fn get_requirements(
        &self,
        package: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        let url = self.release_url(package, version);
        let response = or_empty(
            self.client
                .get_json::<ReleaseResponse>(&url, package, self.registry_name())
                .await
                .map(Some),
        )?;

        let mut requirements = BTreeMap::new();
        let entries = response
            .and_then(|r| r.info.requires_dist)
            .unwrap_or_default();
        for entry in entries {
            match parse_requirement(&entry) {
                // The first entry per project wins
                Some((name, constraint)) => {
                    requirements.entry(name).or_insert(constraint);
                }
                None => warn!(package, version, entry = %entry, "unparseable requires_dist entry"),
            }
        }
        Ok(requirements)
    }
}
