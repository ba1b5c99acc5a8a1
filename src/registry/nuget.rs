//! NuGet registration provider
//!
//! Fetches package versions and dependency groups from the NuGet
//! registration index.
//! API endpoint: https://api.nuget.org/v3/registration5-gz-semver2/{package}/index.json
//!
//! Index pages either inline their leaves or link to them by `@id`; linked
//! pages are fetched one by one.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::domain::Ecosystem;
use crate::error::RegistryError;
use crate::registry::{or_empty, HttpClient, MetadataProvider};
use crate::version::compare_versions;

/// NuGet registration base URL
const NUGET_REGISTRATION_URL: &str = "https://api.nuget.org/v3/registration5-gz-semver2";

/// NuGet provider
pub struct NuGetProvider {
    client: HttpClient,
}

/// Registration index
#[derive(Debug, Default, Deserialize)]
struct RegistrationIndex {
    #[serde(default)]
    items: Vec<RegistrationPage>,
}

/// Registration page, with leaves inlined or behind `@id`
#[derive(Debug, Default, Deserialize)]
struct RegistrationPage {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(default)]
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
struct RegistrationLeaf {
    #[serde(rename = "catalogEntry")]
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    version: String,
    #[serde(default, rename = "dependencyGroups")]
    dependency_groups: Vec<DependencyGroup>,
}

#[derive(Debug, Deserialize)]
struct DependencyGroup {
    #[serde(default, rename = "targetFramework")]
    target_framework: Option<String>,
    #[serde(default)]
    dependencies: Vec<NuGetDependency>,
}

#[derive(Debug, Deserialize)]
struct NuGetDependency {
    id: String,
    #[serde(default)]
    range: Option<String>,
}

impl CatalogEntry {
    /// Dependencies declared outside any target-framework group
    fn requirements(&self) -> BTreeMap<String, String> {
        self.dependency_groups
            .iter()
            .filter(|g| g.target_framework.is_none())
            .flat_map(|g| g.dependencies.iter())
            .map(|d| (d.id.clone(), d.range.clone().unwrap_or_default()))
            .collect()
    }
}

impl NuGetProvider {
    /// Create a new NuGet provider
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build the registration index URL (package ids are lowercased)
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}/index.json", NUGET_REGISTRATION_URL, package.to_lowercase())
    }

    /// Every catalog entry of the package, across all pages
    async fn catalog_entries(&self, package: &str) -> Result<Vec<CatalogEntry>, RegistryError> {
        let url = self.build_url(package);
        let index: RegistrationIndex = or_empty(
            self.client
                .get_json(&url, package, self.registry_name())
                .await,
        )?;

        let mut entries = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(leaves) => leaves,
                None if page.id.is_empty() => continue,
                None => {
                    let linked: RegistrationPage = or_empty(
                        self.client
                            .get_json(&page.id, package, self.registry_name())
                            .await,
                    )?;
                    linked.items.unwrap_or_default()
                }
            };
            entries.extend(leaves.into_iter().map(|leaf| leaf.catalog_entry));
        }
        Ok(entries)
    }
}

#[async_trait]
impl MetadataProvider for NuGetProvider {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::NuGet
    }

    fn registry_name(&self) -> &'static str {
        "NuGet"
    }

    async fn list_versions(&self, package: &str) -> Result<Vec<String>, RegistryError> {
        let mut versions: Vec<String> = self
            .catalog_entries(package)
            .await?
            .into_iter()
            .map(|e| e.version)
            .collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        versions.dedup();
        Ok(versions)
    }

    async fn get_requirements(
        &self,
        package: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError> {
        Ok(self
            .catalog_entries(package)
            .await?
            .iter()
            .find(|e| e.version.eq_ignore_ascii_case(version))
            .map(CatalogEntry::requirements)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nuget_provider_ecosystem() {
        let provider = NuGetProvider::new(HttpClient::new().unwrap());
        assert_eq!(provider.ecosystem(), Ecosystem::NuGet);
        assert_eq!(provider.registry_name(), "NuGet");
    }

    #[test]
    fn test_build_url_lowercases() {
        let provider = NuGetProvider::new(HttpClient::new().unwrap());
        assert_eq!(
            provider.build_url("Newtonsoft.Json"),
            "https://api.nuget.org/v3/registration5-gz-semver2/newtonsoft.json/index.json"
        );
    }

    #[test]
    fn test_framework_groups_are_skipped() {
        let index: RegistrationIndex = serde_json::from_str(
            r#"{"items": [
                {"@id": "https://example.invalid/page/1", "items": [
                    {"catalogEntry": {"version": "2.0.0", "dependencyGroups": [
                        {"dependencies": [{"id": "Common", "range": "[1.0.0, )"}]},
                        {"targetFramework": "net6.0", "dependencies": [{"id": "NetOnly", "range": "[6.0.0, )"}]}
                    ]}}
                ]},
                {"@id": "https://example.invalid/page/2"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(index.items.len(), 2);
        assert!(index.items[1].items.is_none());

        let leaves = index.items[0].items.as_ref().unwrap();
        let requirements = leaves[0].catalog_entry.requirements();
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements["Common"], "[1.0.0, )");
    }
}
