//! Registry adapters for fetching package metadata
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - One metadata provider per ecosystem (PyPI, npm, crates.io,
//!   Maven Central, NuGet, RubyGems)
//! - Package refresh that numbers newly published versions

mod client;
mod crates_io;
mod maven_central;
mod npm;
mod nuget;
mod pypi;
mod rubygems;

pub use client::{HttpClient, BASE_DELAY_MS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, MAX_RETRIES};
pub use crates_io::CratesIoProvider;
pub use maven_central::MavenCentralProvider;
pub use npm::NpmProvider;
pub use nuget::NuGetProvider;
pub use pypi::PyPIProvider;
pub use rubygems::RubyGemsProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::domain::{Ecosystem, Package, SerialNumber, Version};
use crate::enrich::ImpactEnricher;
use crate::error::RegistryError;
use crate::version::{assign_serials, slot_base};

/// Source of published versions and their requirements
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Get the ecosystem this provider serves
    fn ecosystem(&self) -> Ecosystem;

    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Every published version of a package
    async fn list_versions(&self, package: &str) -> Result<Vec<String>, RegistryError>;

    /// Raw requirement constraints of one version, keyed by dependency name
    async fn get_requirements(
        &self,
        package: &str,
        version: &str,
    ) -> Result<BTreeMap<String, String>, RegistryError>;
}

/// Create a metadata provider for the given ecosystem
pub fn create_provider(ecosystem: Ecosystem, client: HttpClient) -> Box<dyn MetadataProvider> {
    match ecosystem {
        Ecosystem::PyPI => Box::new(PyPIProvider::new(client)),
        Ecosystem::Npm => Box::new(NpmProvider::new(client)),
        Ecosystem::Cargo => Box::new(CratesIoProvider::new(client)),
        Ecosystem::Maven => Box::new(MavenCentralProvider::new(client)),
        Ecosystem::NuGet => Box::new(NuGetProvider::new(client)),
        Ecosystem::RubyGems => Box::new(RubyGemsProvider::new(client)),
    }
}

/// Turn a malformed payload into an empty result
pub(crate) fn or_empty<T: Default>(result: Result<T, RegistryError>) -> Result<T, RegistryError> {
    match result {
        Err(e) if e.is_malformed() => {
            warn!(error = %e, "malformed registry payload, treating as empty");
            Ok(T::default())
        }
        other => other,
    }
}

/// Add newly published versions of `package`
///
/// New versions are numbered against every known version and enriched
/// with impact attributes. Versions already known keep their serial
/// numbers, except when a new version ranks ahead of them inside their
/// tie group: that group is renumbered so serials stay unique and ordered.
/// Returns the number of versions added.
pub async fn refresh_package(
    provider: &dyn MetadataProvider,
    enricher: &dyn ImpactEnricher,
    package: &mut Package,
    now: DateTime<Utc>,
) -> Result<usize, RegistryError> {
    let listed = provider.list_versions(&package.name).await?;

    let known: BTreeSet<&str> = package.versions.iter().map(|v| v.name.as_str()).collect();
    let mut fresh: Vec<String> = Vec::new();
    for name in &listed {
        if !known.contains(name.as_str()) && !fresh.contains(name) {
            fresh.push(name.clone());
        }
    }

    let mut all_names: Vec<String> = package.versions.iter().map(|v| v.name.clone()).collect();
    all_names.extend(fresh.iter().cloned());

    let numbered: BTreeMap<String, SerialNumber> =
        assign_serials(&package.name, &all_names).into_iter().collect();

    let taken: BTreeSet<SerialNumber> = package.versions.iter().map(|v| v.serial_number).collect();
    let crowded: BTreeSet<SerialNumber> = fresh
        .iter()
        .filter(|name| numbered.get(name.as_str()).is_some_and(|serial| taken.contains(serial)))
        .map(|name| slot_base(&package.name, name))
        .collect();
    for version in package.versions.iter_mut() {
        if !crowded.contains(&slot_base(&package.name, &version.name)) {
            continue;
        }
        if let Some(&serial) = numbered.get(&version.name) {
            if serial != version.serial_number {
                debug!(
                    package = %package.name,
                    version = %version.name,
                    from = version.serial_number,
                    to = serial,
                    "renumbering version in a shared serial slot"
                );
                version.serial_number = serial;
            }
        }
    }

    let mut added = Vec::with_capacity(fresh.len());
    for name in &fresh {
        let Some(&serial) = numbered.get(name) else {
            continue;
        };
        let version = enricher.attach_impact(package, Version::new(name.clone(), serial)).await;
        added.push(version);
    }

    let count = added.len();
    package.versions.extend(added);
    package.refreshed_at = now;
    debug!(
        package = %package.name,
        registry = provider.registry_name(),
        added = count,
        "package refreshed"
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{ImpactTable, NoImpact};
    use crate::domain::ImpactAttributes;
    use chrono::TimeZone;

    struct StaticProvider {
        versions: Vec<&'static str>,
    }

    #[async_trait]
    impl MetadataProvider for StaticProvider {
        fn ecosystem(&self) -> Ecosystem {
            Ecosystem::PyPI
        }

        fn registry_name(&self) -> &'static str {
            "static"
        }

        async fn list_versions(&self, _package: &str) -> Result<Vec<String>, RegistryError> {
            Ok(self.versions.iter().map(|v| v.to_string()).collect())
        }

        async fn get_requirements(
            &self,
            _package: &str,
            _version: &str,
        ) -> Result<BTreeMap<String, String>, RegistryError> {
            Ok(BTreeMap::new())
        }
    }

    fn moment(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_create_provider_covers_every_ecosystem() {
        for ecosystem in Ecosystem::all() {
            let provider = create_provider(*ecosystem, HttpClient::new().unwrap());
            assert_eq!(provider.ecosystem(), *ecosystem);
            assert_eq!(provider.registry_name(), ecosystem.registry_name());
        }
    }

    #[test]
    fn test_or_empty() {
        let malformed: Result<Vec<String>, _> = Err(RegistryError::invalid_response("p", "r", "bad"));
        assert_eq!(or_empty(malformed).unwrap(), Vec::<String>::new());

        let missing: Result<Vec<String>, _> = Err(RegistryError::package_not_found("p", "r"));
        assert!(or_empty(missing).is_err());
    }

    #[tokio::test]
    async fn test_refresh_adds_only_new_versions() {
        let provider = StaticProvider {
            versions: vec!["1.0", "1.1", "2.0"],
        };
        let mut package = Package::new(Ecosystem::PyPI, "demo", moment(1));
        package.versions.push(Version::new("1.0", 42));

        let added = refresh_package(&provider, &NoImpact, &mut package, moment(2))
            .await
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(package.version("1.0").unwrap().serial_number, 42);
        assert_eq!(package.refreshed_at, moment(2));

        let s11 = package.version("1.1").unwrap().serial_number;
        let s20 = package.version("2.0").unwrap().serial_number;
        assert!(s11 < s20);

        let again = refresh_package(&provider, &NoImpact, &mut package, moment(3))
            .await
            .unwrap();
        assert_eq!(again, 0);
        assert_eq!(package.versions.len(), 3);
    }

    struct ListedProvider {
        versions: Vec<&'static str>,
    }

    #[async_trait]
    impl MetadataProvider for ListedProvider {
        fn ecosystem(&self) -> Ecosystem {
            Ecosystem::Maven
        }

        fn registry_name(&self) -> &'static str {
            "listed"
        }

        async fn list_versions(&self, _package: &str) -> Result<Vec<String>, RegistryError> {
            Ok(self.versions.iter().map(|v| v.to_string()).collect())
        }

        async fn get_requirements(
            &self,
            _package: &str,
            _version: &str,
        ) -> Result<BTreeMap<String, String>, RegistryError> {
            Ok(BTreeMap::new())
        }
    }

    #[tokio::test]
    async fn test_refresh_keeps_serials_unique_within_a_tie_group() {
        let mut package = Package::new(Ecosystem::Maven, "org.example:lib", moment(1));

        let first = ListedProvider { versions: vec!["1.0.0.5"] };
        refresh_package(&first, &NoImpact, &mut package, moment(2)).await.unwrap();

        let second = ListedProvider {
            versions: vec!["1.0.0.5", "1.0.0.3"],
        };
        let added = refresh_package(&second, &NoImpact, &mut package, moment(3)).await.unwrap();
        assert_eq!(added, 1);

        let older = package.version("1.0.0.3").unwrap().serial_number;
        let newer = package.version("1.0.0.5").unwrap().serial_number;
        assert!(older < newer, "1.0.0.3 -> {}, 1.0.0.5 -> {}", older, newer);

        let third = ListedProvider {
            versions: vec!["1.0.0.5", "1.0.0.3", "1.0.0.4", "1.0.0.9", "1.0.1"],
        };
        refresh_package(&third, &NoImpact, &mut package, moment(4)).await.unwrap();

        let mut by_serial: Vec<(SerialNumber, &str)> = package
            .versions
            .iter()
            .map(|v| (v.serial_number, v.name.as_str()))
            .collect();
        by_serial.sort();
        let names: Vec<&str> = by_serial.iter().map(|(_, name)| *name).collect();
        assert_eq!(names, vec!["1.0.0.3", "1.0.0.4", "1.0.0.5", "1.0.0.9", "1.0.1"]);
        assert!(by_serial.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    #[tokio::test]
    async fn test_refresh_leaves_other_slots_alone() {
        let mut package = Package::new(Ecosystem::Maven, "org.example:lib", moment(1));
        let first = ListedProvider {
            versions: vec!["1.0.0.5", "2.0.0"],
        };
        refresh_package(&first, &NoImpact, &mut package, moment(2)).await.unwrap();
        let before = package.version("2.0.0").unwrap().serial_number;

        let second = ListedProvider {
            versions: vec!["1.0.0.5", "2.0.0", "1.0.0.1"],
        };
        refresh_package(&second, &NoImpact, &mut package, moment(3)).await.unwrap();
        assert_eq!(package.version("2.0.0").unwrap().serial_number, before);
    }

    #[tokio::test]
    async fn test_refresh_attaches_impact() {
        let provider = StaticProvider { versions: vec!["0.9"] };
        let table = ImpactTable::new().with(
            "demo",
            "0.9",
            ImpactAttributes {
                vulnerability_count: Some(1),
                mean: Some(5.0),
                weighted_mean: Some(5.0),
            },
        );
        let mut package = Package::new(Ecosystem::PyPI, "demo", moment(1));
        refresh_package(&provider, &table, &mut package, moment(2))
            .await
            .unwrap();
        assert_eq!(package.version("0.9").unwrap().impact.mean, Some(5.0));
    }
}
