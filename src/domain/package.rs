//! Package and version records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Ecosystem;

/// Order-preserving integer encoding of a version string
pub type SerialNumber = i64;

/// Impact attributes attached to a version by vulnerability enrichment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactAttributes {
    /// Number of known vulnerabilities affecting the version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerability_count: Option<u32>,
    /// Mean severity score of those vulnerabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    /// Weighted mean severity score of those vulnerabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_mean: Option<f64>,
}

impl ImpactAttributes {
    /// Attributes for a version with no recorded vulnerabilities
    pub fn clean() -> Self {
        Self {
            vulnerability_count: Some(0),
            mean: Some(0.0),
            weighted_mean: Some(0.0),
        }
    }

    /// Returns true if no attribute is present
    pub fn is_empty(&self) -> bool {
        self.vulnerability_count.is_none() && self.mean.is_none() && self.weighted_mean.is_none()
    }
}

/// A concrete release of a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    /// Raw version string as published
    pub name: String,
    /// Serial number assigned by the totalizer
    pub serial_number: SerialNumber,
    /// Impact attributes, if enrichment ran
    #[serde(default)]
    pub impact: ImpactAttributes,
}

impl Version {
    /// Create a version without impact attributes
    pub fn new(name: impl Into<String>, serial_number: SerialNumber) -> Self {
        Self {
            name: name.into(),
            serial_number,
            impact: ImpactAttributes::default(),
        }
    }

    /// Attach impact attributes
    pub fn with_impact(mut self, impact: ImpactAttributes) -> Self {
        self.impact = impact;
        self
    }
}

/// A package in one ecosystem together with its known versions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Ecosystem the package belongs to
    pub ecosystem: Ecosystem,
    /// Canonical name (`group:artifact` for Maven)
    pub name: String,
    /// Known versions
    pub versions: Vec<Version>,
    /// When the version list was last refreshed from the registry
    pub refreshed_at: DateTime<Utc>,
}

impl Package {
    /// Create a package with no versions
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>, refreshed_at: DateTime<Utc>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            versions: Vec::new(),
            refreshed_at,
        }
    }

    /// Returns the names of all known versions
    pub fn version_names(&self) -> Vec<&str> {
        self.versions.iter().map(|v| v.name.as_str()).collect()
    }

    /// Look up a version by name
    pub fn version(&self, name: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.name == name)
    }

    /// Returns true if the version list is older than `max_age`
    pub fn needs_refresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.refreshed_at < now - max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_needs_refresh() {
        let refreshed = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let package = Package::new(Ecosystem::PyPI, "requests", refreshed);

        let soon = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        assert!(!package.needs_refresh(soon, Duration::days(10)));

        let later = Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap();
        assert!(package.needs_refresh(later, Duration::days(10)));
    }

    #[test]
    fn test_version_lookup() {
        let mut package = Package::new(Ecosystem::Npm, "lodash", Utc::now());
        package.versions.push(Version::new("4.17.21", 4_0017_0021_6000));
        assert!(package.version("4.17.21").is_some());
        assert!(package.version("4.17.20").is_none());
        assert_eq!(package.version_names(), vec!["4.17.21"]);
    }

    #[test]
    fn test_impact_attributes_empty() {
        assert!(ImpactAttributes::default().is_empty());
        assert!(!ImpactAttributes::clean().is_empty());
    }
}
