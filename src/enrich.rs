//! Vulnerability enrichment of package versions
//!
//! Enrichers attach impact attributes to a version before it is stored.
//! The actual vulnerability source is pluggable; [`ImpactTable`] serves
//! attributes from a table loaded ahead of time.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::{ImpactAttributes, Package, Version};

/// Attaches impact attributes to package versions
#[async_trait]
pub trait ImpactEnricher: Send + Sync {
    async fn attach_impact(&self, package: &Package, version: Version) -> Version;
}

/// Enricher that leaves versions untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImpact;

#[async_trait]
impl ImpactEnricher for NoImpact {
    async fn attach_impact(&self, _package: &Package, version: Version) -> Version {
        version
    }
}

/// Impact attributes keyed by package and version name
///
/// Versions absent from the table are treated as having no known
/// vulnerabilities.
#[derive(Debug, Clone, Default)]
pub struct ImpactTable {
    entries: HashMap<(String, String), ImpactAttributes>,
}

impl ImpactTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the attributes of one version
    pub fn insert(&mut self, package: impl Into<String>, version: impl Into<String>, impact: ImpactAttributes) {
        self.entries.insert((package.into(), version.into()), impact);
    }

    pub fn with(mut self, package: impl Into<String>, version: impl Into<String>, impact: ImpactAttributes) -> Self {
        self.insert(package, version, impact);
        self
    }

    pub fn get(&self, package: &str, version: &str) -> Option<&ImpactAttributes> {
        self.entries.get(&(package.to_string(), version.to_string()))
    }
}

#[async_trait]
impl ImpactEnricher for ImpactTable {
    async fn attach_impact(&self, package: &Package, version: Version) -> Version {
        let impact = self
            .get(&package.name, &version.name)
            .copied()
            .unwrap_or_else(ImpactAttributes::clean);
        version.with_impact(impact)
    }
}
