//! Dependency-graph snapshots as read from the graph store
//!
//! A snapshot is everything reachable from one requirement file within a
//! traversal depth: the requirement edges (constraints only) and the have
//! facts (concrete versions present in the subgraph, with impact data).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{Ecosystem, ImpactAttributes, SerialNumber};
use crate::error::ValidationError;

/// Whether a requirement comes from the root file or from a resolved version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Declared by the requirement file itself
    Direct,
    /// Declared by a version of another dependency
    Indirect,
}

/// The version that declared an indirect requirement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParentRef {
    /// Name of the requiring package
    pub package: String,
    /// Serial number of the requiring version
    pub serial_number: SerialNumber,
}

/// A requirement on a dependency, carrying the raw constraint text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementEdge {
    /// Name of the required dependency
    pub dependency: String,
    /// Raw constraint string in the ecosystem's syntax
    pub constraint: String,
    /// Direct or indirect requirement
    pub kind: EdgeKind,
    /// Requiring version, absent for direct requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    /// Traversal distance of the dependency from the root (1 = direct)
    #[serde(default = "default_level")]
    pub level: u32,
}

impl RequirementEdge {
    /// Create a direct requirement
    pub fn direct(dependency: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            dependency: dependency.into(),
            constraint: constraint.into(),
            kind: EdgeKind::Direct,
            parent: None,
            level: 1,
        }
    }

    /// Create an indirect requirement declared by `parent`
    pub fn indirect(
        dependency: impl Into<String>,
        constraint: impl Into<String>,
        parent: ParentRef,
        level: u32,
    ) -> Self {
        Self {
            dependency: dependency.into(),
            constraint: constraint.into(),
            kind: EdgeKind::Indirect,
            parent: Some(parent),
            level,
        }
    }

    /// Human-readable origin of this edge
    pub fn origin(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}#{}", parent.package, parent.serial_number),
            None => "root".to_string(),
        }
    }
}

/// A concrete version present in the resolved subgraph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaveFact {
    /// Dependency name
    pub dependency: String,
    /// Version name
    pub release: String,
    /// Serial number of the version
    pub serial_number: SerialNumber,
    /// Impact attributes of the version
    #[serde(flatten)]
    pub impact: ImpactAttributes,
    /// Traversal distance of the dependency from the root
    #[serde(default = "default_level")]
    pub level: u32,
}

impl HaveFact {
    /// Create a fact without impact attributes at level 1
    pub fn new(
        dependency: impl Into<String>,
        release: impl Into<String>,
        serial_number: SerialNumber,
    ) -> Self {
        Self {
            dependency: dependency.into(),
            release: release.into(),
            serial_number,
            impact: ImpactAttributes::default(),
            level: 1,
        }
    }

    /// Attach impact attributes
    pub fn with_impact(mut self, impact: ImpactAttributes) -> Self {
        self.impact = impact;
        self
    }

    /// Set the traversal level
    pub fn at_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
}

fn default_level() -> u32 {
    1
}

/// Traversal depth of a snapshot request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Depth {
    /// At most this many requirement levels below the root
    Levels(u32),
    /// The whole reachable graph
    Unbounded,
}

impl Depth {
    /// Returns true if something at `level` is within this depth
    pub fn includes(&self, level: u32) -> bool {
        match self {
            Depth::Levels(max) => level <= *max,
            Depth::Unbounded => true,
        }
    }
}

impl TryFrom<i64> for Depth {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Depth::Unbounded),
            n if n >= 1 && n <= u32::MAX as i64 => Ok(Depth::Levels(n as u32)),
            n => Err(ValidationError::InvalidDepth { value: n }),
        }
    }
}

impl From<Depth> for i64 {
    fn from(depth: Depth) -> Self {
        match depth {
            Depth::Levels(n) => n as i64,
            Depth::Unbounded => -1,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Counts reported by the file-info query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    /// Distinct dependency names
    pub dependencies: usize,
    /// Requirement edges
    pub edges: usize,
    /// Known versions with at least one vulnerability
    pub vulnerable_versions: usize,
}

/// Requirement edges and have facts reachable from a root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Name of the root requirement file
    pub root: String,
    /// Ecosystem of the requirement file
    pub ecosystem: Ecosystem,
    /// When the root was last modified
    pub last_modified: DateTime<Utc>,
    /// Requirement edges
    #[serde(default)]
    pub requires: Vec<RequirementEdge>,
    /// Have facts
    #[serde(default)]
    pub have: Vec<HaveFact>,
}

impl GraphSnapshot {
    /// Create an empty snapshot
    pub fn new(root: impl Into<String>, ecosystem: Ecosystem, last_modified: DateTime<Utc>) -> Self {
        Self {
            root: root.into(),
            ecosystem,
            last_modified,
            requires: Vec::new(),
            have: Vec::new(),
        }
    }

    /// Add a requirement edge
    pub fn with_edge(mut self, edge: RequirementEdge) -> Self {
        self.requires.push(edge);
        self
    }

    /// Add a have fact
    pub fn with_fact(mut self, fact: HaveFact) -> Self {
        self.have.push(fact);
        self
    }

    /// Distinct dependency names, sorted
    pub fn dependency_names(&self) -> BTreeSet<&str> {
        self.requires
            .iter()
            .map(|e| e.dependency.as_str())
            .chain(self.have.iter().map(|h| h.dependency.as_str()))
            .collect()
    }

    /// Drop edges and facts beyond `depth`
    pub fn truncate(mut self, depth: Depth) -> Self {
        self.requires.retain(|e| depth.includes(e.level));
        self.have.retain(|h| depth.includes(h.level));
        self
    }

    /// Counts for the file-info query
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            dependencies: self.dependency_names().len(),
            edges: self.requires.len(),
            vulnerable_versions: self
                .have
                .iter()
                .filter(|h| h.impact.vulnerability_count.unwrap_or(0) > 0)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn moment() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample() -> GraphSnapshot {
        let parent = ParentRef {
            package: "flask".to_string(),
            serial_number: 20,
        };
        GraphSnapshot::new("requirements.txt", Ecosystem::PyPI, moment())
            .with_edge(RequirementEdge::direct("flask", ">=2.0"))
            .with_edge(RequirementEdge::indirect("werkzeug", ">=2.2", parent, 2))
            .with_fact(HaveFact::new("flask", "2.0", 20))
            .with_fact(
                HaveFact::new("werkzeug", "2.2", 22)
                    .at_level(2)
                    .with_impact(ImpactAttributes {
                        vulnerability_count: Some(2),
                        mean: Some(5.0),
                        weighted_mean: Some(6.0),
                    }),
            )
    }

    #[test]
    fn test_depth_from_request_value() {
        assert_eq!(Depth::try_from(-1).unwrap(), Depth::Unbounded);
        assert_eq!(Depth::try_from(3).unwrap(), Depth::Levels(3));
        assert!(Depth::try_from(0).is_err());
        assert!(Depth::try_from(-2).is_err());
    }

    #[test]
    fn test_depth_serde() {
        assert_eq!(serde_json::to_string(&Depth::Unbounded).unwrap(), "-1");
        let depth: Depth = serde_json::from_str("2").unwrap();
        assert_eq!(depth, Depth::Levels(2));
        assert!(serde_json::from_str::<Depth>("0").is_err());
    }

    #[test]
    fn test_truncate_drops_deeper_levels() {
        let snapshot = sample().truncate(Depth::Levels(1));
        assert_eq!(snapshot.requires.len(), 1);
        assert_eq!(snapshot.have.len(), 1);
        assert_eq!(snapshot.dependency_names().into_iter().collect::<Vec<_>>(), vec!["flask"]);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.dependencies, 2);
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.vulnerable_versions, 1);
    }

    #[test]
    fn test_edge_origin() {
        let snapshot = sample();
        assert_eq!(snapshot.requires[0].origin(), "root");
        assert_eq!(snapshot.requires[1].origin(), "flask#20");
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let snapshot = sample();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: GraphSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
