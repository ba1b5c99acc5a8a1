//! Symbolic constraint model of a dependency graph
//!
//! A model has one integer decision variable per dependency name. Each
//! variable ranges over the serial numbers of that dependency's known
//! versions and carries one clause per requirement targeting it; its domain
//! is the intersection of the clauses' admissible sets. An optional
//! objective maps every (variable, serial) pair to an impact term.

mod builder;
mod codec;

pub use builder::{build, ModelBuilder};
pub use codec::{deserialize, serialize, FORMAT_VERSION};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::{EdgeKind, Ecosystem, ImpactAttributes, SerialNumber};

/// Which impact facts feed the objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactAxis {
    /// Mean or weighted-mean impact of a version's vulnerabilities
    #[default]
    PackageImpact,
    /// Number of vulnerabilities affecting a version
    VulnerabilityCount,
}

/// How per-variable terms combine into the objective value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    Sum,
    #[default]
    Mean,
    WeightedMean,
}

impl ImpactAxis {
    fn name(&self) -> &'static str {
        match self {
            ImpactAxis::PackageImpact => "package_impact",
            ImpactAxis::VulnerabilityCount => "vulnerability_count",
        }
    }
}

impl Aggregator {
    fn name(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Mean => "mean",
            Aggregator::WeightedMean => "weighted_mean",
        }
    }
}

impl fmt::Display for ImpactAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ImpactAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "package_impact" | "impact" | "mean" => Ok(ImpactAxis::PackageImpact),
            "vulnerability_count" | "count" | "vulnerabilities" => Ok(ImpactAxis::VulnerabilityCount),
            _ => Err(format!(
                "unknown impact axis '{}': expected package-impact or vulnerability-count",
                s
            )),
        }
    }
}

impl FromStr for Aggregator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sum" => Ok(Aggregator::Sum),
            "mean" => Ok(Aggregator::Mean),
            "weighted_mean" | "weighted" => Ok(Aggregator::WeightedMean),
            _ => Err(format!(
                "unknown aggregator '{}': expected sum, mean or weighted-mean",
                s
            )),
        }
    }
}

/// A known version of a dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownVersion {
    pub version: String,
    #[serde(default)]
    pub impact: ImpactAttributes,
}

/// One requirement edge restricting a variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// `root` or `package#serial` of the requiring version
    pub origin: String,
    /// Raw requirement text
    pub constraint: String,
    pub kind: EdgeKind,
    /// Serials satisfying the requirement
    pub allowed: BTreeSet<SerialNumber>,
}

/// Decision variable of one dependency
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub known: BTreeMap<SerialNumber, KnownVersion>,
    #[serde(default)]
    pub clauses: Vec<Clause>,
}

impl Variable {
    /// Known serials admitted by every clause
    pub fn domain(&self) -> BTreeSet<SerialNumber> {
        self.known
            .keys()
            .copied()
            .filter(|serial| self.clauses.iter().all(|c| c.allowed.contains(serial)))
            .collect()
    }

    /// Version name of `serial`
    pub fn version_of(&self, serial: SerialNumber) -> Option<&str> {
        self.known.get(&serial).map(|k| k.version.as_str())
    }
}

/// Objective expression over the model's variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub axis: ImpactAxis,
    pub aggregator: Aggregator,
    /// Divides the sum of terms; 1 for `Sum`
    pub divisor: u32,
    /// Term of each (variable, serial) carrying the selected attribute
    pub terms: BTreeMap<String, BTreeMap<SerialNumber, f64>>,
}

impl Objective {
    /// Derive the objective from the variables' impact attributes
    ///
    /// `None` when no known version carries the selected attribute.
    pub fn derive(
        variables: &BTreeMap<String, Variable>,
        axis: ImpactAxis,
        aggregator: Aggregator,
    ) -> Option<Self> {
        let terms: BTreeMap<String, BTreeMap<SerialNumber, f64>> = variables
            .iter()
            .filter_map(|(name, variable)| {
                let row: BTreeMap<SerialNumber, f64> = variable
                    .known
                    .iter()
                    .filter_map(|(serial, known)| {
                        select_attribute(&known.impact, axis, aggregator).map(|v| (*serial, v))
                    })
                    .collect();
                (!row.is_empty()).then(|| (name.clone(), row))
            })
            .collect();

        if terms.is_empty() {
            return None;
        }

        let divisor = match aggregator {
            Aggregator::Sum => 1,
            Aggregator::Mean | Aggregator::WeightedMean => terms.len() as u32,
        };
        Some(Self {
            axis,
            aggregator,
            divisor,
            terms,
        })
    }

    /// Term of `serial` for `variable`; zero when the attribute is missing
    pub fn term(&self, variable: &str, serial: SerialNumber) -> f64 {
        self.terms
            .get(variable)
            .and_then(|row| row.get(&serial))
            .copied()
            .unwrap_or(0.0)
    }

    /// Objective value of a total assignment
    pub fn value(&self, assignment: &BTreeMap<String, SerialNumber>) -> f64 {
        let sum: f64 = assignment
            .iter()
            .map(|(name, serial)| self.term(name, *serial))
            .sum();
        sum / f64::from(self.divisor.max(1))
    }
}

fn select_attribute(impact: &ImpactAttributes, axis: ImpactAxis, aggregator: Aggregator) -> Option<f64> {
    match (axis, aggregator) {
        (ImpactAxis::VulnerabilityCount, _) => impact.vulnerability_count.map(f64::from),
        (ImpactAxis::PackageImpact, Aggregator::WeightedMean) => impact.weighted_mean,
        (ImpactAxis::PackageImpact, _) => impact.mean,
    }
}

/// Integer constraint model built from one graph snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolicModel {
    pub root: String,
    pub ecosystem: Ecosystem,
    pub variables: BTreeMap<String, Variable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<Objective>,
}

impl SymbolicModel {
    /// Rederive the objective for another axis and aggregator
    pub fn retarget(&mut self, axis: ImpactAxis, aggregator: Aggregator) {
        let current = self.objective.as_ref().map(|o| (o.axis, o.aggregator));
        if current != Some((axis, aggregator)) {
            self.objective = Objective::derive(&self.variables, axis, aggregator);
        }
    }

    pub fn has_objective(&self) -> bool {
        self.objective.is_some()
    }

    /// Domain of every variable
    pub fn domains(&self) -> BTreeMap<&str, BTreeSet<SerialNumber>> {
        self.variables
            .iter()
            .map(|(name, variable)| (name.as_str(), variable.domain()))
            .collect()
    }

    /// Version name of `serial` for dependency `name`
    pub fn version_of(&self, name: &str, serial: SerialNumber) -> Option<&str> {
        self.variables.get(name).and_then(|v| v.version_of(serial))
    }

    /// Objective value of an assignment, if the model has an objective
    pub fn objective_value(&self, assignment: &BTreeMap<String, SerialNumber>) -> Option<f64> {
        self.objective.as_ref().map(|o| o.value(assignment))
    }

    /// Number of decision variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
