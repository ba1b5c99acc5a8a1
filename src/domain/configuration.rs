//! Solver results: configurations and the tagged outcome of an operation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::SerialNumber;

/// A version chosen for one dependency, in display form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChosenVersion {
    /// Serial number picked by the solver
    pub serial_number: SerialNumber,
    /// Version name the serial number stands for
    pub version: String,
}

/// A total or partial assignment of versions to dependencies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Chosen version per dependency name
    pub versions: BTreeMap<String, ChosenVersion>,
    /// Objective value of the assignment, when the model has an objective
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<f64>,
}

impl Configuration {
    /// Version name chosen for `dependency`
    pub fn version_of(&self, dependency: &str) -> Option<&str> {
        self.versions.get(dependency).map(|c| c.version.as_str())
    }

    /// Serial number chosen for `dependency`
    pub fn serial_of(&self, dependency: &str) -> Option<SerialNumber> {
        self.versions.get(dependency).map(|c| c.serial_number)
    }

    /// Number of assigned dependencies
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if nothing is assigned
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Result of a solver operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// The operation found these configurations (empty for a passed validity check)
    Configurations(Vec<Configuration>),
    /// No assignment satisfies the model
    NotFound,
    /// The solver exceeded its time budget
    TimedOut(String),
}

impl Outcome {
    /// Returns true for `Configurations`
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Configurations(_))
    }

    /// The configurations, if any were found
    pub fn configurations(&self) -> Option<&[Configuration]> {
        match self {
            Outcome::Configurations(configs) => Some(configs),
            _ => None,
        }
    }
}
