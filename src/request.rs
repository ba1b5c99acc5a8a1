//! Operation requests and their validation
//!
//! A request names a root, a depth, the impact axis and aggregator, and
//! the operation to run. Requests are validated before any snapshot is
//! read or model built.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::domain::{Depth, SerialNumber};
use crate::error::ValidationError;
use crate::model::{Aggregator, ImpactAxis};
use crate::solver::SolverOperation;

/// Highest impact a threshold or target may name
pub const MAX_IMPACT: f64 = 10.0;

/// Identifier of a requirement file: path-like, no whitespace or `..`
static ROOT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@][A-Za-z0-9._@:/+-]*$").unwrap());

/// One operation against the model of one root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub root: String,
    pub depth: Depth,
    #[serde(default)]
    pub axis: ImpactAxis,
    #[serde(default)]
    pub aggregator: Aggregator,
    #[serde(flatten)]
    pub operation: SolverOperation,
}

impl OperationRequest {
    /// Request over the whole graph with the default axis and aggregator
    pub fn new(root: impl Into<String>, operation: SolverOperation) -> Self {
        Self {
            root: root.into(),
            depth: Depth::Unbounded,
            axis: ImpactAxis::default(),
            aggregator: Aggregator::default(),
            operation,
        }
    }

    pub fn with_depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_axis(mut self, axis: ImpactAxis) -> Self {
        self.axis = axis;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Check the request shape
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_root(&self.root)?;
        match &self.operation {
            SolverOperation::ValidityCheck | SolverOperation::CompleteConfig { .. } => Ok(()),
            SolverOperation::MinimizeImpact { limit } | SolverOperation::MaximizeImpact { limit } => {
                validate_limit(*limit)
            }
            SolverOperation::FilterConfigs { min, max, limit } => {
                validate_limit(*limit)?;
                validate_thresholds(*min, *max)
            }
            SolverOperation::ConfigByImpact { impact } => validate_impact(*impact),
        }
    }
}

/// Root identifiers are path-like and never climb out of a directory
pub fn validate_root(root: &str) -> Result<(), ValidationError> {
    if ROOT_ID_RE.is_match(root) && !root.split('/').any(|segment| segment == "..") {
        Ok(())
    } else {
        Err(ValidationError::InvalidRootId {
            value: root.to_string(),
        })
    }
}

fn validate_limit(limit: usize) -> Result<(), ValidationError> {
    if limit >= 1 {
        Ok(())
    } else {
        Err(ValidationError::InvalidLimit { value: limit as i64 })
    }
}

fn validate_thresholds(min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails every comparison and lands in the error branch
    if min >= 0.0 && min <= max && max <= MAX_IMPACT {
        Ok(())
    } else {
        Err(ValidationError::InvalidThresholds { min, max })
    }
}

fn validate_impact(impact: f64) -> Result<(), ValidationError> {
    if (0.0..=MAX_IMPACT).contains(&impact) {
        Ok(())
    } else {
        Err(ValidationError::InvalidImpact { value: impact })
    }
}

/// Parse a `name=serial` pin
pub fn parse_pin(value: &str) -> Result<(String, SerialNumber), ValidationError> {
    let invalid = || ValidationError::InvalidPin {
        value: value.to_string(),
    };
    let (name, serial) = value.rsplit_once('=').ok_or_else(invalid)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid());
    }
    let serial = serial.trim().parse::<SerialNumber>().map_err(|_| invalid())?;
    Ok((name.to_string(), serial))
}

/// Parse pins into a partial configuration; a later pin of the same name wins
pub fn parse_pins<S: AsRef<str>>(values: &[S]) -> Result<BTreeMap<String, SerialNumber>, ValidationError> {
    values.iter().map(|v| parse_pin(v.as_ref())).collect()
}
