//! Solver operations over a symbolic model
//!
//! This module provides:
//! - The optimization backend capability and a branch-and-bound backend
//! - The operations: validity check, impact minimization and maximization,
//!   threshold filtering, the configuration closest to a target impact and
//!   partial-configuration completion
//! - Translation of solver assignments into configurations

mod backend;
mod closest;
mod complete;
mod filter;
mod impact;
mod validity;

pub use backend::{Assignment, OptimizationBackend, Query, SearchBackend, SolveStatus, TIME_BUDGET};
pub use closest::ConfigByImpact;
pub use complete::CompleteConfig;
pub use filter::FilterConfigs;
pub use impact::{MaximizeImpact, MinimizeImpact};
pub use validity::ValidityCheck;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::domain::{ChosenVersion, Configuration, Outcome, SerialNumber};
use crate::model::SymbolicModel;

/// A request-shaped query against a model
pub trait Operation {
    /// Run the operation; the result is available from [`Operation::outcome`]
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend);

    /// Result of the last execution, `NotFound` before the first one
    fn outcome(&self) -> &Outcome;

    /// Name used in logs and timeout messages
    fn name(&self) -> &'static str;
}

/// The closed set of operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum SolverOperation {
    ValidityCheck,
    MinimizeImpact { limit: usize },
    MaximizeImpact { limit: usize },
    FilterConfigs { min: f64, max: f64, limit: usize },
    ConfigByImpact { impact: f64 },
    CompleteConfig { partial: BTreeMap<String, SerialNumber> },
}

impl SolverOperation {
    pub fn name(&self) -> &'static str {
        match self {
            SolverOperation::ValidityCheck => "ValidityCheck",
            SolverOperation::MinimizeImpact { .. } => "MinimizeImpact",
            SolverOperation::MaximizeImpact { .. } => "MaximizeImpact",
            SolverOperation::FilterConfigs { .. } => "FilterConfigs",
            SolverOperation::ConfigByImpact { .. } => "ConfigByImpact",
            SolverOperation::CompleteConfig { .. } => "CompleteConfig",
        }
    }

    /// Execute against `model` and return the outcome
    pub fn execute(&self, model: &SymbolicModel, backend: &dyn OptimizationBackend) -> Outcome {
        match self {
            SolverOperation::ValidityCheck => run(ValidityCheck::new(), model, backend),
            SolverOperation::MinimizeImpact { limit } => run(MinimizeImpact::new(*limit), model, backend),
            SolverOperation::MaximizeImpact { limit } => run(MaximizeImpact::new(*limit), model, backend),
            SolverOperation::FilterConfigs { min, max, limit } => {
                run(FilterConfigs::new(*min, *max, *limit), model, backend)
            }
            SolverOperation::ConfigByImpact { impact } => run(ConfigByImpact::new(*impact), model, backend),
            SolverOperation::CompleteConfig { partial } => {
                run(CompleteConfig::new(partial.clone()), model, backend)
            }
        }
    }
}

fn run<O: Operation>(mut operation: O, model: &SymbolicModel, backend: &dyn OptimizationBackend) -> Outcome {
    let start = Instant::now();
    operation.execute(model, backend);
    debug!(
        operation = operation.name(),
        root = %model.root,
        found = operation.outcome().is_found(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "operation finished"
    );
    operation.outcome().clone()
}

/// Deadline of one backend call starting now
pub(crate) fn deadline() -> Instant {
    Instant::now() + TIME_BUDGET
}

/// Outcome for an operation that exceeded its time budget
pub(crate) fn timed_out(operation: &str, reason: &str) -> Outcome {
    warn!(operation, %reason, "solver time budget exceeded");
    Outcome::TimedOut(format!(
        "Execution of {} timed out after {} seconds. The complexity of the model is too high, \
         try lowering the maximum level of the graph.",
        operation,
        TIME_BUDGET.as_secs()
    ))
}

/// Translate an assignment into display versions
pub(crate) fn to_configuration(model: &SymbolicModel, assignment: &Assignment) -> Configuration {
    let versions = assignment
        .iter()
        .map(|(name, serial)| {
            let version = model
                .version_of(name, *serial)
                .map(str::to_string)
                .unwrap_or_else(|| serial.to_string());
            (
                name.clone(),
                ChosenVersion {
                    serial_number: *serial,
                    version,
                },
            )
        })
        .collect();
    Configuration {
        versions,
        impact: model.objective_value(assignment),
    }
}

/// Collect up to `limit` distinct answers, excluding each one found
///
/// Every solve gets a fresh time budget.
pub(crate) fn enumerate<F>(
    operation: &str,
    model: &SymbolicModel,
    mut query: Query<'_>,
    limit: usize,
    mut solve: F,
) -> Outcome
where
    F: FnMut(&Query<'_>) -> SolveStatus,
{
    let mut configurations = Vec::new();
    while configurations.len() < limit {
        query.deadline = deadline();
        match solve(&query) {
            SolveStatus::Sat(assignment) => {
                configurations.push(to_configuration(model, &assignment));
                query.exclude(assignment);
            }
            SolveStatus::Unsat => break,
            SolveStatus::Unknown(reason) => return timed_out(operation, &reason),
        }
    }

    if configurations.is_empty() {
        Outcome::NotFound
    } else {
        Outcome::Configurations(configurations)
    }
}
