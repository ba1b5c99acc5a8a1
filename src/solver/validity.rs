//! Feasibility of the model's domains

use super::{deadline, timed_out, Operation, OptimizationBackend, Query, SolveStatus};
use crate::domain::Outcome;
use crate::model::SymbolicModel;

/// Checks whether any assignment satisfies every variable's domain
///
/// A feasible model yields `Configurations([])`; no assignment is reported.
#[derive(Debug, Clone)]
pub struct ValidityCheck {
    outcome: Outcome,
}

impl ValidityCheck {
    pub fn new() -> Self {
        Self {
            outcome: Outcome::NotFound,
        }
    }
}

impl Default for ValidityCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Operation for ValidityCheck {
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend) {
        let query = Query::new(model, deadline());
        self.outcome = match backend.check(&query) {
            SolveStatus::Sat(_) => Outcome::Configurations(Vec::new()),
            SolveStatus::Unsat => Outcome::NotFound,
            SolveStatus::Unknown(reason) => timed_out(self.name(), &reason),
        };
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn name(&self) -> &'static str {
        "ValidityCheck"
    }
}
