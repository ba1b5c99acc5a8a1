//! Configuration closest to a target impact

use super::{deadline, timed_out, to_configuration, Operation, OptimizationBackend, Query, SolveStatus};
use crate::domain::Outcome;
use crate::model::SymbolicModel;

/// The configuration whose objective value lies closest to `impact`
///
/// Ties go to the first configuration the backend reaches. Without an
/// objective every configuration has value 0.
#[derive(Debug, Clone)]
pub struct ConfigByImpact {
    impact: f64,
    outcome: Outcome,
}

impl ConfigByImpact {
    pub fn new(impact: f64) -> Self {
        Self {
            impact,
            outcome: Outcome::NotFound,
        }
    }
}

impl Operation for ConfigByImpact {
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend) {
        let query = Query::new(model, deadline()).with_target(self.impact);
        self.outcome = match backend.minimize(&query) {
            SolveStatus::Sat(assignment) => Outcome::Configurations(vec![to_configuration(model, &assignment)]),
            SolveStatus::Unsat => Outcome::NotFound,
            SolveStatus::Unknown(reason) => timed_out(self.name(), &reason),
        };
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn name(&self) -> &'static str {
        "ConfigByImpact"
    }
}
