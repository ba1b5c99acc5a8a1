//! Top-k configurations by objective value

use super::{deadline, enumerate, Operation, OptimizationBackend, Query};
use crate::domain::Outcome;
use crate::model::SymbolicModel;

/// Up to `limit` distinct configurations in ascending objective order
///
/// Each solve excludes every configuration found before it. Without an
/// objective the configurations come in search order.
#[derive(Debug, Clone)]
pub struct MinimizeImpact {
    limit: usize,
    outcome: Outcome,
}

impl MinimizeImpact {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            outcome: Outcome::NotFound,
        }
    }
}

impl Operation for MinimizeImpact {
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend) {
        let query = Query::new(model, deadline());
        self.outcome = enumerate(self.name(), model, query, self.limit, |q| backend.minimize(q));
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn name(&self) -> &'static str {
        "MinimizeImpact"
    }
}

/// Up to `limit` distinct configurations in descending objective order
#[derive(Debug, Clone)]
pub struct MaximizeImpact {
    limit: usize,
    outcome: Outcome,
}

impl MaximizeImpact {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            outcome: Outcome::NotFound,
        }
    }
}

impl Operation for MaximizeImpact {
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend) {
        let query = Query::new(model, deadline());
        self.outcome = enumerate(self.name(), model, query, self.limit, |q| backend.maximize(q));
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn name(&self) -> &'static str {
        "MaximizeImpact"
    }
}
