//! Completion of a partial configuration

use std::collections::BTreeMap;
use tracing::warn;

use super::{deadline, timed_out, to_configuration, Operation, OptimizationBackend, Query, SolveStatus};
use crate::domain::{Outcome, SerialNumber};
use crate::model::SymbolicModel;

/// Pins the given variables and completes the rest
///
/// The completion minimizes the objective when the model has one and is
/// the first feasible assignment otherwise. Pins naming no variable of the
/// model are ignored.
#[derive(Debug, Clone)]
pub struct CompleteConfig {
    partial: BTreeMap<String, SerialNumber>,
    outcome: Outcome,
}

impl CompleteConfig {
    pub fn new(partial: BTreeMap<String, SerialNumber>) -> Self {
        Self {
            partial,
            outcome: Outcome::NotFound,
        }
    }
}

impl Operation for CompleteConfig {
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend) {
        let pins: BTreeMap<String, SerialNumber> = self
            .partial
            .iter()
            .filter(|(name, serial)| {
                let known = model.variables.contains_key(name.as_str());
                if !known {
                    warn!(dependency = %name, serial = **serial, "pin names no dependency of the graph, ignoring");
                }
                known
            })
            .map(|(name, serial)| (name.clone(), *serial))
            .collect();

        let query = Query::new(model, deadline()).with_pins(pins);
        let status = if model.has_objective() {
            backend.minimize(&query)
        } else {
            backend.check(&query)
        };

        self.outcome = match status {
            SolveStatus::Sat(assignment) => Outcome::Configurations(vec![to_configuration(model, &assignment)]),
            SolveStatus::Unsat => Outcome::NotFound,
            SolveStatus::Unknown(reason) => timed_out(self.name(), &reason),
        };
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn name(&self) -> &'static str {
        "CompleteConfig"
    }
}
