//! Configurations whose objective value falls inside a band

use super::{deadline, enumerate, Operation, OptimizationBackend, Query};
use crate::domain::Outcome;
use crate::model::SymbolicModel;

/// Up to `limit` configurations with objective in `[min, max]`, ascending
///
/// Without an objective every configuration has value 0.
#[derive(Debug, Clone)]
pub struct FilterConfigs {
    min: f64,
    max: f64,
    limit: usize,
    outcome: Outcome,
}

impl FilterConfigs {
    pub fn new(min: f64, max: f64, limit: usize) -> Self {
        Self {
            min,
            max,
            limit,
            outcome: Outcome::NotFound,
        }
    }
}

impl Operation for FilterConfigs {
    fn execute(&mut self, model: &SymbolicModel, backend: &dyn OptimizationBackend) {
        let query = Query::new(model, deadline()).with_bounds(self.min, self.max);
        self.outcome = enumerate(self.name(), model, query, self.limit, |q| backend.minimize(q));
    }

    fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    fn name(&self) -> &'static str {
        "FilterConfigs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ecosystem, ImpactAttributes};
    use crate::model::{Aggregator, ImpactAxis, KnownVersion, Variable};
    use crate::solver::SearchBackend;
    use std::collections::BTreeMap;

    fn model(with_impact: bool) -> SymbolicModel {
        let mut variable = Variable::default();
        for (serial, version, mean) in [(1, "1.0", 0.8), (2, "1.1", 2.4), (3, "1.2", 5.0)] {
            variable.known.insert(
                serial,
                KnownVersion {
                    version: version.to_string(),
                    impact: ImpactAttributes {
                        mean: with_impact.then_some(mean),
                        ..Default::default()
                    },
                },
            );
        }
        let mut model = SymbolicModel {
            root: "app".to_string(),
            ecosystem: Ecosystem::RubyGems,
            variables: BTreeMap::from([("rack".to_string(), variable)]),
            objective: None,
        };
        model.retarget(ImpactAxis::PackageImpact, Aggregator::Mean);
        model
    }

    #[test]
    fn test_band_is_inclusive() {
        let mut op = FilterConfigs::new(0.8, 2.4, 10);
        op.execute(&model(true), &SearchBackend);
        let versions: Vec<&str> = op
            .outcome()
            .configurations()
            .unwrap()
            .iter()
            .filter_map(|c| c.version_of("rack"))
            .collect();
        assert_eq!(versions, vec!["1.0", "1.1"]);
    }

    #[test]
    fn test_nothing_in_band() {
        let mut op = FilterConfigs::new(0.0, 0.5, 10);
        op.execute(&model(true), &SearchBackend);
        assert_eq!(op.outcome(), &Outcome::NotFound);
    }

    #[test]
    fn test_without_objective_every_value_is_zero() {
        let mut op = FilterConfigs::new(0.0, 0.5, 2);
        op.execute(&model(false), &SearchBackend);
        assert_eq!(op.outcome().configurations().unwrap().len(), 2);

        let mut op = FilterConfigs::new(1.0, 2.0, 2);
        op.execute(&model(false), &SearchBackend);
        assert_eq!(op.outcome(), &Outcome::NotFound);
    }
}
