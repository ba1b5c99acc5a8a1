//! Model construction from a graph snapshot

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::debug;

use super::{Aggregator, Clause, ImpactAxis, KnownVersion, Objective, SymbolicModel, Variable};
use crate::constraint::{Normalized, Normalizer};
use crate::domain::{GraphSnapshot, SerialNumber};

/// Builds symbolic models, normalizing requirements against a runtime target
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    normalizer: Normalizer,
}

impl ModelBuilder {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Build the model of `snapshot`
    ///
    /// Every distinct dependency name becomes a variable. A name with
    /// requirements but no known versions has an empty domain.
    pub fn build(&self, snapshot: &GraphSnapshot, axis: ImpactAxis, aggregator: Aggregator) -> SymbolicModel {
        let start = Instant::now();

        let mut variables: BTreeMap<String, Variable> = snapshot
            .dependency_names()
            .into_iter()
            .map(|name| (name.to_string(), Variable::default()))
            .collect();

        for fact in &snapshot.have {
            if let Some(variable) = variables.get_mut(&fact.dependency) {
                variable
                    .known
                    .entry(fact.serial_number)
                    .or_insert_with(|| KnownVersion {
                        version: fact.release.clone(),
                        impact: fact.impact,
                    });
            }
        }

        let mut dropped = 0usize;
        for edge in &snapshot.requires {
            let Some(variable) = variables.get_mut(&edge.dependency) else {
                continue;
            };
            let predicate = match self.normalizer.normalize(snapshot.ecosystem, &edge.constraint) {
                Normalized::Predicate(predicate) => predicate,
                Normalized::Dropped { reason } => {
                    debug!(
                        dependency = %edge.dependency,
                        origin = %edge.origin(),
                        %reason,
                        "requirement contributes no clause"
                    );
                    dropped += 1;
                    continue;
                }
            };

            let allowed: BTreeSet<SerialNumber> = variable
                .known
                .iter()
                .filter(|(_, known)| predicate.satisfied_by(&known.version))
                .map(|(serial, _)| *serial)
                .collect();

            variable.clauses.push(Clause {
                origin: edge.origin(),
                constraint: edge.constraint.clone(),
                kind: edge.kind,
                allowed,
            });
        }

        let objective = Objective::derive(&variables, axis, aggregator);
        debug!(
            root = %snapshot.root,
            variables = variables.len(),
            edges = snapshot.requires.len(),
            dropped,
            objective = objective.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "model built"
        );

        SymbolicModel {
            root: snapshot.root.clone(),
            ecosystem: snapshot.ecosystem,
            variables,
            objective,
        }
    }
}

/// Build the model of `snapshot` against the default runtime target
pub fn build(snapshot: &GraphSnapshot, axis: ImpactAxis, aggregator: Aggregator) -> SymbolicModel {
    ModelBuilder::default().build(snapshot, axis, aggregator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Ecosystem, HaveFact, ImpactAttributes, ParentRef, RequirementEdge};
    use chrono::{TimeZone, Utc};

    fn snapshot() -> GraphSnapshot {
        let moment = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        GraphSnapshot::new("app", Ecosystem::PyPI, moment)
            .with_edge(RequirementEdge::direct("p", ">=1.1,<2.0"))
            .with_edge(RequirementEdge::indirect(
                "q",
                "!=0.2",
                ParentRef {
                    package: "p".to_string(),
                    serial_number: 11,
                },
                2,
            ))
            .with_fact(HaveFact::new("p", "1.0", 10))
            .with_fact(HaveFact::new("p", "1.1", 11))
            .with_fact(HaveFact::new("p", "2.0", 20))
            .with_fact(HaveFact::new("q", "0.1", 1).at_level(2))
            .with_fact(HaveFact::new("q", "0.2", 2).at_level(2))
    }

    #[test]
    fn test_domains_from_requirements() {
        let model = build(&snapshot(), ImpactAxis::PackageImpact, Aggregator::Sum);
        assert_eq!(model.variables["p"].domain(), BTreeSet::from([11]));
        assert_eq!(model.variables["q"].domain(), BTreeSet::from([1]));
        assert_eq!(model.variables["q"].clauses[0].origin, "p#11");
    }

    #[test]
    fn test_intersection_of_edges() {
        let snapshot = snapshot().with_edge(RequirementEdge::indirect(
            "p",
            "<1.1",
            ParentRef {
                package: "q".to_string(),
                serial_number: 1,
            },
            3,
        ));
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Sum);
        assert!(model.variables["p"].domain().is_empty());
    }

    #[test]
    fn test_dropped_edge_contributes_no_clause() {
        let snapshot = snapshot().with_edge(RequirementEdge::direct("p", "<1.0; extra == 'docs'"));
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Sum);
        assert_eq!(model.variables["p"].clauses.len(), 1);
    }

    #[test]
    fn test_requirement_without_facts_has_empty_domain() {
        let snapshot = snapshot().with_edge(RequirementEdge::direct("ghost", ">=1"));
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Sum);
        assert!(model.variables["ghost"].domain().is_empty());
    }

    #[test]
    fn test_objective_from_impact() {
        let enriched = snapshot().with_fact(HaveFact::new("r", "3.0", 30).with_impact(ImpactAttributes {
            vulnerability_count: Some(2),
            mean: Some(5.5),
            weighted_mean: Some(6.0),
        }));
        let model = build(&enriched, ImpactAxis::PackageImpact, Aggregator::Sum);
        let objective = model.objective.as_ref().unwrap();
        assert_eq!(objective.term("r", 30), 5.5);

        let bare = build(&snapshot(), ImpactAxis::PackageImpact, Aggregator::Sum);
        assert!(bare.objective.is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build(&snapshot(), ImpactAxis::PackageImpact, Aggregator::Mean);
        let b = build(&snapshot(), ImpactAxis::PackageImpact, Aggregator::Mean);
        assert_eq!(a, b);
    }
}
