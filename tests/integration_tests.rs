//! Integration tests for depconf
//!
//! These tests verify:
//! - Operation outcomes on small hand-built graphs
//! - Agreement between normalized predicates and model domains
//! - Deterministic model building and exact cache round trips
//! - Freshness-checked caching through the analysis service

use chrono::{DateTime, Duration, TimeZone, Utc};
use depconf::constraint::Normalizer;
use depconf::domain::{
    Depth, Ecosystem, GraphSnapshot, HaveFact, ImpactAttributes, Outcome, ParentRef, RequirementEdge,
};
use depconf::model::{build, deserialize, serialize, Aggregator, ImpactAxis};
use depconf::request::OperationRequest;
use depconf::service::AnalysisService;
use depconf::solver::{SearchBackend, SolverOperation};
use depconf::store::{CacheKey, FileGraphStore, FileModelStore, MemoryGraphStore, MemoryModelStore, ModelStore};
use std::collections::BTreeMap;
use std::sync::Arc;

fn moment() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()
}

fn mean(value: f64) -> ImpactAttributes {
    ImpactAttributes {
        vulnerability_count: Some(1),
        mean: Some(value),
        weighted_mean: Some(value),
    }
}

/// P with versions 1.0, 1.1 and 2.0 under one direct requirement
fn single_package(constraint: &str) -> GraphSnapshot {
    GraphSnapshot::new("requirements.txt", Ecosystem::PyPI, moment())
        .with_edge(RequirementEdge::direct("p", constraint))
        .with_fact(HaveFact::new("p", "1.0", 10))
        .with_fact(HaveFact::new("p", "1.1", 11))
        .with_fact(HaveFact::new("p", "2.0", 20))
}

/// Two unrelated packages with impact on every version
fn two_packages() -> GraphSnapshot {
    GraphSnapshot::new("requirements.txt", Ecosystem::PyPI, moment())
        .with_fact(HaveFact::new("p", "1.0", 10).with_impact(mean(4.0)))
        .with_fact(HaveFact::new("p", "1.1", 11).with_impact(mean(1.0)))
        .with_fact(HaveFact::new("q", "3.0", 30).with_impact(mean(5.0)))
        .with_fact(HaveFact::new("q", "3.1", 31).with_impact(mean(8.0)))
}

fn run(snapshot: &GraphSnapshot, aggregator: Aggregator, operation: SolverOperation) -> Outcome {
    let model = build(snapshot, ImpactAxis::PackageImpact, aggregator);
    operation.execute(&model, &SearchBackend)
}

mod operations {
    use super::*;

    /// A satisfiable range leaves exactly one version
    #[test]
    fn test_single_admissible_version() {
        let snapshot = single_package(">=1.1,<2.0");
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Mean);
        assert_eq!(model.domains()["p"].iter().copied().collect::<Vec<_>>(), vec![11]);

        assert_eq!(
            run(&snapshot, Aggregator::Mean, SolverOperation::ValidityCheck),
            Outcome::Configurations(vec![])
        );

        let outcome = run(
            &snapshot,
            Aggregator::Mean,
            SolverOperation::CompleteConfig {
                partial: BTreeMap::new(),
            },
        );
        let configs = outcome.configurations().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].version_of("p"), Some("1.1"));
        assert_eq!(configs[0].serial_of("p"), Some(11));
    }

    /// A requirement no known version satisfies makes the model infeasible
    #[test]
    fn test_empty_admissible_set() {
        let snapshot = single_package("<1.0");
        assert_eq!(
            run(&snapshot, Aggregator::Mean, SolverOperation::ValidityCheck),
            Outcome::NotFound
        );
        assert_eq!(
            run(&snapshot, Aggregator::Mean, SolverOperation::MinimizeImpact { limit: 3 }),
            Outcome::NotFound
        );
    }

    /// Minimization and maximization pick per-package extremes under Sum
    #[test]
    fn test_minimize_and_maximize() {
        let snapshot = two_packages();

        let outcome = run(&snapshot, Aggregator::Sum, SolverOperation::MinimizeImpact { limit: 1 });
        let configs = outcome.configurations().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].serial_of("p"), Some(11));
        assert_eq!(configs[0].serial_of("q"), Some(30));
        assert_eq!(configs[0].impact, Some(6.0));

        let outcome = run(&snapshot, Aggregator::Sum, SolverOperation::MaximizeImpact { limit: 1 });
        let configs = outcome.configurations().unwrap();
        assert_eq!(configs[0].serial_of("p"), Some(10));
        assert_eq!(configs[0].serial_of("q"), Some(31));
        assert_eq!(configs[0].impact, Some(12.0));
    }

    /// Top-k results are distinct and ordered by objective value
    #[test]
    fn test_top_k_ordering() {
        let outcome = run(&two_packages(), Aggregator::Sum, SolverOperation::MinimizeImpact { limit: 10 });
        let impacts: Vec<f64> = outcome
            .configurations()
            .unwrap()
            .iter()
            .map(|c| c.impact.unwrap())
            .collect();
        assert_eq!(impacts, vec![6.0, 9.0, 9.0, 12.0]);
    }

    /// Mean divides by the number of variables with terms
    #[test]
    fn test_mean_aggregator() {
        let outcome = run(&two_packages(), Aggregator::Mean, SolverOperation::MinimizeImpact { limit: 1 });
        assert_eq!(outcome.configurations().unwrap()[0].impact, Some(3.0));
    }

    /// A band below every feasible impact finds nothing
    #[test]
    fn test_filter_band_below_all_configurations() {
        let outcome = run(
            &two_packages(),
            Aggregator::Sum,
            SolverOperation::FilterConfigs {
                min: 0.0,
                max: 0.5,
                limit: 10,
            },
        );
        assert_eq!(outcome, Outcome::NotFound);
    }

    /// Every configuration returned by the filter lies in its band
    #[test]
    fn test_filter_band_bounds() {
        let outcome = run(
            &two_packages(),
            Aggregator::Sum,
            SolverOperation::FilterConfigs {
                min: 6.0,
                max: 9.0,
                limit: 10,
            },
        );
        let configs = outcome.configurations().unwrap();
        assert_eq!(configs.len(), 3);
        assert!(configs
            .iter()
            .all(|c| (6.0..=9.0).contains(&c.impact.unwrap())));
    }

    /// The configuration nearest the target impact is returned alone
    #[test]
    fn test_config_by_impact() {
        let closest = |aggregator, impact| {
            let outcome = run(&two_packages(), aggregator, SolverOperation::ConfigByImpact { impact });
            let configs = outcome.configurations().unwrap().to_vec();
            assert_eq!(configs.len(), 1);
            configs[0].impact.unwrap()
        };

        assert_eq!(closest(Aggregator::Sum, 10.0), 9.0);
        assert_eq!(closest(Aggregator::Sum, 0.0), 6.0);
        assert_eq!(closest(Aggregator::Sum, 6.9), 6.0);
        assert_eq!(closest(Aggregator::Mean, 5.0), 4.5);
        assert_eq!(closest(Aggregator::Mean, 10.0), 6.0);
    }

    /// An infeasible model has no configuration near any target
    #[test]
    fn test_config_by_impact_infeasible() {
        let outcome = run(
            &single_package("<1.0"),
            Aggregator::Mean,
            SolverOperation::ConfigByImpact { impact: 3.0 },
        );
        assert_eq!(outcome, Outcome::NotFound);
    }

    /// Pins outside the domain make completion fail; unknown names are ignored
    #[test]
    fn test_complete_with_pins() {
        let snapshot = two_packages();
        let pinned = |pins: &[(&str, i64)]| {
            run(
                &snapshot,
                Aggregator::Sum,
                SolverOperation::CompleteConfig {
                    partial: pins.iter().map(|(n, s)| (n.to_string(), *s)).collect(),
                },
            )
        };

        let outcome = pinned(&[("q", 31)]);
        let configs = outcome.configurations().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].serial_of("q"), Some(31));
        assert!(configs[0].serial_of("p").is_some());

        assert_eq!(pinned(&[("q", 99)]), Outcome::NotFound);
        assert!(pinned(&[("unknown", 1)]).is_found());
    }

    /// Indirect requirements intersect with direct ones
    #[test]
    fn test_indirect_requirements_intersect() {
        let parent = ParentRef {
            package: "app".to_string(),
            serial_number: 1,
        };
        let snapshot = single_package(">=1.0")
            .with_edge(RequirementEdge::indirect("p", "<2.0", parent, 2))
            .with_fact(HaveFact::new("app", "1", 1));
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Mean);
        assert_eq!(model.domains()["p"].len(), 2);
        assert_eq!(model.variables["p"].clauses.len(), 2);
    }
}

mod normalization {
    use super::*;

    /// The model admits exactly the versions the normalized predicate accepts
    #[test]
    fn test_domains_agree_with_predicates() {
        let cases: &[(Ecosystem, &str, &[&str])] = &[
            (Ecosystem::PyPI, ">=1.1,!=1.2,<2", &["1.0", "1.1", "1.2", "1.5", "2.0"]),
            (Ecosystem::PyPI, "~=1.4", &["1.3", "1.4", "1.9", "2.0"]),
            (Ecosystem::Npm, "^1.2.0", &["1.1.0", "1.2.0", "1.9.3", "2.0.0"]),
            (Ecosystem::Npm, "~1.2.0 || >=3.0.0", &["1.2.5", "1.3.0", "2.5.0", "3.1.0"]),
            (Ecosystem::Cargo, "^0.3.1", &["0.3.0", "0.3.1", "0.3.9", "0.4.0"]),
            (Ecosystem::Maven, "[1.0,2.0)", &["0.9", "1.0", "1.5", "2.0"]),
            (Ecosystem::NuGet, "1.2.0", &["1.1.0", "1.2.0", "3.0.0"]),
            (Ecosystem::RubyGems, "~> 2.1", &["2.0", "2.1", "2.9", "3.0"]),
        ];
        let normalizer = Normalizer::default();

        for (ecosystem, constraint, versions) in cases {
            let mut snapshot = GraphSnapshot::new("root", *ecosystem, moment())
                .with_edge(RequirementEdge::direct("x", *constraint));
            for (serial, version) in versions.iter().enumerate() {
                snapshot = snapshot.with_fact(HaveFact::new("x", *version, serial as i64));
            }
            let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Mean);

            let predicate = normalizer.normalize(*ecosystem, constraint);
            let predicate = predicate.predicate().unwrap();
            let expected: Vec<i64> = versions
                .iter()
                .enumerate()
                .filter(|(_, v)| predicate.satisfied_by(v))
                .map(|(serial, _)| serial as i64)
                .collect();
            let actual: Vec<i64> = model.domains()["x"].iter().copied().collect();
            assert_eq!(actual, expected, "{} {}", ecosystem, constraint);
            assert!(!actual.is_empty(), "{} {}", ecosystem, constraint);
        }
    }

    /// Requirements whose markers exclude the runtime contribute no clause
    #[test]
    fn test_marker_excluded_requirement() {
        let snapshot = single_package("<1.0; python_version < \"3\"");
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Mean);
        assert!(model.variables["p"].clauses.is_empty());
        assert_eq!(model.domains()["p"].len(), 3);
    }
}

mod model_cache {
    use super::*;

    /// Building the same snapshot twice gives identical text
    #[test]
    fn test_build_is_deterministic() {
        let snapshot = two_packages().with_edge(RequirementEdge::direct("q", ">=3.1"));
        let first = serialize(&build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Sum)).unwrap();
        let second = serialize(&build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Sum)).unwrap();
        assert_eq!(first, second);
    }

    /// A decoded model answers every operation like the original
    #[test]
    fn test_decoded_model_gives_same_outcomes() {
        let snapshot = two_packages().with_edge(RequirementEdge::direct("p", ">=1.1"));
        let model = build(&snapshot, ImpactAxis::PackageImpact, Aggregator::Sum);
        let decoded = deserialize(&serialize(&model).unwrap()).unwrap();
        assert_eq!(decoded, model);

        for operation in [
            SolverOperation::ValidityCheck,
            SolverOperation::MinimizeImpact { limit: 1 },
            SolverOperation::CompleteConfig {
                partial: BTreeMap::new(),
            },
        ] {
            assert_eq!(
                operation.execute(&decoded, &SearchBackend),
                operation.execute(&model, &SearchBackend),
                "{}",
                operation.name()
            );
        }
    }
}

mod service {
    use super::*;

    fn service_with(snapshot: GraphSnapshot) -> (AnalysisService, Arc<MemoryModelStore>) {
        let graphs = Arc::new(MemoryGraphStore::with_snapshots([snapshot]));
        let models = Arc::new(MemoryModelStore::new());
        (AnalysisService::new(graphs, models.clone()), models)
    }

    /// A second request is answered from the cache
    #[tokio::test]
    async fn test_cached_model_is_reused() {
        let (service, models) = service_with(two_packages());
        let request = OperationRequest::new("requirements.txt", SolverOperation::MinimizeImpact { limit: 1 })
            .with_aggregator(Aggregator::Sum);

        let first = service.run(&request).await.unwrap();
        let key = CacheKey::new("requirements.txt", Depth::Unbounded);
        let cached = models.read_cached_model(&key).await.unwrap().unwrap();

        let second = service.run(&request).await.unwrap();
        assert_eq!(first, second);
        let again = models.read_cached_model(&key).await.unwrap().unwrap();
        assert_eq!(again.moment, cached.moment);
    }

    /// A cache entry older than the root is replaced
    #[tokio::test]
    async fn test_stale_cache_entry_is_rebuilt() {
        let (service, models) = service_with(single_package(">=1.1,<2.0"));
        let key = CacheKey::new("requirements.txt", Depth::Unbounded);

        // Cached before the root changed, for a different requirement
        let stale = build(&single_package("<1.0"), ImpactAxis::PackageImpact, Aggregator::Mean);
        models
            .write_cached_model(&key, serialize(&stale).unwrap(), moment() - Duration::days(1))
            .await
            .unwrap();

        let request = OperationRequest::new("requirements.txt", SolverOperation::ValidityCheck);
        assert_eq!(service.run(&request).await.unwrap(), Outcome::Configurations(vec![]));

        let refreshed = models.read_cached_model(&key).await.unwrap().unwrap();
        assert!(refreshed.is_fresh(moment()));
    }

    /// A cached model is retargeted to the requested aggregator
    #[tokio::test]
    async fn test_cache_hit_honors_aggregator() {
        let (service, _) = service_with(two_packages());
        let sum = OperationRequest::new("requirements.txt", SolverOperation::MinimizeImpact { limit: 1 })
            .with_aggregator(Aggregator::Sum);
        let mean = sum.clone().with_aggregator(Aggregator::Mean);

        let outcome = service.run(&sum).await.unwrap();
        assert_eq!(outcome.configurations().unwrap()[0].impact, Some(6.0));
        let outcome = service.run(&mean).await.unwrap();
        assert_eq!(outcome.configurations().unwrap()[0].impact, Some(3.0));
    }

    /// Depth limits which edges and facts enter the model
    #[tokio::test]
    async fn test_depth_limits_the_graph() {
        let parent = ParentRef {
            package: "p".to_string(),
            serial_number: 11,
        };
        let snapshot = single_package(">=1.1,<2.0")
            .with_edge(RequirementEdge::indirect("r", ">=9", parent, 2))
            .with_fact(HaveFact::new("r", "1.0", 1).at_level(2));
        let (service, _) = service_with(snapshot);

        let request = OperationRequest::new("requirements.txt", SolverOperation::ValidityCheck);
        assert_eq!(service.run(&request).await.unwrap(), Outcome::NotFound);

        let shallow = request.clone().with_depth(Depth::Levels(1));
        assert_eq!(service.run(&shallow).await.unwrap(), Outcome::Configurations(vec![]));
    }

    /// Snapshots and models round-trip through the file stores
    #[tokio::test]
    async fn test_file_backed_service() {
        let dir = tempfile::tempdir().unwrap();
        let graph_dir = dir.path().join("graphs");
        std::fs::create_dir_all(&graph_dir).unwrap();
        std::fs::write(
            graph_dir.join("requirements.txt.json"),
            serde_json::to_string(&two_packages()).unwrap(),
        )
        .unwrap();

        let models = Arc::new(FileModelStore::new(dir.path().join("models")));
        let service = AnalysisService::new(Arc::new(FileGraphStore::new(&graph_dir)), models.clone());
        let request = OperationRequest::new("requirements.txt", SolverOperation::MaximizeImpact { limit: 2 })
            .with_aggregator(Aggregator::Sum);

        let first = service.run(&request).await.unwrap();
        assert_eq!(first.configurations().unwrap().len(), 2);
        let key = CacheKey::new("requirements.txt", Depth::Unbounded);
        assert!(models.read_cached_model(&key).await.unwrap().is_some());
        assert_eq!(service.run(&request).await.unwrap(), first);
    }
}
