//! Request handling for analysis and package catalog queries
//!
//! This module provides:
//! - Workflow coordination: validate → freshness check → cache or build → solve
//! - Blocking solver execution off the async runtime
//! - Version list refresh and requirement normalization for single packages

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constraint::{Normalized, Normalizer};
use crate::domain::{Depth, Ecosystem, GraphSummary, Outcome, Package};
use crate::enrich::ImpactEnricher;
use crate::error::AppError;
use crate::model::{deserialize, serialize, Aggregator, ImpactAxis, ModelBuilder, SymbolicModel};
use crate::registry::{refresh_package, MetadataProvider};
use crate::request::{validate_root, OperationRequest};
use crate::solver::{OptimizationBackend, SearchBackend};
use crate::store::{CacheKey, FilePackageStore, GraphStore, ModelStore};

/// Answers operation requests against cached or freshly built models
pub struct AnalysisService {
    graphs: Arc<dyn GraphStore>,
    models: Arc<dyn ModelStore>,
    builder: ModelBuilder,
    backend: Arc<dyn OptimizationBackend>,
}

impl AnalysisService {
    /// Service with the default normalizer and the search backend
    pub fn new(graphs: Arc<dyn GraphStore>, models: Arc<dyn ModelStore>) -> Self {
        Self {
            graphs,
            models,
            builder: ModelBuilder::default(),
            backend: Arc::new(SearchBackend),
        }
    }

    pub fn with_builder(mut self, builder: ModelBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn OptimizationBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Run one request
    ///
    /// A root without a snapshot yields [`Outcome::NotFound`].
    pub async fn run(&self, request: &OperationRequest) -> Result<Outcome, AppError> {
        request.validate()?;

        let Some(model) = self
            .model(&request.root, request.depth, request.axis, request.aggregator)
            .await?
        else {
            info!(root = %request.root, "no dependency graph for root");
            return Ok(Outcome::NotFound);
        };

        let operation = request.operation.clone();
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || operation.execute(&model, backend.as_ref()))
            .await
            .map_err(|e| AppError::SolverTask { message: e.to_string() })
    }

    /// Model of `root` at `depth`, targeted at the given axis and aggregator
    ///
    /// A cached model is reused only if it was written after the root last
    /// changed, still decodes and was built for `root`; otherwise the model is rebuilt and the
    /// cache entry replaced before it is returned.
    pub async fn model(
        &self,
        root: &str,
        depth: Depth,
        axis: ImpactAxis,
        aggregator: Aggregator,
    ) -> Result<Option<SymbolicModel>, AppError> {
        let Some(last_modified) = self.graphs.read_last_modified(root).await? else {
            return Ok(None);
        };

        let key = CacheKey::new(root, depth);
        match self.models.read_cached_model(&key).await? {
            Some(cached) if cached.is_fresh(last_modified) => match deserialize(&cached.text) {
                Ok(mut model) if model.root == root => {
                    debug!(key = %key, "model cache hit");
                    model.retarget(axis, aggregator);
                    return Ok(Some(model));
                }
                Ok(model) => warn!(key = %key, cached_root = %model.root, "cached model belongs to another root, rebuilding"),
                Err(e) => warn!(key = %key, error = %e, "undecodable cached model, rebuilding"),
            },
            Some(cached) => debug!(
                key = %key,
                cached_at = %cached.moment,
                %last_modified,
                "stale cached model, rebuilding"
            ),
            None => debug!(key = %key, "model cache miss"),
        }

        let Some(snapshot) = self.graphs.read_snapshot(root, depth).await? else {
            return Ok(None);
        };
        let model = self.builder.build(&snapshot, axis, aggregator);

        match serialize(&model) {
            Ok(text) => {
                if let Err(e) = self.models.write_cached_model(&key, text, Utc::now()).await {
                    warn!(key = %key, error = %e, "failed to cache model");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "failed to encode model for the cache"),
        }
        Ok(Some(model))
    }

    /// Counts of the graph below `root`
    pub async fn info(&self, root: &str, depth: Depth) -> Result<Option<GraphSummary>, AppError> {
        validate_root(root)?;
        Ok(self
            .graphs
            .read_snapshot(root, depth)
            .await?
            .map(|snapshot| snapshot.summary()))
    }
}

/// A requirement of a package version with its normalized form
#[derive(Debug, Clone)]
pub struct NormalizedRequirement {
    pub dependency: String,
    pub raw: String,
    pub normalized: Normalized,
}

/// Version lists and requirements of single packages from one registry
pub struct CatalogService {
    store: FilePackageStore,
    provider: Box<dyn MetadataProvider>,
    enricher: Box<dyn ImpactEnricher>,
    normalizer: Normalizer,
    max_age: chrono::Duration,
}

impl CatalogService {
    pub fn new(
        store: FilePackageStore,
        provider: Box<dyn MetadataProvider>,
        enricher: Box<dyn ImpactEnricher>,
        normalizer: Normalizer,
        max_age: chrono::Duration,
    ) -> Self {
        Self {
            store,
            provider,
            enricher,
            normalizer,
            max_age,
        }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.provider.ecosystem()
    }

    /// Known versions of `name`, refreshed from the registry when stale
    ///
    /// Versions already recorded keep their serial numbers.
    pub async fn versions(&self, name: &str, now: DateTime<Utc>) -> Result<Package, AppError> {
        let ecosystem = self.ecosystem();
        let stored = self.store.read_package(ecosystem, name).await?;
        if let Some(package) = &stored {
            if !package.needs_refresh(now, self.max_age) {
                debug!(package = name, "package record is current");
                return Ok(package.clone());
            }
        }

        let mut package = stored.unwrap_or_else(|| Package::new(ecosystem, name, now));
        let added = refresh_package(self.provider.as_ref(), self.enricher.as_ref(), &mut package, now).await?;
        info!(package = name, registry = self.provider.registry_name(), added, "version list refreshed");
        self.store.write_package(&package).await?;
        Ok(package)
    }

    /// Requirements of one version, normalized against the runtime target
    pub async fn requirements(&self, name: &str, version: &str) -> Result<Vec<NormalizedRequirement>, AppError> {
        let ecosystem = self.ecosystem();
        let raw = self.provider.get_requirements(name, version).await?;
        Ok(raw
            .into_iter()
            .map(|(dependency, raw)| {
                let normalized = self.normalizer.normalize(ecosystem, &raw);
                NormalizedRequirement {
                    dependency,
                    raw,
                    normalized,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GraphSnapshot, HaveFact, RequirementEdge};
    use crate::enrich::NoImpact;
    use crate::error::RegistryError;
    use crate::solver::SolverOperation;
    use crate::store::{MemoryGraphStore, MemoryModelStore};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn moment() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn snapshot() -> GraphSnapshot {
        GraphSnapshot::new("requirements.txt", Ecosystem::PyPI, moment())
            .with_edge(RequirementEdge::direct("p", ">=1.1,<2.0"))
            .with_fact(HaveFact::new("p", "1.0", 10))
            .with_fact(HaveFact::new("p", "1.1", 11))
            .with_fact(HaveFact::new("p", "2.0", 20))
    }

    fn service() -> (AnalysisService, Arc<MemoryModelStore>) {
        let graphs = Arc::new(MemoryGraphStore::with_snapshots([snapshot()]));
        let models = Arc::new(MemoryModelStore::new());
        (AnalysisService::new(graphs, models.clone()), models)
    }

    #[tokio::test]
    async fn test_run_builds_and_caches() {
        let (service, models) = service();
        let request = OperationRequest::new("requirements.txt", SolverOperation::ValidityCheck);
        assert_eq!(service.run(&request).await.unwrap(), Outcome::Configurations(vec![]));
        assert_eq!(models.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_root_is_not_found() {
        let (service, models) = service();
        let request = OperationRequest::new("missing.txt", SolverOperation::ValidityCheck);
        assert_eq!(service.run(&request).await.unwrap(), Outcome::NotFound);
        assert!(models.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let (service, _) = service();
        let request = OperationRequest::new("requirements.txt", SolverOperation::MinimizeImpact { limit: 0 });
        let err = service.run(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_rebuilt() {
        let (service, models) = service();
        let key = CacheKey::new("requirements.txt", Depth::Unbounded);
        models
            .write_cached_model(&key, "not a model".to_string(), Utc::now())
            .await
            .unwrap();

        let model = service
            .model("requirements.txt", Depth::Unbounded, ImpactAxis::PackageImpact, Aggregator::Mean)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.len(), 1);
        let cached = models.read_cached_model(&key).await.unwrap().unwrap();
        assert!(deserialize(&cached.text).is_ok());
    }

    #[tokio::test]
    async fn test_cached_model_of_another_root_is_rebuilt() {
        let (service, models) = service();
        let foreign = GraphSnapshot::new("other.txt", Ecosystem::PyPI, moment())
            .with_edge(RequirementEdge::direct("q", "*"))
            .with_fact(HaveFact::new("q", "1.0", 10));
        let text = serialize(&ModelBuilder::default().build(&foreign, ImpactAxis::PackageImpact, Aggregator::Mean)).unwrap();
        let key = CacheKey::new("requirements.txt", Depth::Unbounded);
        models.write_cached_model(&key, text, Utc::now()).await.unwrap();

        let model = service
            .model("requirements.txt", Depth::Unbounded, ImpactAxis::PackageImpact, Aggregator::Mean)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.root, "requirements.txt");
        assert!(model.variables.contains_key("p"));
        let cached = models.read_cached_model(&key).await.unwrap().unwrap();
        assert_eq!(deserialize(&cached.text).unwrap().root, "requirements.txt");
    }

    #[tokio::test]
    async fn test_info() {
        let (service, _) = service();
        let summary = service.info("requirements.txt", Depth::Unbounded).await.unwrap().unwrap();
        assert_eq!(summary.dependencies, 1);
        assert_eq!(summary.edges, 1);
        assert!(service.info("missing.txt", Depth::Unbounded).await.unwrap().is_none());
    }

    struct FixedProvider;

    #[async_trait]
    impl MetadataProvider for FixedProvider {
        fn ecosystem(&self) -> Ecosystem {
            Ecosystem::PyPI
        }

        fn registry_name(&self) -> &'static str {
            "fixed"
        }

        async fn list_versions(&self, _package: &str) -> Result<Vec<String>, RegistryError> {
            Ok(vec!["1.0".to_string(), "1.1".to_string()])
        }

        async fn get_requirements(
            &self,
            _package: &str,
            _version: &str,
        ) -> Result<BTreeMap<String, String>, RegistryError> {
            Ok(BTreeMap::from([
                ("idna".to_string(), ">=2.5,<4".to_string()),
                ("pysocks".to_string(), ">=1.5.6; extra == \"socks\"".to_string()),
            ]))
        }
    }

    fn catalog(dir: &TempDir) -> CatalogService {
        CatalogService::new(
            FilePackageStore::new(dir.path()),
            Box::new(FixedProvider),
            Box::new(NoImpact),
            Normalizer::default(),
            chrono::Duration::days(1),
        )
    }

    #[tokio::test]
    async fn test_versions_are_stored_and_reused() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir);

        let first = catalog.versions("requests", moment()).await.unwrap();
        assert_eq!(first.versions.len(), 2);

        let later = moment() + chrono::Duration::hours(1);
        let second = catalog.versions("requests", later).await.unwrap();
        assert_eq!(second.refreshed_at, moment());
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_requirements_are_normalized() {
        let dir = TempDir::new().unwrap();
        let requirements = catalog(&dir).requirements("requests", "2.31.0").await.unwrap();
        assert_eq!(requirements.len(), 2);

        let idna = &requirements[0];
        assert_eq!(idna.dependency, "idna");
        assert!(idna.normalized.predicate().unwrap().satisfied_by("3.7"));

        let socks = &requirements[1];
        assert!(matches!(socks.normalized, Normalized::Dropped { .. }));
    }
}
