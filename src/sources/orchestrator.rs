//! Per-kind provider waterfalls over an injected cache.
//!
//! Each feature kind is its own waterfall: water mains may come from one
//! provider while hydrants come from another. Kinds run concurrently, the
//! providers within a kind never do.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, info, warn};

use super::waterfall::{first_non_empty, Provenance, Step};
use super::{
    cache_key, FeatureCache, FeatureProvider, GeoJsonHttpProvider, MemoryCache, SourceError,
};
use crate::config::Config;
use crate::models::{FeatureKind, FeatureSet, GeoPoint, UtilityFeature};

/// Features gathered for a set of kinds, with per-kind provenance
#[derive(Debug, Clone, Default)]
pub struct Acquisition {
    pub features: FeatureSet,
    pub provenance: BTreeMap<FeatureKind, Provenance>,
}

impl Acquisition {
    pub fn merge(mut self, other: Acquisition) -> Self {
        self.features.append(other.features);
        self.provenance.extend(other.provenance);
        self
    }
}

pub struct SourceOrchestrator {
    /// Priority order, lowest index first
    providers: Vec<Arc<dyn FeatureProvider>>,
    cache: Arc<dyn FeatureCache>,
    cache_ttl: Duration,
}

impl SourceOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn FeatureProvider>>,
        cache: Arc<dyn FeatureCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            providers,
            cache,
            cache_ttl,
        }
    }

    /// One HTTP provider per enabled `[[sources]]` entry, in priority order,
    /// over a memory cache sized by `[global]`
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let cache = Arc::new(MemoryCache::with_capacity(config.global.cache_capacity));
        Self::from_config_with_cache(config, cache)
    }

    pub fn from_config_with_cache(
        config: &Config,
        cache: Arc<dyn FeatureCache>,
    ) -> Result<Self, SourceError> {
        let mut providers: Vec<Arc<dyn FeatureProvider>> = Vec::new();

        for source in config.enabled_sources() {
            info!(
                "Registering source '{}' for {} (priority {})",
                source.name, source.kind, source.priority
            );
            providers.push(Arc::new(GeoJsonHttpProvider::new(
                source.name.clone(),
                source.kind,
                source.url.clone(),
                config.timeout(),
                config.global.search_radius_m,
            )?));
        }

        Ok(Self::new(providers, cache, config.cache_ttl()))
    }

    /// Providers serving `kind`, in fallback order
    pub fn providers_for(&self, kind: FeatureKind) -> Vec<&dyn FeatureProvider> {
        self.providers
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| p.supports(kind))
            .collect()
    }

    async fn fetch_cached(
        &self,
        provider: &dyn FeatureProvider,
        kind: FeatureKind,
        property: GeoPoint,
    ) -> Result<Vec<UtilityFeature>, SourceError> {
        let key = cache_key(provider.name(), kind, property);

        if let Some(cached) = self.cache.get(&key).await {
            match serde_json::from_value::<Vec<UtilityFeature>>(cached) {
                Ok(features) => {
                    debug!("Cache hit for {}", key);
                    return Ok(features);
                }
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
            }
        }

        let features = provider.fetch(kind, property).await?;

        if !features.is_empty() {
            match serde_json::to_value(&features) {
                Ok(value) => self.cache.set(&key, value, self.cache_ttl).await,
                Err(e) => warn!("Could not cache {}: {}", key, e),
            }
        }

        Ok(features)
    }

    /// Run the waterfall for one kind
    pub async fn acquire(
        &self,
        kind: FeatureKind,
        property: GeoPoint,
    ) -> (Vec<UtilityFeature>, Provenance) {
        let steps = self
            .providers_for(kind)
            .into_iter()
            .map(|provider| {
                Step::new(
                    provider.name(),
                    self.fetch_cached(provider, kind, property).boxed(),
                )
            })
            .collect();

        first_non_empty(kind.label(), steps, Vec::is_empty)
            .await
            .into_data()
    }

    /// Run independent waterfalls for each kind concurrently
    pub async fn acquire_kinds(&self, kinds: &[FeatureKind], property: GeoPoint) -> Acquisition {
        let results = join_all(kinds.iter().map(|&kind| async move {
            let (features, provenance) = self.acquire(kind, property).await;
            (kind, features, provenance)
        }))
        .await;

        let mut acquisition = Acquisition::default();
        for (kind, features, provenance) in results {
            acquisition.features.extend(features);
            acquisition.provenance.insert(kind, provenance);
        }
        acquisition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureCollection;
    use crate::sources::{ProviderOutcome, StaticProvider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn property() -> GeoPoint {
        GeoPoint::new(-37.8, 145.0)
    }

    fn collection(json: &str) -> FeatureCollection {
        serde_json::from_str(json).unwrap()
    }

    fn hydrants(ids: &[&str]) -> FeatureCollection {
        let features: Vec<String> = ids
            .iter()
            .map(|id| {
                format!(
                    r#"{{"geometry":{{"type":"Point","coordinates":[145.001,-37.8]}},"properties":{{"ASSET_ID":"{}"}}}}"#,
                    id
                )
            })
            .collect();
        collection(&format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        ))
    }

    fn mains() -> FeatureCollection {
        collection(
            r#"{"type":"FeatureCollection","features":[
                {"geometry":{"type":"LineString","coordinates":[[144.99,-37.8002],[145.01,-37.8002]]},
                 "properties":{"ASSET_ID":"M1"}}
            ]}"#,
        )
    }

    /// Counts calls and always fails
    struct Broken {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FeatureProvider for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn supports(&self, _kind: FeatureKind) -> bool {
            true
        }

        async fn fetch(
            &self,
            _kind: FeatureKind,
            _property: GeoPoint,
        ) -> Result<Vec<UtilityFeature>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::Status {
                url: "http://broken".to_string(),
                status: 500,
            })
        }
    }

    fn orchestrator(providers: Vec<Arc<dyn FeatureProvider>>) -> SourceOrchestrator {
        SourceOrchestrator::new(
            providers,
            Arc::new(MemoryCache::new()),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_kinds_fall_back_independently() {
        let primary = StaticProvider::new("primary")
            .with_collection(FeatureKind::WaterMain, mains())
            .with_collection(FeatureKind::Hydrant, hydrants(&[]));
        let secondary = StaticProvider::new("secondary")
            .with_collection(FeatureKind::Hydrant, hydrants(&["H9"]));

        let orchestrator = orchestrator(vec![
            Arc::new(primary) as Arc<dyn FeatureProvider>,
            Arc::new(secondary),
        ]);
        let acquisition = orchestrator
            .acquire_kinds(&[FeatureKind::WaterMain, FeatureKind::Hydrant], property())
            .await;

        assert_eq!(acquisition.features.water_mains.len(), 1);
        assert_eq!(acquisition.features.hydrants.len(), 1);
        assert_eq!(
            acquisition.features.hydrants[0].asset_id.as_deref(),
            Some("H9")
        );

        let main_source = &acquisition.provenance[&FeatureKind::WaterMain];
        assert_eq!(main_source.provider.as_deref(), Some("primary"));
        assert!(!main_source.is_fallback());

        let hydrant_source = &acquisition.provenance[&FeatureKind::Hydrant];
        assert_eq!(hydrant_source.provider.as_deref(), Some("secondary"));
        assert!(hydrant_source.is_fallback());
        assert_eq!(hydrant_source.attempts[0].outcome, ProviderOutcome::Empty);
    }

    #[tokio::test]
    async fn test_failure_degrades_to_next_provider() {
        let broken = Arc::new(Broken {
            calls: AtomicUsize::new(0),
        });
        let backup =
            StaticProvider::new("backup").with_collection(FeatureKind::Hydrant, hydrants(&["H1"]));

        let orchestrator = orchestrator(vec![
            broken.clone() as Arc<dyn FeatureProvider>,
            Arc::new(backup),
        ]);
        let (features, provenance) = orchestrator
            .acquire(FeatureKind::Hydrant, property())
            .await;

        assert_eq!(features.len(), 1);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            provenance.attempts[0].outcome,
            ProviderOutcome::Failed(_)
        ));
        assert_eq!(provenance.rank, Some(1));
    }

    #[tokio::test]
    async fn test_exhausted_kind_is_empty() {
        let broken: Arc<dyn FeatureProvider> = Arc::new(Broken {
            calls: AtomicUsize::new(0),
        });
        let orchestrator = orchestrator(vec![broken]);
        let acquisition = orchestrator
            .acquire_kinds(&[FeatureKind::DistributionZone], property())
            .await;

        assert!(acquisition.features.distribution_zones.is_empty());
        assert!(acquisition.provenance[&FeatureKind::DistributionZone].is_exhausted());
    }

    #[tokio::test]
    async fn test_no_providers_for_kind() {
        let orchestrator = orchestrator(vec![]);
        let (features, provenance) = orchestrator
            .acquire(FeatureKind::WaterMain, property())
            .await;
        assert!(features.is_empty());
        assert!(provenance.attempts.is_empty());
    }

    #[tokio::test]
    async fn test_non_empty_results_are_cached() {
        let cache = Arc::new(MemoryCache::new());
        let provider = StaticProvider::new("local")
            .with_collection(FeatureKind::Hydrant, hydrants(&["H1"]))
            .with_collection(FeatureKind::WaterMain, FeatureCollection::default());
        let orchestrator = SourceOrchestrator::new(
            vec![Arc::new(provider) as Arc<dyn FeatureProvider>],
            cache.clone(),
            Duration::from_secs(60),
        );

        orchestrator
            .acquire_kinds(&[FeatureKind::Hydrant, FeatureKind::WaterMain], property())
            .await;
        assert_eq!(cache.len().await, 1);
        assert!(cache
            .get(&cache_key("local", FeatureKind::Hydrant, property()))
            .await
            .is_some());

        // Served from cache on the second run
        let (features, _) = orchestrator.acquire(FeatureKind::Hydrant, property()).await;
        assert_eq!(features.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let cache = Arc::new(MemoryCache::new());
        let cached = vec![UtilityFeature::Hydrant(crate::models::Hydrant {
            asset_id: Some("cached".to_string()),
            location: Some(property()),
        })];
        cache
            .set(
                &cache_key("broken", FeatureKind::Hydrant, property()),
                serde_json::to_value(&cached).unwrap(),
                Duration::from_secs(60),
            )
            .await;

        let broken = Arc::new(Broken {
            calls: AtomicUsize::new(0),
        });
        let orchestrator = SourceOrchestrator::new(
            vec![broken.clone() as Arc<dyn FeatureProvider>],
            cache,
            Duration::from_secs(60),
        );
        let (features, provenance) = orchestrator
            .acquire(FeatureKind::Hydrant, property())
            .await;

        assert_eq!(features, cached);
        assert_eq!(broken.calls.load(Ordering::SeqCst), 0);
        assert_eq!(provenance.provider.as_deref(), Some("broken"));
    }

    #[test]
    fn test_from_config_orders_by_priority() {
        let config: Config = r#"
            [[sources]]
            name = "fallback"
            kind = "hydrant"
            url = "http://b/{lat},{lon}"
            priority = 5

            [[sources]]
            name = "primary"
            kind = "hydrant"
            url = "http://a/{lat},{lon}"
            priority = 1

            [[sources]]
            name = "mains"
            kind = "water_main"
            url = "http://c/{lat},{lon}"
        "#
        .parse()
        .unwrap();

        let orchestrator = SourceOrchestrator::from_config(&config).unwrap();
        let names: Vec<&str> = orchestrator
            .providers_for(FeatureKind::Hydrant)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["primary", "fallback"]);
        assert_eq!(orchestrator.providers_for(FeatureKind::WaterMain).len(), 1);
    }
}
