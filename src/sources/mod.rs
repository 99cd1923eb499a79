//! Data acquisition: upstream providers and the fallback waterfall that
//! picks, per feature kind, the first provider with non-empty data.

pub mod adapters;
pub mod cache;
pub mod http;
pub mod orchestrator;
pub mod static_source;
pub mod waterfall;

use async_trait::async_trait;

use crate::models::{FeatureKind, GeoPoint, UtilityFeature};

pub use adapters::{adapt_collection, adapt_feature, parse_kv};
pub use cache::{cache_key, FeatureCache, MemoryCache};
pub use http::GeoJsonHttpProvider;
pub use orchestrator::{Acquisition, SourceOrchestrator};
pub use static_source::StaticProvider;
pub use waterfall::{
    first_non_empty, Acquired, Provenance, ProviderAttempt, ProviderOutcome, Step,
};

/// Errors at the fetch boundary. Never reach the classifiers.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("provider does not serve {0} features")]
    Unsupported(FeatureKind),
}

/// An upstream source of utility features
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    /// Stable identifier, used in provenance and cache keys
    fn name(&self) -> &str;

    fn supports(&self, kind: FeatureKind) -> bool;

    /// Features of `kind` around `property`, already adapted
    async fn fetch(
        &self,
        kind: FeatureKind,
        property: GeoPoint,
    ) -> Result<Vec<UtilityFeature>, SourceError>;
}
