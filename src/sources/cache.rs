//! Provider result cache, injected into the orchestrator.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use serde_json::Value;

use crate::models::{FeatureKind, GeoPoint};

pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Longest lifetime a single entry may be given
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// TTL-aware key/value cache for upstream provider results
#[async_trait]
pub trait FeatureCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);
    async fn clear(&self);
}

/// Cache key for one provider, kind and property location
pub fn cache_key(provider: &str, kind: FeatureKind, property: GeoPoint) -> String {
    format!(
        "{}:{}:{:.6},{:.6}",
        provider, kind, property.lat, property.lon
    )
}

#[derive(Debug, Clone)]
struct CachedFeatures {
    value: Value,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl Expiry<String, CachedFeatures> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedFeatures,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process bounded cache; expired and over-capacity entries are evicted
/// in the background
pub struct MemoryCache {
    entries: Cache<String, CachedFeatures>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Live entries, after pending evictions have run
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let entry = CachedFeatures {
            value,
            ttl: ttl.min(MAX_ENTRY_TTL),
        };
        self.entries.insert(key.to_string(), entry).await;
    }

    async fn clear(&self) {
        self.entries.invalidate_all();
    }
}
