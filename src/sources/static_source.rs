//! Provider backed by collections already held in memory.

use async_trait::async_trait;
use hashbrown::HashMap;

use super::{adapt_collection, FeatureProvider, SourceError};
use crate::models::{FeatureCollection, FeatureKind, GeoPoint, UtilityFeature};

/// Serves pre-parsed GeoJSON collections, one per kind
#[derive(Debug, Clone)]
pub struct StaticProvider {
    name: String,
    collections: HashMap<FeatureKind, FeatureCollection>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collections: HashMap::new(),
        }
    }

    pub fn with_collection(mut self, kind: FeatureKind, collection: FeatureCollection) -> Self {
        self.insert(kind, collection);
        self
    }

    pub fn insert(&mut self, kind: FeatureKind, collection: FeatureCollection) {
        self.collections.insert(kind, collection);
    }
}

#[async_trait]
impl FeatureProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, kind: FeatureKind) -> bool {
        self.collections.contains_key(&kind)
    }

    async fn fetch(
        &self,
        kind: FeatureKind,
        property: GeoPoint,
    ) -> Result<Vec<UtilityFeature>, SourceError> {
        let collection = self
            .collections
            .get(&kind)
            .ok_or(SourceError::Unsupported(kind))?;
        Ok(adapt_collection(collection, kind, property))
    }
}
