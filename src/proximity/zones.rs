//! Spatial index for zone containment lookups.

use geo::{BoundingRect, LineString};
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use crate::geometry::point_in_polygon;
use crate::models::{FeatureGeometry, GeoPoint, PolygonRings};

/// One polygon of a zone, indexed by the bounding box of its outer ring
struct IndexedPolygon<'a> {
    /// Position of the owning feature in the source collection
    position: usize,
    rings: &'a PolygonRings,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon<'_> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<'a> IndexedPolygon<'a> {
    fn new(position: usize, rings: &'a PolygonRings) -> Option<Self> {
        let outer = rings.first()?;
        let line: LineString<f64> = outer.iter().map(|p| geo::Coord::from(*p)).collect();
        let rect = line.bounding_rect()?;
        Some(Self {
            position,
            rings,
            envelope: AABB::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            ),
        })
    }

    fn contains(&self, point: GeoPoint) -> bool {
        self.rings
            .first()
            .map_or(false, |outer| point_in_polygon(point, outer))
    }
}

/// R-tree over zone polygons.
///
/// The tree only narrows candidates; the winner is the first containing
/// feature in collection order, not the smallest or closest.
pub struct ZoneIndex<'a, T> {
    features: &'a [T],
    tree: RTree<IndexedPolygon<'a>>,
}

impl<'a, T> ZoneIndex<'a, T> {
    /// Build from a collection; features without polygon geometry are skipped
    pub fn build<F>(features: &'a [T], geometry: F) -> Self
    where
        F: Fn(&'a T) -> Option<&'a FeatureGeometry>,
    {
        let mut indexed = Vec::new();
        let mut skipped = 0;

        for (position, feature) in features.iter().enumerate() {
            match geometry(feature).and_then(FeatureGeometry::polygons) {
                Some(polygons) => indexed.extend(
                    polygons
                        .into_iter()
                        .filter_map(|rings| IndexedPolygon::new(position, rings)),
                ),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} zones without usable polygon geometry", skipped);
        }

        Self {
            features,
            tree: RTree::bulk_load(indexed),
        }
    }

    /// First feature (by collection order) whose polygon contains the point
    pub fn lookup(&self, point: GeoPoint) -> Option<(usize, &'a T)> {
        let query_envelope = AABB::from_point([point.lon, point.lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|polygon| polygon.contains(point))
            .map(|polygon| polygon.position)
            .min()
            .map(|position| (position, &self.features[position]))
    }

    /// Number of indexed polygons
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
