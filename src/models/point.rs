//! Coordinates and feature geometries.

use serde::{Deserialize, Serialize};

/// Geographic point (lat/lon), WGS84 decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build from a GeoJSON position (`[lon, lat, ...]`)
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [lon, lat, ..] => Some(Self::new(*lat, *lon)),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl From<GeoPoint> for geo::Coord<f64> {
    fn from(p: GeoPoint) -> Self {
        geo::Coord { x: p.lon, y: p.lat }
    }
}

/// Polygon as a list of rings; the first ring is the outer boundary.
pub type PolygonRings = Vec<Vec<GeoPoint>>;

/// Geometry of a single utility feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum FeatureGeometry {
    Point(GeoPoint),
    LineString(Vec<GeoPoint>),
    MultiLineString(Vec<Vec<GeoPoint>>),
    Polygon(PolygonRings),
    MultiPolygon(Vec<PolygonRings>),
}

impl FeatureGeometry {
    /// Lines usable for nearest-point search.
    ///
    /// Sub-lines with fewer than 2 points are dropped; `None` when nothing is left.
    pub fn lines(&self) -> Option<Vec<&[GeoPoint]>> {
        let lines: Vec<&[GeoPoint]> = match self {
            FeatureGeometry::LineString(line) => vec![line.as_slice()],
            FeatureGeometry::MultiLineString(lines) => lines.iter().map(Vec::as_slice).collect(),
            _ => return None,
        };

        let lines: Vec<&[GeoPoint]> = lines.into_iter().filter(|l| l.len() >= 2).collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines)
        }
    }

    /// Polygons usable for containment tests
    pub fn polygons(&self) -> Option<Vec<&PolygonRings>> {
        let polygons: Vec<&PolygonRings> = match self {
            FeatureGeometry::Polygon(rings) => vec![rings],
            FeatureGeometry::MultiPolygon(polygons) => polygons.iter().collect(),
            _ => return None,
        };

        let polygons: Vec<&PolygonRings> = polygons
            .into_iter()
            .filter(|rings| rings.first().map_or(false, |outer| outer.len() >= 3))
            .collect();
        if polygons.is_empty() {
            None
        } else {
            Some(polygons)
        }
    }

    /// Every vertex of the geometry, in order
    pub fn vertices(&self) -> Vec<GeoPoint> {
        match self {
            FeatureGeometry::Point(p) => vec![*p],
            FeatureGeometry::LineString(line) => line.clone(),
            FeatureGeometry::MultiLineString(lines) => lines.concat(),
            FeatureGeometry::Polygon(rings) => rings.concat(),
            FeatureGeometry::MultiPolygon(polygons) => {
                polygons.iter().flat_map(|rings| rings.concat()).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_position_swaps_axis_order() {
        let p = GeoPoint::from_position(&[145.03, -37.81]).unwrap();
        assert_eq!(p.lat, -37.81);
        assert_eq!(p.lon, 145.03);
        assert!(GeoPoint::from_position(&[145.03]).is_none());
    }

    #[test]
    fn test_lines_drop_short_parts() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let geometry = FeatureGeometry::MultiLineString(vec![vec![a], vec![a, b]]);
        let lines = geometry.lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 2);

        let single = FeatureGeometry::LineString(vec![a]);
        assert!(single.lines().is_none());
        assert!(FeatureGeometry::Point(a).lines().is_none());
    }

    #[test]
    fn test_polygons_need_outer_ring() {
        let empty = FeatureGeometry::Polygon(vec![]);
        assert!(empty.polygons().is_none());
    }
}
