//! Geometry primitives: great-circle distance, nearest point on a line,
//! point-in-polygon.
//!
//! Projection onto segments is done in planar lon/lat space; only the final
//! distance is measured on the sphere.

use serde::Serialize;

use crate::models::GeoPoint;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tolerance for treating a point as lying on a polygon edge
const BOUNDARY_EPSILON: f64 = 1e-12;

/// Nearest point on a line and its distance from the query point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosestPoint {
    pub point: GeoPoint,
    pub distance_meters: f64,
}

/// Great-circle distance in kilometers.
///
/// NaN inputs yield NaN.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Project `p` onto the segment `start..end`, clamping to the segment.
///
/// A zero-length segment resolves to `start`.
pub fn closest_point_on_segment(p: GeoPoint, start: GeoPoint, end: GeoPoint) -> ClosestPoint {
    let dx = end.lon - start.lon;
    let dy = end.lat - start.lat;
    let len_sq = dx * dx + dy * dy;

    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.lon - start.lon) * dx + (p.lat - start.lat) * dy) / len_sq).clamp(0.0, 1.0)
    };

    let point = GeoPoint::new(start.lat + t * dy, start.lon + t * dx);
    ClosestPoint {
        point,
        distance_meters: haversine_km(p, point) * 1000.0,
    }
}

/// Nearest point over every consecutive pair of `points`.
///
/// `None` when the line has fewer than 2 points.
pub fn closest_point_on_polyline(p: GeoPoint, points: &[GeoPoint]) -> Option<ClosestPoint> {
    points
        .windows(2)
        .map(|pair| closest_point_on_segment(p, pair[0], pair[1]))
        .fold(None, |best: Option<ClosestPoint>, candidate| match best {
            Some(b) if b.distance_meters <= candidate.distance_meters => Some(b),
            _ => Some(candidate),
        })
}

/// Global nearest point across several lines (MultiLineString parts)
pub fn closest_point_on_lines<'a, I>(p: GeoPoint, lines: I) -> Option<ClosestPoint>
where
    I: IntoIterator<Item = &'a [GeoPoint]>,
{
    lines
        .into_iter()
        .filter_map(|line| closest_point_on_polyline(p, line))
        .fold(None, |best: Option<ClosestPoint>, candidate| match best {
            Some(b) if b.distance_meters <= candidate.distance_meters => Some(b),
            _ => Some(candidate),
        })
}

/// Even-odd ray casting against the outer ring.
///
/// Points lying exactly on an edge or vertex count as inside.
pub fn point_in_polygon(p: GeoPoint, ring: &[GeoPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let (x, y) = (p.lon, p.lat);
    let mut inside = false;
    let mut j = ring.len() - 1;

    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);

        if on_segment(x, y, xi, yi, xj, yj) {
            return true;
        }

        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_segment(x: f64, y: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> bool {
    let cross = (x - x1) * (y2 - y1) - (y - y1) * (x2 - x1);
    if cross.abs() > BOUNDARY_EPSILON {
        return false;
    }
    x >= x1.min(x2) && x <= x1.max(x2) && y >= y1.min(y2) && y <= y1.max(y2)
}
