//! Geometry kernel
//!
//! Pure distance and containment math between sites and hazard features.
//! No I/O and no state. Every public function validates its coordinates and
//! fails fast on malformed input rather than returning a wrong distance.
//!
//! # Conventions
//! - Great-circle distances use the haversine formula with a 3959 mile radius.
//! - Segment distances use a local planar approximation centred on the query
//!   point: 111,320 m per degree, longitude scaled by cos(latitude).
//! - `point_in_polygon` treats (lat, lon) as planar coordinates. Points lying
//!   exactly on an edge or vertex count as INSIDE.

use crate::types::{Coordinate, DistanceMetric, DistanceResult, HazardFeature, Site};
use serde::Serialize;
use siteguard_common::units::{meters_to_miles, EARTH_RADIUS_MILES, METERS_PER_DEGREE};
use thiserror::Error;

/// Tolerance (degrees) for the on-edge boundary test
const BOUNDARY_EPSILON: f64 = 1e-12;

/// Malformed geometry input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Coordinate out of range: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Need at least {required} points, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },
}

impl From<GeometryError> for siteguard_common::Error {
    fn from(err: GeometryError) -> Self {
        siteguard_common::Error::InvalidInput(err.to_string())
    }
}

/// Great-circle distance in miles
pub fn haversine_miles(a: Coordinate, b: Coordinate) -> Result<f64, GeometryError> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_unchecked(a, b))
}

fn haversine_unchecked(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards against rounding pushing h slightly above 1
    2.0 * EARTH_RADIUS_MILES * h.sqrt().min(1.0).asin()
}

/// Distance from `p` to the closest point on segment `s1`-`s2`
///
/// The projection is clamped to the segment, so the returned point always lies
/// between `s1` and `s2`. A degenerate segment (`s1 == s2`) reduces to
/// `haversine_miles(p, s1)`.
pub fn point_to_segment_miles(
    p: Coordinate,
    s1: Coordinate,
    s2: Coordinate,
) -> Result<(f64, Coordinate), GeometryError> {
    p.validate()?;
    s1.validate()?;
    s2.validate()?;
    Ok(segment_unchecked(p, s1, s2))
}

fn segment_unchecked(p: Coordinate, s1: Coordinate, s2: Coordinate) -> (f64, Coordinate) {
    if s1 == s2 {
        return (haversine_unchecked(p, s1), s1);
    }

    let lon_scale = METERS_PER_DEGREE * p.lat.to_radians().cos();
    let to_local = |c: Coordinate| ((c.lon - p.lon) * lon_scale, (c.lat - p.lat) * METERS_PER_DEGREE);

    let (ax, ay) = to_local(s1);
    let (bx, by) = to_local(s2);
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;

    // Distinct endpoints can still collapse near the poles (cos(lat) -> 0)
    if len_sq <= f64::EPSILON {
        return (haversine_unchecked(p, s1), s1);
    }

    let t = ((-ax * dx - ay * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    let meters = (cx * cx + cy * cy).sqrt();

    let closest = Coordinate::new(s1.lat + t * (s2.lat - s1.lat), s1.lon + t * (s2.lon - s1.lon));
    (meters_to_miles(meters), closest)
}

/// Distance from `p` to the nearest edge of an implicitly closed ring
///
/// Requires at least 2 points; with exactly 2 the ring is a single segment.
pub fn point_to_polygon_edge_miles(
    p: Coordinate,
    ring: &[Coordinate],
) -> Result<(f64, Coordinate), GeometryError> {
    if ring.len() < 2 {
        return Err(GeometryError::InsufficientPoints {
            required: 2,
            actual: ring.len(),
        });
    }
    p.validate()?;
    ring.iter().try_for_each(|c| c.validate().map(|_| ()))?;

    let n = ring.len();
    let mut best = segment_unchecked(p, ring[0], ring[1 % n]);
    for i in 1..n {
        let candidate = segment_unchecked(p, ring[i], ring[(i + 1) % n]);
        if candidate.0 < best.0 {
            best = candidate;
        }
    }
    Ok(best)
}

/// Even-odd ray casting over (lat, lon) treated as planar coordinates
///
/// Returns false for rings with fewer than 3 points. Points on an edge or
/// vertex are inside.
pub fn point_in_polygon(p: Coordinate, ring: &[Coordinate]) -> Result<bool, GeometryError> {
    p.validate()?;
    ring.iter().try_for_each(|c| c.validate().map(|_| ()))?;

    let n = ring.len();
    if n < 3 {
        return Ok(false);
    }

    if (0..n).any(|i| on_segment(p, ring[i], ring[(i + 1) % n])) {
        return Ok(true);
    }

    let (x, y) = (p.lon, p.lat);
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i].lon, ring[i].lat);
        let (xj, yj) = (ring[j].lon, ring[j].lat);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    Ok(inside)
}

fn on_segment(p: Coordinate, a: Coordinate, b: Coordinate) -> bool {
    let cross = (b.lon - a.lon) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lon - a.lon);
    if cross.abs() > BOUNDARY_EPSILON {
        return false;
    }
    p.lat >= a.lat.min(b.lat) - BOUNDARY_EPSILON
        && p.lat <= a.lat.max(b.lat) + BOUNDARY_EPSILON
        && p.lon >= a.lon.min(b.lon) - BOUNDARY_EPSILON
        && p.lon <= a.lon.max(b.lon) + BOUNDARY_EPSILON
}

/// Site-to-feature proximity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Proximity {
    pub distance: DistanceResult,
    /// Feature lies inside (or on the boundary of) a polygon site
    pub inside: bool,
}

/// Measure a hazard feature against a site
///
/// Point sites use the centroid metric. Polygon sites use the edge metric;
/// a contained feature has distance 0 and no closest point.
pub fn measure(site: &Site, feature: &HazardFeature) -> Result<Proximity, GeometryError> {
    site.validate()?;
    let p = feature.location.validate()?;

    match site {
        Site::Point { centroid } => Ok(Proximity {
            distance: DistanceResult {
                metric: DistanceMetric::Centroid,
                miles: haversine_unchecked(*centroid, p),
                closest_point: Some(*centroid),
            },
            inside: false,
        }),
        Site::Polygon { corners } => {
            if point_in_polygon(p, corners)? {
                return Ok(Proximity {
                    distance: DistanceResult {
                        metric: DistanceMetric::Edge,
                        miles: 0.0,
                        closest_point: None,
                    },
                    inside: true,
                });
            }
            let (miles, closest) = point_to_polygon_edge_miles(p, corners)?;
            Ok(Proximity {
                distance: DistanceResult {
                    metric: DistanceMetric::Edge,
                    miles,
                    closest_point: Some(closest),
                },
                inside: false,
            })
        }
    }
}
