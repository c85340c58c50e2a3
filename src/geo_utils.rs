//! # Geographic Utilities
//!
//! Step geometry for GPS tracks.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`planar_heading`] | Direction of travel between two GPS points |
//! | [`turn_angle`] | Absolute change between two headings |
//! | [`compute_bounds`] | Bounding box of a set of points |
//! | [`compute_center`] | Centroid of a set of points |
//!
//! ## Example
//!
//! ```rust
//! use movement_metrics::{GpsPoint, geo_utils};
//!
//! let a = GpsPoint::new(0.0, 0.0);
//! let b = GpsPoint::new(0.0, 0.0001);
//!
//! let dist = geo_utils::haversine_distance(&a, &b);
//! assert!((dist - 11.12).abs() < 0.05);
//!
//! // Due east
//! assert_eq!(geo_utils::planar_heading(&a, &b), 0.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances treat the Earth as a sphere of mean radius 6,371,008.8 m, which is
//! what [`geo::Haversine`] uses.
//!
//! ### Planar Heading
//!
//! Headings are `atan2` of the raw latitude/longitude degree differences, with
//! 0 = east and π/2 = north. This is not a geodesic bearing: longitude degrees
//! shrink with latitude, so the angle is only meaningful for the short steps
//! between consecutive fixes.

use geo::{Distance, Haversine, Point};
use std::f64::consts::PI;

use crate::{Bounds, GpsPoint};

// =============================================================================
// Step Geometry
// =============================================================================

/// Great-circle distance in meters between two GPS points.
///
/// # Example
///
/// ```rust
/// use movement_metrics::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Direction of travel from `from` to `to`, in radians within (−π, π].
///
/// `atan2` yields −π for a westward step with a negative-zero latitude
/// difference; that value is folded onto π so the range stays half-open.
#[inline]
pub fn planar_heading(from: &GpsPoint, to: &GpsPoint) -> f64 {
    let heading = (to.latitude - from.latitude).atan2(to.longitude - from.longitude);
    if heading == -PI {
        PI
    } else {
        heading
    }
}

/// Absolute difference between two headings, in radians.
///
/// The difference is not wrapped, so a step from just below π to just above −π
/// reads as nearly 2π.
#[inline]
pub fn turn_angle(previous_heading: f64, heading: f64) -> f64 {
    (heading - previous_heading).abs()
}

// =============================================================================
// Bounding Box / Center
// =============================================================================

/// Compute the bounding box of a set of GPS points.
///
/// Returns `None` for empty input.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    if points.is_empty() {
        return None;
    }

    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Some(Bounds { min_lat, max_lat, min_lng, max_lng })
}

/// Arithmetic mean of the points' coordinates. Returns (0, 0) for empty input.
///
/// Suitable for the small areas a single animal covers; tracks crossing the
/// antimeridian will average to the wrong side of the globe.
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GpsPoint::new(sum_lat / n, sum_lng / n)
}

// =============================================================================
// Unit Tests
// =============================================================================
