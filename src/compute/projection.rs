//! Spherical web-mercator projection and per-zoom merge distances.
//!
//! Matches the projection used by standard slippy-map tiles, so clusters
//! computed in projected space line up with pixel positions on the map.

use crate::config::{Config, ProjectedPoint, SourcePoint};
use std::f64::consts::PI;

/// Half the equatorial circumference of the web-mercator plane, in meters.
pub const ORIGIN_SHIFT: f64 = 20037508.34;

/// Project latitude/longitude (degrees) to web-mercator `(x, y)`.
///
/// Latitude must lie strictly inside (-90, 90); at the poles the result is
/// meaningless (infinite at -90, far off the map at 90). Callers filter such
/// records out before projecting.
///
/// # Examples
///
/// ```
/// use geocluster::compute::projection::{to_projected, ORIGIN_SHIFT};
///
/// let (x, y) = to_projected(0.0, 180.0);
/// assert!((x - ORIGIN_SHIFT).abs() < 1e-6);
/// assert!(y.abs() < 1e-6);
/// ```
pub fn to_projected(latitude: f64, longitude: f64) -> (f64, f64) {
    let x = longitude * ORIGIN_SHIFT / 180.0;
    let y = ((90.0 + latitude) * PI / 360.0).tan().ln() / (PI / 180.0);
    (x, y * ORIGIN_SHIFT / 180.0)
}

/// Inverse of [`to_projected`]: web-mercator `(x, y)` back to `(latitude, longitude)`.
pub fn to_geographic(x: f64, y: f64) -> (f64, f64) {
    let longitude = (x / ORIGIN_SHIFT) * 180.0;
    let latitude = (y / ORIGIN_SHIFT) * 180.0;
    let latitude = 180.0 / PI * (2.0 * (latitude * PI / 180.0).exp().atan() - PI / 2.0);
    (latitude, longitude)
}

/// Project a source record, keeping its identifier.
pub fn project(point: &SourcePoint) -> ProjectedPoint {
    let (x, y) = to_projected(point.latitude(), point.longitude());
    ProjectedPoint::new(x, y, point.id.clone())
}

/// Projected units covered by one screen pixel at `zoom`.
pub fn units_per_pixel(zoom: u8, tile_size: u32) -> f64 {
    let world_pixels = f64::from(tile_size) * 2f64.powi(i32::from(zoom));
    2.0 * ORIGIN_SHIFT / world_pixels
}

/// Single-linkage cut distance for `zoom`, in projected units.
///
/// The configured pixel radius times the size of a pixel at that zoom, so the
/// distance halves with every zoom step.
///
/// ```
/// use geocluster::Config;
/// use geocluster::compute::projection::merge_distance;
///
/// let config = Config::default();
/// let coarse = merge_distance(3, &config);
/// let fine = merge_distance(4, &config);
/// assert!((coarse / fine - 2.0).abs() < 1e-12);
/// ```
pub fn merge_distance(zoom: u8, config: &Config) -> f64 {
    config.cluster_radius_px * units_per_pixel(zoom, config.tile_size)
}
