//! Validation for source coordinates and viewport queries.

use crate::config::{MAX_SUPPORTED_ZOOM, SourcePoint, Viewport};
use crate::error::{ClusterError, Result};

/// Validates a source record before projection.
///
/// Latitude must lie strictly inside (-90.0, 90.0) since the poles have no
/// web-mercator image; longitude must lie in [-180.0, 180.0].
///
/// # Examples
///
/// ```
/// use geocluster::compute::validation::validate_source_point;
/// use geocluster::SourcePoint;
///
/// assert!(validate_source_point(&SourcePoint::new(40.7, -74.0, 1)).is_ok());
/// assert!(validate_source_point(&SourcePoint::new(90.0, 0.0, 2)).is_err());
/// assert!(validate_source_point(&SourcePoint::new(0.0, 181.0, 3)).is_err());
/// ```
pub fn validate_source_point(point: &SourcePoint) -> Result<()> {
    let (latitude, longitude) = (point.latitude(), point.longitude());

    if !latitude.is_finite() || !longitude.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "Coordinates of {} must be finite, got: ({}, {})",
            point.id, latitude, longitude
        )));
    }

    if latitude <= -90.0 || latitude >= 90.0 {
        return Err(ClusterError::InvalidInput(format!(
            "Latitude of {} out of range (-90.0, 90.0): {}",
            point.id, latitude
        )));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ClusterError::InvalidInput(format!(
            "Longitude of {} out of range [-180.0, 180.0]: {}",
            point.id, longitude
        )));
    }

    Ok(())
}

/// Validates viewport bounds. `west > east` is legal (antimeridian crossing).
pub fn validate_viewport(viewport: &Viewport) -> Result<()> {
    for (name, longitude) in [("west", viewport.west), ("east", viewport.east)] {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ClusterError::InvalidInput(format!(
                "{} must be a longitude in [-180.0, 180.0], got: {}",
                name, longitude
            )));
        }
    }

    for (name, latitude) in [("south", viewport.south), ("north", viewport.north)] {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ClusterError::InvalidInput(format!(
                "{} must be a latitude in [-90.0, 90.0], got: {}",
                name, latitude
            )));
        }
    }

    Ok(())
}

pub fn validate_zoom(zoom: u8) -> Result<()> {
    if zoom > MAX_SUPPORTED_ZOOM {
        return Err(ClusterError::InvalidInput(format!(
            "Zoom out of range [0, {}]: {}",
            MAX_SUPPORTED_ZOOM, zoom
        )));
    }
    Ok(())
}

/// Parses a numeric request parameter, naming it in the error.
pub fn parse_coordinate(name: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        ClusterError::InvalidInput(format!("{} is not a number: {:?}", name, raw))
    })?;

    if !value.is_finite() {
        return Err(ClusterError::InvalidInput(format!(
            "{} must be finite, got: {}",
            name, raw
        )));
    }

    Ok(value)
}

pub fn parse_zoom(raw: &str) -> Result<u8> {
    let zoom: u8 = raw
        .trim()
        .parse()
        .map_err(|_| ClusterError::InvalidInput(format!("zoom is not a level: {:?}", raw)))?;
    validate_zoom(zoom)?;
    Ok(zoom)
}
