use geo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of the entity a point was taken from.
///
/// Sources key their records either by an integer primary key or by a
/// string (a username, a slug). Both forms serialize transparently.
///
/// # Examples
///
/// ```
/// use geocluster_types::point::EntityId;
///
/// let numeric = EntityId::from(7);
/// let named = EntityId::from("jacob");
/// assert_eq!(numeric.to_string(), "7");
/// assert_eq!(named.to_string(), "jacob");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{}", id),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

/// A geographic observation as handed over by the point source.
///
/// The wrapped `geo::Point` follows the `geo` convention of x = longitude,
/// y = latitude, while the constructor takes latitude first the way map
/// code usually reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePoint {
    /// Longitude (x) / latitude (y) in degrees
    pub location: Point<f64>,
    /// Identifier of the originating entity
    pub id: EntityId,
}

impl SourcePoint {
    /// Create a source point from latitude and longitude in degrees.
    ///
    /// # Examples
    ///
    /// ```
    /// use geocluster_types::point::SourcePoint;
    ///
    /// let sydney = SourcePoint::new(-33.8688, 151.2093, "sydney");
    /// assert_eq!(sydney.longitude(), 151.2093);
    /// ```
    pub fn new(latitude: f64, longitude: f64, id: impl Into<EntityId>) -> Self {
        Self {
            location: Point::new(longitude, latitude),
            id: id.into(),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }
}

/// A point in planar web-mercator space, ready for clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    /// Projected x (easting) / y (northing)
    pub position: Point<f64>,
    pub id: EntityId,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, id: impl Into<EntityId>) -> Self {
        Self {
            position: Point::new(x, y),
            id: id.into(),
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.position.x()
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.position.y()
    }

    /// Squared planar distance to another projected point.
    ///
    /// ```
    /// use geocluster_types::point::ProjectedPoint;
    ///
    /// let a = ProjectedPoint::new(0.0, 0.0, 1);
    /// let b = ProjectedPoint::new(3.0, 4.0, 2);
    /// assert_eq!(a.distance_2(&b), 25.0);
    /// ```
    #[inline]
    pub fn distance_2(&self, other: &ProjectedPoint) -> f64 {
        let dx = self.x() - other.x();
        let dy = self.y() - other.y();
        dx * dx + dy * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_serializes_untagged() {
        let json = serde_json::to_string(&EntityId::from(12)).unwrap();
        assert_eq!(json, "12");

        let json = serde_json::to_string(&EntityId::from("ada")).unwrap();
        assert_eq!(json, "\"ada\"");

        let back: EntityId = serde_json::from_str("\"ada\"").unwrap();
        assert_eq!(back, EntityId::Text("ada".to_string()));
    }

    #[test]
    fn test_source_point_axis_order() {
        let point = SourcePoint::new(10.0, 20.0, 1);
        assert_eq!(point.location.x(), 20.0);
        assert_eq!(point.location.y(), 10.0);
    }
}
