use crate::point::EntityId;
use geo::Point;
use serde::{Deserialize, Serialize};

/// A persisted cluster row: one aggregate marker at one zoom level.
///
/// Rows with `count == 1` are degenerate and carry the identifier of the
/// single entity they stand for; aggregate rows never do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPoint {
    pub zoom: u8,
    /// Centroid, longitude (x) / latitude (y) in degrees
    pub location: Point<f64>,
    /// Number of member points
    pub count: u32,
    pub entity: Option<EntityId>,
}

impl ClusterPoint {
    /// Create a row, dropping `entity` unless the cluster is degenerate.
    ///
    /// ```
    /// use geocluster_types::cluster::ClusterPoint;
    /// use geocluster_types::point::EntityId;
    ///
    /// let single = ClusterPoint::new(4, 48.85, 2.35, 1, Some(EntityId::from(9)));
    /// assert_eq!(single.entity, Some(EntityId::from(9)));
    ///
    /// let group = ClusterPoint::new(4, 48.85, 2.35, 12, Some(EntityId::from(9)));
    /// assert_eq!(group.entity, None);
    /// ```
    pub fn new(
        zoom: u8,
        latitude: f64,
        longitude: f64,
        count: u32,
        entity: Option<EntityId>,
    ) -> Self {
        Self {
            zoom,
            location: Point::new(longitude, latitude),
            count,
            entity: if count == 1 { entity } else { None },
        }
    }

    pub fn latitude(&self) -> f64 {
        self.location.y()
    }

    pub fn longitude(&self) -> f64 {
        self.location.x()
    }

    pub fn is_degenerate(&self) -> bool {
        self.count == 1
    }
}
