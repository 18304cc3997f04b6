use geo::Rect;
use serde::{Deserialize, Serialize};

/// The westernmost/easternmost longitude of the map.
pub const MAX_LONGITUDE: f64 = 180.0;

/// A map viewport in geographic degrees.
///
/// When `west > east` the viewport spans the antimeridian and covers
/// `[west, 180]` plus `[-180, east]` in longitude. Latitude bounds are always
/// stored with `south <= north`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Viewport {
    /// Create a viewport. A reversed latitude pair is swapped.
    ///
    /// # Examples
    ///
    /// ```
    /// use geocluster_types::bbox::Viewport;
    ///
    /// let europe = Viewport::new(-10.0, 60.0, 30.0, 35.0);
    /// assert_eq!(europe.south, 35.0);
    /// assert_eq!(europe.north, 60.0);
    /// assert!(!europe.crosses_antimeridian());
    /// ```
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        let (south, north) = if south > north {
            (north, south)
        } else {
            (south, north)
        };
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// A viewport covering the whole map.
    pub fn world() -> Self {
        Self::new(-MAX_LONGITUDE, -90.0, MAX_LONGITUDE, 90.0)
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Check whether a longitude/latitude lies inside the viewport (bounds inclusive).
    ///
    /// ```
    /// use geocluster_types::bbox::Viewport;
    ///
    /// let pacific = Viewport::new(170.0, -5.0, -170.0, 5.0);
    /// assert!(pacific.contains(-179.9, 0.0));
    /// assert!(!pacific.contains(0.0, 0.0));
    /// ```
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        if latitude < self.south || latitude > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            longitude >= self.west || longitude <= self.east
        } else {
            longitude >= self.west && longitude <= self.east
        }
    }

    /// Split the viewport into one or two non-wrapping rectangles
    /// (x = longitude, y = latitude).
    pub fn rects(&self) -> Vec<Rect> {
        let band = |west: f64, east: f64| {
            Rect::new(
                geo::coord! { x: west, y: self.south },
                geo::coord! { x: east, y: self.north },
            )
        };

        if self.crosses_antimeridian() {
            vec![band(self.west, MAX_LONGITUDE), band(-MAX_LONGITUDE, self.east)]
        } else {
            vec![band(self.west, self.east)]
        }
    }
}
