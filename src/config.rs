//! Configuration for clustering runs.
//!
//! Re-exports the shared value types from `geocluster-types` for convenience.
use serde::de::Error;

pub use geocluster_types::bbox::Viewport;
pub use geocluster_types::cluster::ClusterPoint;
pub use geocluster_types::point::{EntityId, ProjectedPoint, SourcePoint};

/// Highest zoom level a slippy map tile pyramid goes to in practice.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Order in which zoom passes are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ZoomOrder {
    /// Zoom `min_zoom` first
    #[default]
    CoarseFirst,
    /// Zoom `max_zoom` first
    FineFirst,
}

/// Clustering configuration
///
/// ```rust
/// use geocluster::Config;
///
/// let json = r#"{ "max_zoom": 15, "cluster_radius_px": 60.0 }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.zoom_levels().len(), 16);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub min_zoom: u8,

    #[serde(default = "Config::default_max_zoom")]
    pub max_zoom: u8,

    /// Merge radius in screen pixels; converted to projected units per zoom
    #[serde(default = "Config::default_cluster_radius_px")]
    pub cluster_radius_px: f64,

    #[serde(default = "Config::default_tile_size")]
    pub tile_size: u32,

    #[serde(default)]
    pub zoom_order: ZoomOrder,

    /// Detail link for degenerate clusters; `{id}` is replaced by the entity id
    #[serde(default = "Config::default_detail_link_template")]
    pub detail_link_template: String,
}

impl Config {
    const fn default_max_zoom() -> u8 {
        21
    }

    const fn default_cluster_radius_px() -> f64 {
        40.0
    }

    const fn default_tile_size() -> u32 {
        256
    }

    fn default_detail_link_template() -> String {
        "/people/{id}/".to_string()
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        assert!(min_zoom <= max_zoom, "min_zoom must not exceed max_zoom");
        assert!(
            max_zoom <= MAX_SUPPORTED_ZOOM,
            "max_zoom must be at most {}",
            MAX_SUPPORTED_ZOOM
        );
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_cluster_radius_px(mut self, radius: f64) -> Self {
        assert!(
            radius.is_finite() && radius > 0.0,
            "Cluster radius must be positive"
        );
        self.cluster_radius_px = radius;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        assert!(tile_size > 0, "Tile size must be greater than zero");
        self.tile_size = tile_size;
        self
    }

    pub fn with_zoom_order(mut self, order: ZoomOrder) -> Self {
        self.zoom_order = order;
        self
    }

    pub fn with_detail_link_template(mut self, template: impl Into<String>) -> Self {
        self.detail_link_template = template.into();
        self
    }

    /// Zoom levels in execution order.
    pub fn zoom_levels(&self) -> Vec<u8> {
        let mut levels: Vec<u8> = (self.min_zoom..=self.max_zoom).collect();
        if self.zoom_order == ZoomOrder::FineFirst {
            levels.reverse();
        }
        levels
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must be <= max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }

        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(format!(
                "max_zoom ({}) must be <= {}",
                self.max_zoom, MAX_SUPPORTED_ZOOM
            ));
        }

        if !self.cluster_radius_px.is_finite() || self.cluster_radius_px <= 0.0 {
            return Err("Cluster radius must be a positive finite number".to_string());
        }

        if self.tile_size == 0 {
            return Err("Tile size must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
            cluster_radius_px: Self::default_cluster_radius_px(),
            tile_size: Self::default_tile_size(),
            zoom_order: ZoomOrder::default(),
            detail_link_template: Self::default_detail_link_template(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.min_zoom, 0);
        assert_eq!(config.max_zoom, 21);
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.zoom_order, ZoomOrder::CoarseFirst);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default()
            .with_zoom_range(2, 12)
            .with_cluster_radius_px(25.0)
            .with_zoom_order(ZoomOrder::FineFirst);

        let json = config.to_json().unwrap();
        let deserialized = Config::from_json(&json).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_zoom_levels_respect_order() {
        let config = Config::default().with_zoom_range(3, 5);
        assert_eq!(config.zoom_levels(), vec![3, 4, 5]);

        let config = config.with_zoom_order(ZoomOrder::FineFirst);
        assert_eq!(config.zoom_levels(), vec![5, 4, 3]);
    }

    #[test]
    fn test_config_validation_rejects_bad_values() {
        assert!(Config::from_json(r#"{ "min_zoom": 9, "max_zoom": 3 }"#).is_err());
        assert!(Config::from_json(r#"{ "cluster_radius_px": -1.0 }"#).is_err());
        assert!(Config::from_json(r#"{ "tile_size": 0 }"#).is_err());
        assert!(Config::from_json(r#"{ "max_zoom": 31 }"#).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(Config::from_json(r#"{ "radius": 10 }"#).is_err());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default().with_detail_link_template("/u/{id}");
        let text = config.to_toml().unwrap();
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }
}
