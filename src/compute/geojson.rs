//! GeoJSON export of persisted cluster rows.

use crate::api::DetailLinker;
use crate::config::ClusterPoint;
use crate::error::{ClusterError, Result};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::Map;

fn cluster_to_feature<L: DetailLinker + ?Sized>(cluster: &ClusterPoint, linker: &L) -> Feature {
    let geom = Geometry::new(Value::Point(vec![cluster.longitude(), cluster.latitude()]));

    let mut props = Map::new();
    props.insert("count".to_string(), serde_json::Value::from(cluster.count));
    props.insert("zoom".to_string(), serde_json::Value::from(cluster.zoom));
    if cluster.is_degenerate()
        && let Some(link) = cluster.entity.as_ref().and_then(|id| linker.link(id))
    {
        props.insert("link".to_string(), serde_json::Value::String(link));
    }

    Feature {
        bbox: None,
        geometry: Some(geom),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

/// Converts cluster rows to a FeatureCollection of Point features with
/// `count`, `zoom` and, for degenerate clusters, `link` properties.
pub fn clusters_to_feature_collection<L: DetailLinker + ?Sized>(
    clusters: &[ClusterPoint],
    linker: &L,
) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: clusters
            .iter()
            .map(|cluster| cluster_to_feature(cluster, linker))
            .collect(),
        foreign_members: None,
    }
}

/// Converts cluster rows to a GeoJSON string.
pub fn clusters_to_geojson<L: DetailLinker + ?Sized>(
    clusters: &[ClusterPoint],
    linker: &L,
) -> Result<String> {
    let collection = clusters_to_feature_collection(clusters, linker);

    serde_json::to_string(&collection).map_err(|e| {
        ClusterError::Serialization(format!("Failed to serialize feature collection: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LinkTemplate, NoLinks};
    use crate::config::EntityId;

    #[test]
    fn test_feature_properties() {
        let clusters = vec![
            ClusterPoint::new(6, 52.52, 13.4, 1, Some(EntityId::from(5))),
            ClusterPoint::new(6, 50.1, 8.7, 8, None),
        ];
        let linker = LinkTemplate::new("/people/{id}/");
        let collection = clusters_to_feature_collection(&clusters, &linker);
        assert_eq!(collection.features.len(), 2);

        let single = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(single["count"], 1);
        assert_eq!(single["zoom"], 6);
        assert_eq!(single["link"], "/people/5/");

        let group = collection.features[1].properties.as_ref().unwrap();
        assert_eq!(group["count"], 8);
        assert!(!group.contains_key("link"));
    }

    #[test]
    fn test_geojson_uses_lon_lat_order() {
        let clusters = vec![ClusterPoint::new(3, 10.0, 20.0, 2, None)];
        let geojson = clusters_to_geojson(&clusters, &NoLinks).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&geojson).unwrap();
        assert_eq!(parsed["type"], "FeatureCollection");
        assert_eq!(
            parsed["features"][0]["geometry"]["coordinates"],
            serde_json::json!([20.0, 10.0])
        );
    }

    #[test]
    fn test_empty_collection() {
        let geojson = clusters_to_geojson(&[], &NoLinks).unwrap();
        assert!(geojson.contains("\"features\":[]"));
    }
}
