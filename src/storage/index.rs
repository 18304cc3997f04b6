//! Per-zoom R*-tree index over persisted cluster rows.

use super::{ClusterSet, StoreStats};
use crate::config::{ClusterPoint, Viewport};
use crate::error::{ClusterError, Result};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use std::collections::BTreeMap;
use std::time::SystemTime;
use uuid::Uuid;

type IndexedRow = GeomWithData<[f64; 2], usize>;

/// Spatial index of one zoom level. Entries point into the generation's rows.
#[derive(Debug, Clone)]
pub struct ZoomLayer {
    tree: RTree<IndexedRow>,
}

impl ZoomLayer {
    fn build(rows: &[ClusterPoint]) -> Self {
        let entries = rows
            .iter()
            .enumerate()
            .map(|(ordinal, row)| GeomWithData::new([row.longitude(), row.latitude()], ordinal))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Ordinals of the rows inside `viewport`, ascending.
    fn locate(&self, viewport: &Viewport) -> Vec<usize> {
        let mut hits: Vec<usize> = viewport
            .rects()
            .iter()
            .flat_map(|rect| {
                let envelope = AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                );
                self.tree
                    .locate_in_envelope(&envelope)
                    .map(|entry| entry.data)
                    .collect::<Vec<_>>()
            })
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

/// One immutable, fully indexed version of the cluster table.
#[derive(Debug, Clone)]
pub struct Generation {
    pub id: Uuid,
    pub created_at: SystemTime,
    clusters: ClusterSet,
    layers: BTreeMap<u8, ZoomLayer>,
}

impl Generation {
    /// The table before the first recompute.
    pub fn empty() -> Self {
        Self {
            id: Uuid::nil(),
            created_at: SystemTime::UNIX_EPOCH,
            clusters: ClusterSet::new(),
            layers: BTreeMap::new(),
        }
    }

    /// Validate and index a cluster set.
    ///
    /// Rows must have finite coordinates, belong to the zoom they are filed
    /// under, and have a non-zero count.
    pub fn build(id: Uuid, created_at: SystemTime, clusters: ClusterSet) -> Result<Self> {
        let mut layers = BTreeMap::new();

        for (zoom, rows) in clusters.iter() {
            for row in rows {
                if !row.latitude().is_finite() || !row.longitude().is_finite() {
                    return Err(ClusterError::InvalidInput(format!(
                        "Cluster at zoom {} has non-finite centroid ({}, {})",
                        zoom,
                        row.latitude(),
                        row.longitude()
                    )));
                }
                if row.zoom != zoom {
                    return Err(ClusterError::InvalidInput(format!(
                        "Cluster for zoom {} filed under zoom {}",
                        row.zoom, zoom
                    )));
                }
                if row.count == 0 {
                    return Err(ClusterError::InvalidInput(format!(
                        "Empty cluster at zoom {}",
                        zoom
                    )));
                }
            }
            layers.insert(zoom, ZoomLayer::build(rows));
        }

        Ok(Self {
            id,
            created_at,
            clusters,
            layers,
        })
    }

    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    pub fn query(&self, zoom: u8, viewport: &Viewport) -> Vec<ClusterPoint> {
        let (Some(layer), Some(rows)) = (self.layers.get(&zoom), self.clusters.level(zoom)) else {
            return Vec::new();
        };
        layer
            .locate(viewport)
            .into_iter()
            .map(|ordinal| rows[ordinal].clone())
            .collect()
    }

    pub fn rows_at(&self, zoom: u8) -> Vec<ClusterPoint> {
        self.clusters
            .level(zoom)
            .map(<[ClusterPoint]>::to_vec)
            .unwrap_or_default()
    }

    pub fn is_nil(&self) -> bool {
        self.id.is_nil()
    }

    pub(crate) fn stats(&self, replacements: u64) -> StoreStats {
        StoreStats {
            zoom_levels: self.clusters.zoom_count(),
            rows: self.clusters.len(),
            degenerate_rows: self
                .clusters
                .iter()
                .map(|(_, rows)| rows.iter().filter(|row| row.is_degenerate()).count())
                .sum(),
            replacements,
            generation: (!self.is_nil()).then_some(self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityId;

    fn generation(rows: Vec<ClusterPoint>) -> Generation {
        let mut set = ClusterSet::new();
        set.insert_level(5, rows);
        Generation::build(Uuid::new_v4(), SystemTime::now(), set).unwrap()
    }

    #[test]
    fn test_query_returns_persisted_order() {
        let generation = generation(vec![
            ClusterPoint::new(5, 1.0, 3.0, 2, None),
            ClusterPoint::new(5, 1.0, 1.0, 1, Some(EntityId::from(7))),
            ClusterPoint::new(5, 1.0, 2.0, 5, None),
        ]);

        let rows = generation.query(5, &Viewport::new(0.0, 0.0, 10.0, 10.0));
        let counts: Vec<u32> = rows.iter().map(|row| row.count).collect();
        assert_eq!(counts, vec![2, 1, 5]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let generation = generation(vec![ClusterPoint::new(5, 10.0, 20.0, 1, None)]);
        assert_eq!(
            generation
                .query(5, &Viewport::new(20.0, 10.0, 30.0, 11.0))
                .len(),
            1
        );
    }

    #[test]
    fn test_unknown_zoom_is_empty() {
        let generation = generation(vec![ClusterPoint::new(5, 0.0, 0.0, 1, None)]);
        assert!(generation.query(6, &Viewport::world()).is_empty());
        assert!(generation.rows_at(6).is_empty());
    }

    #[test]
    fn test_rejects_non_finite_rows() {
        let mut set = ClusterSet::new();
        set.insert_level(1, vec![ClusterPoint::new(1, f64::NAN, 0.0, 1, None)]);
        assert!(Generation::build(Uuid::new_v4(), SystemTime::now(), set).is_err());
    }

    #[test]
    fn test_rejects_misfiled_rows() {
        let mut set = ClusterSet::new();
        set.insert_level(1, vec![ClusterPoint::new(2, 0.0, 0.0, 1, None)]);
        let err = Generation::build(Uuid::new_v4(), SystemTime::now(), set).unwrap_err();
        assert!(err.to_string().contains("filed under zoom 1"));
    }

    #[test]
    fn test_stats_count_degenerate_rows() {
        let generation = generation(vec![
            ClusterPoint::new(5, 0.0, 0.0, 1, Some(EntityId::from(1))),
            ClusterPoint::new(5, 0.0, 1.0, 1, Some(EntityId::from(2))),
            ClusterPoint::new(5, 0.0, 2.0, 9, None),
        ]);
        let stats = generation.stats(3);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.degenerate_rows, 2);
        assert_eq!(stats.replacements, 3);
        assert_eq!(stats.generation, Some(generation.id));
    }

    #[test]
    fn test_empty_generation_has_no_id() {
        let stats = Generation::empty().stats(0);
        assert_eq!(stats.generation, None);
        assert_eq!(stats.rows, 0);
    }
}
