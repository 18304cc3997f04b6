//! Cluster storage abstraction for geocluster
//!
//! This module provides a trait-based abstraction over the durable cluster
//! table, so the recompute driver and the query surface work against any
//! backend that offers atomic replace-all and viewport queries.

use crate::config::{ClusterPoint, Viewport};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

mod index;
mod memory;
#[cfg(feature = "snapshot")]
pub mod persistence;

pub use index::{Generation, ZoomLayer};
pub use memory::MemoryStore;

#[cfg(feature = "snapshot")]
pub use persistence::{SnapshotFile, SnapshotRecord, SnapshotStore};

/// Trait for cluster table implementations
///
/// Readers may run concurrently with `replace_all` and must observe either
/// the previous or the new dataset in full.
pub trait ClusterStore: Send + Sync {
    /// Discard every persisted row and install `clusters` atomically
    fn replace_all(&self, clusters: ClusterSet) -> Result<()>;

    /// Rows at `zoom` whose centroid lies inside `viewport`
    fn query(&self, zoom: u8, viewport: &Viewport) -> Result<Vec<ClusterPoint>>;

    /// Every row at `zoom`, in persisted order
    fn clusters_at(&self, zoom: u8) -> Result<Vec<ClusterPoint>>;

    /// Zoom levels present in the table, ascending
    fn zoom_levels(&self) -> Result<Vec<u8>>;

    /// Total number of rows across all zoom levels
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool>;

    fn stats(&self) -> Result<StoreStats>;
}

/// A complete replacement for the cluster table, keyed by zoom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    levels: BTreeMap<u8, Vec<ClusterPoint>>,
}

impl ClusterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rows of one zoom level, replacing any staged earlier.
    pub fn insert_level(&mut self, zoom: u8, rows: Vec<ClusterPoint>) {
        self.levels.insert(zoom, rows);
    }

    pub fn level(&self, zoom: u8) -> Option<&[ClusterPoint]> {
        self.levels.get(&zoom).map(Vec::as_slice)
    }

    pub fn zoom_levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.levels.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &[ClusterPoint])> + '_ {
        self.levels.iter().map(|(zoom, rows)| (*zoom, rows.as_slice()))
    }

    /// Total number of rows
    pub fn len(&self) -> usize {
        self.levels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn zoom_count(&self) -> usize {
        self.levels.len()
    }
}

/// Cluster store statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    /// Number of zoom levels present
    pub zoom_levels: usize,
    /// Total number of rows
    pub rows: usize,
    /// Rows standing for a single entity
    pub degenerate_rows: usize,
    /// Successful `replace_all` calls since the store was opened
    pub replacements: u64,
    /// Identifier of the dataset currently served
    pub generation: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_set_counts_rows() {
        let mut set = ClusterSet::new();
        assert!(set.is_empty());

        set.insert_level(0, vec![ClusterPoint::new(0, 10.0, 10.0, 4, None)]);
        set.insert_level(1, Vec::new());
        set.insert_level(
            2,
            vec![
                ClusterPoint::new(2, 10.0, 10.0, 1, None),
                ClusterPoint::new(2, 11.0, 10.0, 3, None),
            ],
        );

        assert_eq!(set.len(), 3);
        assert_eq!(set.zoom_count(), 3);
        assert_eq!(set.zoom_levels().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(set.level(1), Some(&[][..]));
        assert_eq!(set.level(5), None);
    }

    #[test]
    fn test_insert_level_replaces() {
        let mut set = ClusterSet::new();
        set.insert_level(3, vec![ClusterPoint::new(3, 0.0, 0.0, 2, None)]);
        set.insert_level(3, Vec::new());
        assert_eq!(set.len(), 0);
        assert_eq!(set.zoom_count(), 1);
    }
}
