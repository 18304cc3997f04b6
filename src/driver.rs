//! Full recompute of the cluster table.
//!
//! One run reads every point from a [`PointSource`], drops records that
//! cannot be projected, clusters the rest at every configured zoom and
//! installs the result with a single `replace_all`.

use crate::compute::clustering::{Cluster, Clusterer};
use crate::compute::progress::{LogProgress, ProgressSink};
use crate::compute::projection::project;
use crate::compute::validation::validate_source_point;
use crate::config::{Config, EntityId, ProjectedPoint, SourcePoint};
use crate::error::{ClusterError, Result};
use crate::storage::{ClusterSet, ClusterStore};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Supplier of every point eligible for clustering.
pub trait PointSource {
    fn points(&self) -> Result<Box<dyn Iterator<Item = SourcePoint> + '_>>;
}

impl PointSource for [SourcePoint] {
    fn points(&self) -> Result<Box<dyn Iterator<Item = SourcePoint> + '_>> {
        Ok(Box::new(self.iter().cloned()))
    }
}

impl PointSource for Vec<SourcePoint> {
    fn points(&self) -> Result<Box<dyn Iterator<Item = SourcePoint> + '_>> {
        self.as_slice().points()
    }
}

#[derive(Deserialize)]
struct PointRecord {
    id: EntityId,
    latitude: f64,
    longitude: f64,
}

/// Points read from a JSON array of `{"id", "latitude", "longitude"}` records.
///
/// Coordinates are not checked here; the reclusterer skips invalid ones.
#[derive(Debug, Clone, Default)]
pub struct JsonPoints {
    points: Vec<SourcePoint>,
}

impl JsonPoints {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let records: Vec<PointRecord> = serde_json::from_reader(reader)?;
        let points = records
            .into_iter()
            .map(|r| SourcePoint::new(r.latitude, r.longitude, r.id))
            .collect();
        Ok(Self { points })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PointSource for JsonPoints {
    fn points(&self) -> Result<Box<dyn Iterator<Item = SourcePoint> + '_>> {
        self.points.points()
    }
}

/// Outcome of a recompute.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Source points clustered
    pub accepted: usize,
    /// Source points dropped as invalid
    pub skipped: usize,
    pub zoom_levels: usize,
    pub clusters_per_zoom: BTreeMap<u8, usize>,
    /// Rows in the installed table
    pub rows_written: usize,
    pub elapsed: Duration,
    /// Generation now served by the store
    pub generation: Option<Uuid>,
}

/// Recomputes the cluster table of a store.
///
/// ```
/// use std::sync::Arc;
/// use geocluster::{ClusterStore, Config, MemoryStore, Reclusterer, SourcePoint, Viewport};
///
/// let store = Arc::new(MemoryStore::new());
/// let config = Config::default().with_zoom_range(0, 4);
/// let reclusterer = Reclusterer::new(Arc::clone(&store), config)?;
///
/// let people = vec![
///     SourcePoint::new(51.5074, -0.1278, 1),
///     SourcePoint::new(51.5080, -0.1281, 2),
/// ];
/// let summary = reclusterer.run(&people)?;
/// assert_eq!(summary.accepted, 2);
/// assert_eq!(store.query(0, &Viewport::world())?[0].count, 2);
/// # Ok::<(), geocluster::ClusterError>(())
/// ```
pub struct Reclusterer<S: ClusterStore + ?Sized> {
    store: Arc<S>,
    clusterer: Clusterer,
}

impl<S: ClusterStore + ?Sized> Reclusterer<S> {
    pub fn new(store: Arc<S>, config: Config) -> Result<Self> {
        config.validate().map_err(ClusterError::InvalidInput)?;
        Ok(Self {
            store,
            clusterer: Clusterer::new(config),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        self.clusterer.config()
    }

    /// Recompute everything, logging progress per zoom.
    pub fn run<P: PointSource + ?Sized>(&self, source: &P) -> Result<RunSummary> {
        self.run_with_progress(source, &mut LogProgress)
    }

    /// Recompute everything, reporting progress to `progress`.
    ///
    /// On error the store keeps serving its previous table.
    pub fn run_with_progress<P, R>(&self, source: &P, progress: &mut R) -> Result<RunSummary>
    where
        P: PointSource + ?Sized,
        R: ProgressSink + ?Sized,
    {
        let started = Instant::now();
        let config = self.clusterer.config();
        log::info!(
            "recomputing clusters for zoom {}..={}",
            config.min_zoom,
            config.max_zoom
        );

        let mut skipped = 0;
        let points: Vec<ProjectedPoint> = source
            .points()?
            .filter_map(|point| match validate_source_point(&point) {
                Ok(()) => Some(project(&point)),
                Err(err) => {
                    log::warn!("skipping source point: {}", err);
                    skipped += 1;
                    None
                }
            })
            .collect();

        let mut staged = ClusterSet::new();
        let mut stage = |zoom: u8, clusters: &[Cluster]| -> Result<()> {
            staged.insert_level(zoom, clusters.iter().map(Cluster::to_cluster_point).collect());
            Ok(())
        };
        let stats = self.clusterer.run(points, &mut stage, progress)?;

        let rows_written = staged.len();
        if let Err(err) = self.store.replace_all(staged) {
            log::error!("cluster table replacement failed, keeping previous table: {}", err);
            return Err(err);
        }

        let summary = RunSummary {
            accepted: stats.points,
            skipped,
            zoom_levels: stats.clusters_per_zoom.len(),
            clusters_per_zoom: stats.clusters_per_zoom,
            rows_written,
            elapsed: started.elapsed(),
            generation: self.store.stats()?.generation,
        };

        log::info!(
            "clustered {} points ({} skipped) into {} rows over {} zoom levels in {:.3} secs",
            summary.accepted,
            summary.skipped,
            summary.rows_written,
            summary.zoom_levels,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }
}
