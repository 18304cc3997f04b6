//! Per-zoom single-linkage clustering of projected points.
//!
//! Each zoom level is clustered independently from the raw points: two points
//! are linked when their planar distance is at most the zoom's merge distance,
//! and clusters are the connected components of that relation.
//!
//! Linking runs on a uniform grid whose cells are small enough that any two
//! points sharing a cell are always within the merge distance. Points are
//! merged per cell, then each pair of nearby cells that is not yet connected is
//! tested with an R*-tree nearest-neighbour query. Connected cells are skipped,
//! so dense regions at coarse zooms cost no more than sparse ones.

use crate::compute::progress::{ProgressSink, ProgressTracker};
use crate::compute::projection::{merge_distance, to_geographic};
use crate::config::{ClusterPoint, Config, EntityId, ProjectedPoint};
use crate::error::{ClusterError, Result};
use geo::Point;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::time::Instant;

/// Cell side as a fraction of the merge distance. The cell diagonal
/// (0.7 * sqrt 2 ~= 0.99) stays below the merge distance.
const CELL_FRACTION: f64 = 0.7;

/// Cells reachable within one merge distance lie at most this many cells away.
const CELL_REACH: i64 = 2;

/// Cell indices at or beyond 2^52 lose integer precision in `f64`.
const MAX_CELL_INDEX: f64 = 4_503_599_627_370_496.0;

/// Below this many candidate pairs, cells are compared pairwise.
const BRUTE_FORCE_PAIRS: usize = 64;

type CellKey = (i64, i64);
type IndexedCoord = GeomWithData<[f64; 2], usize>;

/// A group of points found at one zoom level.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub zoom: u8,
    /// Mean of the member coordinates, in projected space
    pub centroid: Point<f64>,
    /// Member identifiers in input order
    pub members: SmallVec<[EntityId; 1]>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_degenerate(&self) -> bool {
        self.members.len() == 1
    }

    /// Identifier of the single member of a degenerate cluster.
    pub fn entity(&self) -> Option<&EntityId> {
        if self.is_degenerate() {
            self.members.first()
        } else {
            None
        }
    }

    /// Convert to a persisted row with the centroid in geographic degrees.
    pub fn to_cluster_point(&self) -> ClusterPoint {
        let (latitude, longitude) = to_geographic(self.centroid.x(), self.centroid.y());
        let count = u32::try_from(self.members.len()).unwrap_or(u32::MAX);
        ClusterPoint::new(
            self.zoom,
            latitude,
            longitude,
            count,
            self.entity().cloned(),
        )
    }
}

/// Receiver of the complete cluster list of each zoom level.
pub trait ClusterSink {
    fn save(&mut self, zoom: u8, clusters: &[Cluster]) -> Result<()>;
}

impl<F> ClusterSink for F
where
    F: FnMut(u8, &[Cluster]) -> Result<()>,
{
    fn save(&mut self, zoom: u8, clusters: &[Cluster]) -> Result<()> {
        self(zoom, clusters)
    }
}

/// Outcome of a full clustering run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub points: usize,
    pub clusters_per_zoom: BTreeMap<u8, usize>,
}

impl RunStats {
    pub fn total_clusters(&self) -> usize {
        self.clusters_per_zoom.values().sum()
    }
}

/// Multi-resolution clustering engine.
#[derive(Debug, Clone, Default)]
pub struct Clusterer {
    config: Config,
}

impl Clusterer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cluster `points` for a single zoom level.
    pub fn cluster_zoom(&self, points: &[ProjectedPoint], zoom: u8) -> Vec<Cluster> {
        let distance = merge_distance(zoom, &self.config);
        single_linkage(points, distance)
            .into_iter()
            .map(|members| build_cluster(points, &members, zoom))
            .collect()
    }

    /// Run one pass per configured zoom level.
    ///
    /// The sink receives every zoom's clusters exactly once, even when the
    /// input is empty. A sink error aborts the run.
    ///
    /// # Examples
    ///
    /// ```
    /// use geocluster::compute::clustering::{Cluster, Clusterer};
    /// use geocluster::compute::progress::NoProgress;
    /// use geocluster::{Config, ProjectedPoint};
    ///
    /// let clusterer = Clusterer::new(Config::default().with_zoom_range(0, 3));
    /// let points = vec![
    ///     ProjectedPoint::new(0.0, 0.0, 1),
    ///     ProjectedPoint::new(10.0, 0.0, 2),
    /// ];
    ///
    /// let mut counts = Vec::new();
    /// let mut sink = |zoom: u8, clusters: &[Cluster]| -> geocluster::Result<()> {
    ///     counts.push((zoom, clusters.len()));
    ///     Ok(())
    /// };
    /// clusterer.run(points, &mut sink, &mut NoProgress)?;
    /// assert_eq!(counts, vec![(0, 1), (1, 1), (2, 1), (3, 1)]);
    /// # Ok::<(), geocluster::ClusterError>(())
    /// ```
    pub fn run<I, S, P>(&self, points: I, sink: &mut S, progress: &mut P) -> Result<RunStats>
    where
        I: IntoIterator<Item = ProjectedPoint>,
        S: ClusterSink + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let points: Vec<ProjectedPoint> = points.into_iter().collect();
        let levels = self.config.zoom_levels();
        let mut tracker = ProgressTracker::new(levels.len());
        let mut stats = RunStats {
            points: points.len(),
            ..RunStats::default()
        };

        for zoom in levels {
            let started = Instant::now();
            let clusters = self.cluster_zoom(&points, zoom);
            log::debug!(
                "zoom {}: {} points -> {} clusters (merge distance {:.1})",
                zoom,
                points.len(),
                clusters.len(),
                merge_distance(zoom, &self.config)
            );

            sink.save(zoom, &clusters).map_err(|err| match err {
                ClusterError::Sink { .. } => err,
                other => ClusterError::Sink {
                    zoom,
                    message: other.to_string(),
                },
            })?;

            stats.clusters_per_zoom.insert(zoom, clusters.len());
            progress.report(&tracker.finish_pass(zoom, started.elapsed()));
        }

        Ok(stats)
    }
}

fn build_cluster(points: &[ProjectedPoint], members: &[usize], zoom: u8) -> Cluster {
    let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(x, y), &i| {
        (x + points[i].x(), y + points[i].y())
    });
    let n = members.len() as f64;

    Cluster {
        zoom,
        centroid: Point::new(sum_x / n, sum_y / n),
        members: members.iter().map(|&i| points[i].id.clone()).collect(),
    }
}

/// Connected components of the "within `distance`" relation.
///
/// Each component lists point indices in ascending order; components are
/// ordered by their smallest index. A non-positive distance only links
/// coincident points. Points with non-finite coordinates stay alone.
pub fn single_linkage(points: &[ProjectedPoint], distance: f64) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(points.len());

    if distance.is_finite() && distance > 0.0 {
        link_within(points, distance, &mut sets);
    } else {
        link_coincident(points, &mut sets);
    }

    let mut slot_of_root: FxHashMap<usize, usize> = FxHashMap::default();
    let mut components: Vec<Vec<usize>> = Vec::new();
    for index in 0..points.len() {
        let root = sets.find(index);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            components.push(Vec::new());
            components.len() - 1
        });
        components[slot].push(index);
    }
    components
}

fn link_within(points: &[ProjectedPoint], distance: f64, sets: &mut DisjointSet) {
    let cell_size = distance * CELL_FRACTION;
    let max_distance_2 = distance * distance;

    let mut cells: FxHashMap<CellKey, Vec<usize>> = FxHashMap::default();
    for (index, point) in points.iter().enumerate() {
        if !point.x().is_finite() || !point.y().is_finite() {
            continue;
        }
        let (Some(cx), Some(cy)) = (
            cell_index(point.x(), cell_size),
            cell_index(point.y(), cell_size),
        ) else {
            log::debug!(
                "merge distance {:e} too small for grid bucketing, linking by range query",
                distance
            );
            link_by_range(points, max_distance_2, sets);
            return;
        };
        cells.entry((cx, cy)).or_default().push(index);
    }

    for members in cells.values() {
        for &other in &members[1..] {
            sets.union(members[0], other);
        }
    }

    let mut trees: FxHashMap<CellKey, RTree<IndexedCoord>> = FxHashMap::default();
    for (&(cx, cy), members) in &cells {
        for (dx, dy) in forward_neighbours() {
            let neighbour_key = (cx.wrapping_add(dx), cy.wrapping_add(dy));
            let Some(neighbours) = cells.get(&neighbour_key) else {
                continue;
            };
            if sets.find(members[0]) == sets.find(neighbours[0]) {
                continue;
            }

            let linked = if members.len() * neighbours.len() <= BRUTE_FORCE_PAIRS {
                members.iter().any(|&a| {
                    neighbours
                        .iter()
                        .any(|&b| points[a].distance_2(&points[b]) <= max_distance_2)
                })
            } else {
                let (smaller, (target_key, target)) = if members.len() <= neighbours.len() {
                    (members, (neighbour_key, neighbours))
                } else {
                    (neighbours, ((cx, cy), members))
                };
                let tree = trees
                    .entry(target_key)
                    .or_insert_with(|| index_cell(points, target));
                smaller.iter().any(|&a| {
                    let query = [points[a].x(), points[a].y()];
                    tree.nearest_neighbor(&query).is_some_and(|hit| {
                        points[a].distance_2(&points[hit.data]) <= max_distance_2
                    })
                })
            };

            if linked {
                sets.union(members[0], neighbours[0]);
            }
        }
    }
}

/// Grid cell of `coordinate`, or `None` when the index is not exactly representable.
fn cell_index(coordinate: f64, cell_size: f64) -> Option<i64> {
    let cell = (coordinate / cell_size).floor();
    if cell.is_finite() && cell.abs() < MAX_CELL_INDEX {
        Some(cell as i64)
    } else {
        None
    }
}

/// Exact linking without a grid: one R*-tree range query per point.
fn link_by_range(points: &[ProjectedPoint], max_distance_2: f64, sets: &mut DisjointSet) {
    let finite: Vec<usize> = (0..points.len())
        .filter(|&i| points[i].x().is_finite() && points[i].y().is_finite())
        .collect();
    let tree = index_cell(points, &finite);

    for &index in &finite {
        let query = [points[index].x(), points[index].y()];
        for hit in tree.locate_within_distance(query, max_distance_2) {
            if hit.data > index {
                sets.union(index, hit.data);
            }
        }
    }
}

fn link_coincident(points: &[ProjectedPoint], sets: &mut DisjointSet) {
    let mut first_at: FxHashMap<(u64, u64), usize> = FxHashMap::default();
    for (index, point) in points.iter().enumerate() {
        if !point.x().is_finite() || !point.y().is_finite() {
            continue;
        }
        // +0.0 normalises negative zero
        let key = ((point.x() + 0.0).to_bits(), (point.y() + 0.0).to_bits());
        let first = *first_at.entry(key).or_insert(index);
        sets.union(first, index);
    }
}

fn index_cell(points: &[ProjectedPoint], members: &[usize]) -> RTree<IndexedCoord> {
    RTree::bulk_load(
        members
            .iter()
            .map(|&i| GeomWithData::new([points[i].x(), points[i].y()], i))
            .collect(),
    )
}

/// Half of the neighbourhood window, so each unordered cell pair is visited once.
fn forward_neighbours() -> impl Iterator<Item = (i64, i64)> {
    (-CELL_REACH..=CELL_REACH)
        .flat_map(|dx| (0..=CELL_REACH).map(move |dy| (dx, dy)))
        .filter(|&(dx, dy)| dy > 0 || dx > 0)
}

/// Union-find whose roots are always the smallest index of their set.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut index: usize) -> usize {
        while self.parent[index] != index {
            let grandparent = self.parent[self.parent[index]];
            self.parent[index] = grandparent;
            index = grandparent;
        }
        index
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}
