//! Multi-resolution point clustering for web maps.
//!
//! Points are projected to web-mercator, grouped by single-linkage per zoom
//! level, and stored as one aggregate row per cluster for fast viewport queries.
//!
//! ```rust
//! use std::sync::Arc;
//! use geocluster::api::{LinkTemplate, ViewportRequest, query_json};
//! use geocluster::{Config, MemoryStore, Reclusterer, SourcePoint};
//!
//! let store = Arc::new(MemoryStore::new());
//! let config = Config::default().with_zoom_range(0, 10);
//! let linker = LinkTemplate::from_config(&config);
//! let reclusterer = Reclusterer::new(Arc::clone(&store), config)?;
//!
//! reclusterer.run(&vec![
//!     SourcePoint::new(40.7128, -74.0060, 1),
//!     SourcePoint::new(40.7130, -74.0062, 2),
//!     SourcePoint::new(34.0522, -118.2437, 3),
//! ])?;
//!
//! let request = ViewportRequest::parse("-125", "30", "-70", "45", "10")?;
//! let json = query_json(store.as_ref(), &request, &linker)?;
//! assert!(json.contains("/people/3/"));
//! # Ok::<(), geocluster::ClusterError>(())
//! ```

pub mod api;
pub mod compute;
pub mod config;
pub mod driver;
pub mod error;
pub mod storage;

pub use config::{
    ClusterPoint, Config, EntityId, ProjectedPoint, SourcePoint, Viewport, ZoomOrder,
};
pub use error::{ClusterError, Result};

pub use compute::clustering::{Cluster, ClusterSink, Clusterer, RunStats};
pub use compute::progress::{LogProgress, NoProgress, ProgressReport, ProgressSink};
pub use compute::projection::{merge_distance, to_geographic, to_projected};

pub use driver::{JsonPoints, PointSource, Reclusterer, RunSummary};

pub use storage::{ClusterSet, ClusterStore, MemoryStore, StoreStats};

#[cfg(feature = "snapshot")]
pub use storage::{SnapshotFile, SnapshotStore};

pub use geo::Point;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{ClusterError, Config, Result};

    pub use crate::{ClusterPoint, EntityId, SourcePoint, Viewport};

    pub use crate::{ClusterStore, MemoryStore, PointSource, Reclusterer};

    #[cfg(feature = "snapshot")]
    pub use crate::SnapshotStore;

    pub use crate::api::{LinkTemplate, ViewportRequest, query_json, query_rows};

    pub use crate::{LogProgress, NoProgress, ProgressSink};
}
