//! Compute layer: projection, clustering and validation.
//!
//! This module holds the pure computations of a recompute run. It never
//! touches storage; results leave through the `ClusterSink` callback.

pub mod clustering;
#[cfg(feature = "geojson")]
pub mod geojson;
pub mod progress;
pub mod projection;
pub mod validation;
