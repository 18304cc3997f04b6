//! # geocluster-types
//!
//! Value types shared by the geocluster engine and its storage backends.
//!
//! - **Point types**: `EntityId`, `SourcePoint` (geographic input), `ProjectedPoint`
//!   (planar web-mercator input to the clustering engine)
//! - **Cluster rows**: `ClusterPoint`, the persisted per-zoom aggregate
//! - **Viewports**: `Viewport`, a west/south/east/north box that may cross the antimeridian
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geocluster_types::bbox::Viewport;
//! use geocluster_types::point::{EntityId, SourcePoint};
//!
//! let person = SourcePoint::new(51.5074, -0.1278, EntityId::from(42));
//! assert_eq!(person.latitude(), 51.5074);
//!
//! // Pacific view spanning the date line
//! let pacific = Viewport::new(170.0, -10.0, -170.0, 10.0);
//! assert!(pacific.crosses_antimeridian());
//! assert!(pacific.contains(179.9, 0.0));
//! ```

pub mod bbox;
pub mod cluster;
pub mod point;
