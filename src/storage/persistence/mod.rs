//! Durable cluster storage.
//!
//! - `SnapshotFile`: whole-table snapshot written by atomic rename
//! - `SnapshotStore`: a `MemoryStore` that writes each replacement to a snapshot first

pub mod snapshot;

pub use snapshot::{SnapshotFile, SnapshotRecord, SnapshotStore};
