//! In-memory cluster store.

use super::index::Generation;
use super::{ClusterSet, ClusterStore, StoreStats};
use crate::config::{ClusterPoint, Viewport};
use crate::error::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use uuid::Uuid;

/// In-memory store serving one immutable [`Generation`] at a time.
///
/// `replace_all` builds and indexes the new generation off to the side and
/// then swaps a single pointer, so a concurrent query holds on to whichever
/// generation it started with.
pub struct MemoryStore {
    current: RwLock<Arc<Generation>>,
    replacements: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Generation::empty())),
            replacements: AtomicU64::new(0),
        }
    }

    /// The generation currently served.
    pub fn current(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read())
    }

    /// Swap in an already validated generation.
    pub(crate) fn install(&self, generation: Generation) {
        let generation = Arc::new(generation);
        let previous = std::mem::replace(&mut *self.current.write(), Arc::clone(&generation));
        self.replacements.fetch_add(1, Ordering::Relaxed);

        log::info!(
            "installed cluster generation {} ({} rows over {} zoom levels, replacing {})",
            generation.id,
            generation.clusters().len(),
            generation.clusters().zoom_count(),
            previous.id
        );
    }

    /// Load a generation without counting it as a replacement.
    #[cfg_attr(not(feature = "snapshot"), allow(dead_code))]
    pub(crate) fn restore(&self, generation: Generation) {
        *self.current.write() = Arc::new(generation);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterStore for MemoryStore {
    fn replace_all(&self, clusters: ClusterSet) -> Result<()> {
        let generation = Generation::build(Uuid::new_v4(), SystemTime::now(), clusters)?;
        self.install(generation);
        Ok(())
    }

    fn query(&self, zoom: u8, viewport: &Viewport) -> Result<Vec<ClusterPoint>> {
        Ok(self.current().query(zoom, viewport))
    }

    fn clusters_at(&self, zoom: u8) -> Result<Vec<ClusterPoint>> {
        Ok(self.current().rows_at(zoom))
    }

    fn zoom_levels(&self) -> Result<Vec<u8>> {
        Ok(self.current().clusters().zoom_levels().collect())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.current().clusters().len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.current().clusters().is_empty())
    }

    fn stats(&self) -> Result<StoreStats> {
        Ok(self
            .current()
            .stats(self.replacements.load(Ordering::Relaxed)))
    }
}
