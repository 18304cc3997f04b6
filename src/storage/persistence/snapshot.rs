//! Snapshot-based persistence for the cluster table.
//!
//! Each replacement writes the complete table to a temporary file, syncs it and
//! renames it over the previous snapshot, so the file on disk always holds one
//! whole generation.

use crate::config::{ClusterPoint, EntityId, Viewport};
use crate::error::{ClusterError, Result};
use crate::storage::index::Generation;
use crate::storage::{ClusterSet, ClusterStore, MemoryStore, StoreStats};
use bincode::Options;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

const SNAPSHOT_MAGIC: &[u8] = b"GEOCLUSTER_SNAPSHOT";
const SNAPSHOT_VERSION: u8 = 1;

/// A generation as read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    pub generation: Uuid,
    pub created_at: SystemTime,
    pub clusters: ClusterSet,
}

// Entity ids are untagged in JSON; bincode needs an explicit tag.
#[derive(Serialize, Deserialize)]
enum StoredEntity {
    Int(i64),
    Text(String),
}

#[derive(Serialize, Deserialize)]
struct StoredRow {
    longitude: f64,
    latitude: f64,
    count: u32,
    entity: Option<StoredEntity>,
}

#[derive(Serialize, Deserialize)]
struct StoredSnapshot {
    generation: [u8; 16],
    created_at: SystemTime,
    levels: Vec<(u8, Vec<StoredRow>)>,
}

impl StoredSnapshot {
    fn from_parts(generation: Uuid, created_at: SystemTime, clusters: &ClusterSet) -> Self {
        let levels = clusters
            .iter()
            .map(|(zoom, rows)| {
                let rows = rows
                    .iter()
                    .map(|row| StoredRow {
                        longitude: row.longitude(),
                        latitude: row.latitude(),
                        count: row.count,
                        entity: row.entity.as_ref().map(|id| match id {
                            EntityId::Int(id) => StoredEntity::Int(*id),
                            EntityId::Text(id) => StoredEntity::Text(id.clone()),
                        }),
                    })
                    .collect();
                (zoom, rows)
            })
            .collect();

        Self {
            generation: *generation.as_bytes(),
            created_at,
            levels,
        }
    }

    fn into_record(self) -> SnapshotRecord {
        let mut clusters = ClusterSet::new();
        for (zoom, rows) in self.levels {
            let rows = rows
                .into_iter()
                .map(|row| {
                    let entity = row.entity.map(|id| match id {
                        StoredEntity::Int(id) => EntityId::Int(id),
                        StoredEntity::Text(id) => EntityId::Text(id),
                    });
                    ClusterPoint::new(zoom, row.latitude, row.longitude, row.count, entity)
                })
                .collect();
            clusters.insert_level(zoom, rows);
        }

        SnapshotRecord {
            generation: Uuid::from_bytes(self.generation),
            created_at: self.created_at,
            clusters,
        }
    }
}

pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the snapshot. A missing or empty file yields `None`.
    pub fn load(&self) -> Result<Option<SnapshotRecord>> {
        if !self.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let file_len = file.metadata()?.len();
        if file_len == 0 {
            return Ok(None);
        }

        let mut reader = BufReader::new(file);

        let mut magic = vec![0u8; SNAPSHOT_MAGIC.len()];
        reader
            .read_exact(&mut magic)
            .map_err(|_| ClusterError::InvalidFormat)?;
        if magic != SNAPSHOT_MAGIC {
            return Err(ClusterError::InvalidFormat);
        }

        let mut version = [0u8; 1];
        reader
            .read_exact(&mut version)
            .map_err(|_| ClusterError::InvalidFormat)?;
        if version[0] != SNAPSHOT_VERSION {
            return Err(ClusterError::InvalidFormat);
        }

        // a corrupt length prefix must not allocate past the file size
        let stored: StoredSnapshot = bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .with_limit(file_len)
            .deserialize_from(&mut reader)?;
        Ok(Some(stored.into_record()))
    }

    /// Write a whole generation, replacing the previous snapshot atomically.
    pub fn save(
        &self,
        generation: Uuid,
        created_at: SystemTime,
        clusters: &ClusterSet,
    ) -> Result<()> {
        let temp_path = self.temp_path();
        let snapshot = StoredSnapshot::from_parts(generation, created_at, clusters);

        let written = Self::write_temp(&temp_path, &snapshot)
            .and_then(|()| Ok(std::fs::rename(&temp_path, &self.path)?));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        self.sync_parent_dir()?;

        log::debug!(
            "wrote cluster snapshot {} ({} rows) to {}",
            generation,
            clusters.len(),
            self.path.display()
        );
        Ok(())
    }

    fn write_temp(temp_path: &Path, snapshot: &StoredSnapshot) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[SNAPSHOT_VERSION])?;
        bincode::serialize_into(&mut writer, snapshot)?;

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        if let Some(name) = temp.file_name() {
            let mut new_name = name.to_string_lossy().into_owned();
            new_name.push_str(".tmp");
            temp.set_file_name(new_name);
        }
        temp
    }

    fn sync_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
        Ok(())
    }
}

/// A cluster store backed by a snapshot file.
///
/// Queries are served from memory. `replace_all` persists the new generation
/// before serving it; if writing fails, both the file and the served data
/// stay on the previous generation.
pub struct SnapshotStore {
    file: SnapshotFile,
    memory: MemoryStore,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Open a store, loading the existing snapshot if there is one.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = SnapshotFile::new(path);
        let memory = MemoryStore::new();

        if let Some(record) = file.load()? {
            let generation =
                Generation::build(record.generation, record.created_at, record.clusters)?;
            log::info!(
                "loaded cluster snapshot {} ({} rows) from {}",
                generation.id,
                generation.clusters().len(),
                file.path().display()
            );
            memory.restore(generation);
        }

        Ok(Self {
            file,
            memory,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn current(&self) -> Arc<Generation> {
        self.memory.current()
    }
}

impl ClusterStore for SnapshotStore {
    fn replace_all(&self, clusters: ClusterSet) -> Result<()> {
        let _guard = self.write_lock.lock();

        let generation = Generation::build(Uuid::new_v4(), SystemTime::now(), clusters)?;
        self.file
            .save(generation.id, generation.created_at, generation.clusters())?;
        self.memory.install(generation);
        Ok(())
    }

    fn query(&self, zoom: u8, viewport: &Viewport) -> Result<Vec<ClusterPoint>> {
        self.memory.query(zoom, viewport)
    }

    fn clusters_at(&self, zoom: u8) -> Result<Vec<ClusterPoint>> {
        self.memory.clusters_at(zoom)
    }

    fn zoom_levels(&self) -> Result<Vec<u8>> {
        self.memory.zoom_levels()
    }

    fn len(&self) -> Result<usize> {
        self.memory.len()
    }

    fn is_empty(&self) -> Result<bool> {
        self.memory.is_empty()
    }

    fn stats(&self) -> Result<StoreStats> {
        self.memory.stats()
    }
}
