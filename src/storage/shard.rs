use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use crate::core::error::{Error, Result};
use crate::core::types::PodKey;
use crate::index::{IndexFile, PositionalIndex};
use crate::storage::layout::StorageLayout;
use crate::storage::vector_store::VectorStore;

/// Both stores of one pod. Only ever touched through its `RwLock`:
/// the write lock is the per-pod writer exclusion.
pub struct PodShard {
    key: PodKey,
    vectors: VectorStore,
    index: PositionalIndex,
    index_path: PathBuf,
    removed: bool,
}

impl PodShard {
    fn create(layout: &StorageLayout, key: &PodKey, width: usize) -> Result<Self> {
        let vectors = VectorStore::create(&layout.vector_path(key), width)?;
        let index = PositionalIndex::new(width);
        let index_path = layout.index_path(key);
        IndexFile::save(&index_path, &index)?;

        info!(pod = %key, width, "created pod");
        Ok(PodShard {
            key: key.clone(),
            vectors,
            index,
            index_path,
            removed: false,
        })
    }

    fn open(layout: &StorageLayout, key: &PodKey) -> Result<Self> {
        if !layout.pod_exists(key) {
            return Err(Error::pod_not_found(key));
        }

        let vectors = VectorStore::open(&layout.vector_path(key))?;
        let index_path = layout.index_path(key);
        let index = if index_path.exists() {
            IndexFile::load(&index_path)?
        } else {
            // Crash between the two file creations
            warn!(pod = %key, "positional index missing, starting empty");
            PositionalIndex::new(vectors.width())
        };

        if index.vocab_size() != vectors.width() {
            return Err(Error::inconsistent(format!(
                "Pod {} index has {} slots but vectors are {} wide",
                key,
                index.vocab_size(),
                vectors.width()
            )));
        }

        debug!(pod = %key, rows = vectors.len(), docs = index.doc_count(), "opened pod");
        Ok(PodShard {
            key: key.clone(),
            vectors,
            index,
            index_path,
            removed: false,
        })
    }

    pub fn key(&self) -> &PodKey {
        &self.key
    }

    pub fn width(&self) -> usize {
        self.vectors.width()
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }

    pub fn vectors_mut(&mut self) -> &mut VectorStore {
        &mut self.vectors
    }

    pub fn index(&self) -> &PositionalIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut PositionalIndex {
        &mut self.index
    }

    /// Write the in-memory positional index back to its file
    pub fn persist_index(&self) -> Result<()> {
        IndexFile::save(&self.index_path, &self.index)
    }

    /// Set once the pod's files were deleted; stale handles must not write again
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

pub type SharedShard = Arc<RwLock<PodShard>>;

/// Lazily opened pod handles, one per pod for the life of the process.
pub struct PodStore {
    layout: StorageLayout,
    shards: RwLock<HashMap<PodKey, SharedShard>>,
}

impl PodStore {
    pub fn new(layout: StorageLayout) -> Self {
        PodStore {
            layout,
            shards: RwLock::new(HashMap::new()),
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn exists(&self, key: &PodKey) -> bool {
        self.shards.read().contains_key(key) || self.layout.pod_exists(key)
    }

    /// Handle for an existing pod; `PodNotFound` when it has no store file
    pub fn get(&self, key: &PodKey) -> Result<SharedShard> {
        self.load(key, None)
    }

    /// Handle for a pod, creating empty files of `width` columns on first write
    pub fn get_or_create(&self, key: &PodKey, width: usize) -> Result<SharedShard> {
        self.load(key, Some(width))
    }

    fn load(&self, key: &PodKey, create_width: Option<usize>) -> Result<SharedShard> {
        if let Some(shard) = self.shards.read().get(key) {
            return Ok(shard.clone());
        }

        let mut shards = self.shards.write();
        // Another thread may have opened it between the two locks
        if let Some(shard) = shards.get(key) {
            return Ok(shard.clone());
        }

        let shard = match create_width {
            Some(width) if !self.layout.pod_exists(key) => PodShard::create(&self.layout, key, width)?,
            _ => PodShard::open(&self.layout, key)?,
        };
        let shard = Arc::new(RwLock::new(shard));
        shards.insert(key.clone(), shard.clone());
        Ok(shard)
    }

    /// Delete the pod's files. The caller holds the shard's write lock and
    /// passes the guarded shard so the handle is marked dead first.
    pub fn remove_files(&self, shard: &mut PodShard) -> Result<()> {
        shard.removed = true;

        for path in [self.layout.vector_path(&shard.key), self.layout.index_path(&shard.key)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        // Only after the files are gone, so a concurrent load cannot reopen them
        self.shards.write().remove(&shard.key);

        info!(pod = %shard.key, "removed pod files");
        Ok(())
    }

    /// Lock set for `keys`, deduplicated and in `PodKey` order
    pub fn lock_set(&self, shards: Vec<(PodKey, SharedShard)>) -> ShardSet {
        ShardSet::new(shards)
    }
}

/// Several pods to be locked together. Guards are always taken in key order
/// so two writers touching the same pair cannot deadlock.
pub struct ShardSet {
    shards: Vec<(PodKey, SharedShard)>,
}

impl ShardSet {
    pub fn new(mut shards: Vec<(PodKey, SharedShard)>) -> Self {
        shards.sort_by(|a, b| a.0.cmp(&b.0));
        shards.dedup_by(|a, b| a.0 == b.0);
        ShardSet { shards }
    }

    pub fn single(key: PodKey, shard: SharedShard) -> Self {
        ShardSet { shards: vec![(key, shard)] }
    }

    pub fn contains(&self, key: &PodKey) -> bool {
        self.shards.iter().any(|(k, _)| k == key)
    }

    pub fn write(&self) -> ShardWriteGuards<'_> {
        ShardWriteGuards {
            guards: self.shards.iter().map(|(k, s)| (k, s.write())).collect(),
        }
    }

    pub fn read(&self) -> Vec<(&PodKey, RwLockReadGuard<'_, PodShard>)> {
        self.shards.iter().map(|(k, s)| (k, s.read())).collect()
    }
}

pub struct ShardWriteGuards<'a> {
    guards: Vec<(&'a PodKey, RwLockWriteGuard<'a, PodShard>)>,
}

impl ShardWriteGuards<'_> {
    /// Some pod of the set was deleted while we waited; the caller starts over
    pub fn any_removed(&self) -> bool {
        self.guards.iter().any(|(_, guard)| guard.is_removed())
    }

    /// The locked shard for `key`; `PodNotFound` if it is not part of the set
    /// or its files were deleted while we waited for the lock.
    pub fn get_mut(&mut self, key: &PodKey) -> Result<&mut PodShard> {
        let shard = self
            .guards
            .iter_mut()
            .find(|(k, _)| *k == key)
            .map(|(_, guard)| &mut **guard)
            .ok_or_else(|| Error::pod_not_found(key))?;

        if shard.is_removed() {
            return Err(Error::pod_not_found(key));
        }
        Ok(shard)
    }
}
