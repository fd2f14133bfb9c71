use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, PodKey};
use crate::registry::record::{DocumentRecord, PodRecord};
use crate::registry::{DocumentRegistry, RecordFilter};
use crate::storage::layout::write_atomic;

/// Persisted part of the registry; lookup maps are rebuilt on load
#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    next_id: u64,
    records: Vec<DocumentRecord>,
    pods: Vec<PodRecord>,
}

#[derive(Default)]
struct State {
    next_id: u64,
    records: BTreeMap<DocId, DocumentRecord>,
    by_url: HashMap<String, DocId>,
    by_pod: HashMap<PodKey, BTreeSet<DocId>>,
    pods: BTreeMap<PodKey, PodRecord>,
}

impl State {
    fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut state = State {
            next_id: snapshot.next_id,
            ..State::default()
        };
        for pod in snapshot.pods {
            state.pods.insert(pod.key.clone(), pod);
        }
        for record in snapshot.records {
            state.check_url(&record)?;
            state.next_id = state.next_id.max(record.id.0 + 1);
            state.insert(record);
        }
        Ok(state)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id,
            records: self.records.values().cloned().collect(),
            pods: self.pods.values().cloned().collect(),
        }
    }

    fn check_url(&self, record: &DocumentRecord) -> Result<()> {
        match self.by_url.get(&record.url) {
            Some(&holder) if holder != record.id => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Url '{}' already belongs to document {}", record.url, holder),
            )),
            _ => Ok(()),
        }
    }

    fn insert(&mut self, record: DocumentRecord) {
        self.remove(record.id);
        self.by_url.insert(record.url.clone(), record.id);
        self.by_pod.entry(record.pod.clone()).or_default().insert(record.id);
        self.records.insert(record.id, record);
    }

    fn remove(&mut self, id: DocId) -> Option<DocumentRecord> {
        let record = self.records.remove(&id)?;
        if self.by_url.get(&record.url) == Some(&id) {
            self.by_url.remove(&record.url);
        }
        if let Some(ids) = self.by_pod.get_mut(&record.pod) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_pod.remove(&record.pod);
            }
        }
        Some(record)
    }
}

/// In-memory registry, optionally mirrored to a bincode snapshot that is
/// rewritten atomically after every mutation.
pub struct LocalRegistry {
    state: RwLock<State>,
    path: Option<PathBuf>,
}

impl LocalRegistry {
    pub fn in_memory() -> Self {
        LocalRegistry {
            state: RwLock::new(State::default()),
            path: None,
        }
    }

    /// Load the snapshot at `path` if there is one
    pub fn open(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let data = fs::read(path)?;
            let snapshot: Snapshot = bincode::deserialize(&data)?;
            State::from_snapshot(snapshot)?
        } else {
            State::default()
        };

        info!(
            path = %path.display(),
            documents = state.records.len(),
            pods = state.pods.len(),
            "opened registry"
        );
        Ok(LocalRegistry {
            state: RwLock::new(state),
            path: Some(path.to_path_buf()),
        })
    }

    fn persist(&self, state: &State) -> Result<()> {
        if let Some(path) = &self.path {
            let data = bincode::serialize(&state.snapshot())?;
            write_atomic(path, &data)?;
            debug!(bytes = data.len(), "persisted registry");
        }
        Ok(())
    }
}

impl DocumentRegistry for LocalRegistry {
    fn next_id(&self) -> Result<DocId> {
        let mut state = self.state.write();
        let id = DocId(state.next_id);
        state.next_id += 1;
        self.persist(&state)?;
        Ok(id)
    }

    fn get(&self, id: DocId) -> Result<Option<DocumentRecord>> {
        Ok(self.state.read().records.get(&id).cloned())
    }

    fn get_by_url(&self, url: &str) -> Result<Option<DocumentRecord>> {
        let state = self.state.read();
        Ok(state.by_url.get(url).and_then(|id| state.records.get(id)).cloned())
    }

    fn by_pod(&self, pod: &PodKey) -> Result<Vec<DocumentRecord>> {
        let state = self.state.read();
        Ok(state
            .by_pod
            .get(pod)
            .map(|ids| ids.iter().filter_map(|id| state.records.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    fn scan(&self, filter: &RecordFilter) -> Result<Vec<DocumentRecord>> {
        Ok(self
            .state
            .read()
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.state.read().records.len())
    }

    fn put(&self, record: DocumentRecord) -> Result<()> {
        let mut state = self.state.write();
        state.check_url(&record)?;
        state.next_id = state.next_id.max(record.id.0 + 1);
        state.insert(record);
        self.persist(&state)
    }

    fn put_many(&self, records: Vec<DocumentRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();
        // Validate the batch as a whole before touching anything
        let batch_ids: BTreeSet<DocId> = records.iter().map(|r| r.id).collect();
        let mut claimed: HashMap<&str, DocId> = HashMap::new();
        for record in &records {
            if let Some(&other) = claimed.get(record.url.as_str()) {
                if other != record.id {
                    return Err(Error::new(
                        ErrorKind::InvalidArgument,
                        format!("Url '{}' appears twice in one batch", record.url),
                    ));
                }
            }
            if let Some(&holder) = state.by_url.get(&record.url) {
                if !batch_ids.contains(&holder) {
                    state.check_url(record)?;
                }
            }
            claimed.insert(&record.url, record.id);
        }

        for record in records {
            state.next_id = state.next_id.max(record.id.0 + 1);
            state.insert(record);
        }
        self.persist(&state)
    }

    fn delete(&self, id: DocId) -> Result<Option<DocumentRecord>> {
        let mut state = self.state.write();
        let removed = state.remove(id);
        if removed.is_some() {
            self.persist(&state)?;
        }
        Ok(removed)
    }

    fn register_pod(&self, pod: &PodKey) -> Result<()> {
        let mut state = self.state.write();
        if state.pods.contains_key(pod) {
            return Ok(());
        }
        state.pods.insert(pod.clone(), PodRecord {
            key: pod.clone(),
            registered: Utc::now(),
        });
        self.persist(&state)
    }

    fn pod(&self, pod: &PodKey) -> Result<Option<PodRecord>> {
        Ok(self.state.read().pods.get(pod).cloned())
    }

    fn pods(&self) -> Result<Vec<PodRecord>> {
        Ok(self.state.read().pods.values().cloned().collect())
    }

    fn remove_pod(&self, pod: &PodKey) -> Result<bool> {
        let mut state = self.state.write();
        let removed = state.pods.remove(pod).is_some();
        if removed {
            self.persist(&state)?;
        }
        Ok(removed)
    }
}
