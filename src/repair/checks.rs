use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::types::{DocId, PodKey};
use crate::registry::{DocumentRecord, DocumentRegistry, RecordFilter};
use crate::storage::shard::{PodShard, PodStore};

/// Several live records claiming the same row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateRow {
    pub row: usize,
    pub ids: Vec<DocId>,
}

/// A record whose row is tagged with another document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisownedRow {
    pub id: DocId,
    pub row: usize,
    pub owner: DocId,
}

/// Everything found wrong with one pod. Producing it never modifies anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub pod: PodKey,
    /// False when the pod has records but no store file
    pub store_present: bool,
    pub rows: usize,
    pub records: usize,
    pub out_of_range: Vec<DocId>,
    pub duplicate_rows: Vec<DuplicateRow>,
    pub misowned_rows: Vec<MisownedRow>,
    /// Rows no record points at
    pub unreferenced_rows: Vec<usize>,
    /// Live records with no posting in the pod's index
    pub missing_postings: Vec<DocId>,
    /// Ids with postings but no live record in this pod
    pub orphan_postings: Vec<DocId>,
}

impl ConsistencyReport {
    /// Row count equals record count
    pub fn row_parity(&self) -> bool {
        self.rows == self.records
    }

    pub fn is_consistent(&self) -> bool {
        self.row_parity()
            && self.out_of_range.is_empty()
            && self.duplicate_rows.is_empty()
            && self.misowned_rows.is_empty()
            && self.unreferenced_rows.is_empty()
            && self.missing_postings.is_empty()
            && self.orphan_postings.is_empty()
    }

    /// Nothing left that repair can act on. Missing postings do not count:
    /// they cannot be regenerated.
    pub fn repair_complete(&self) -> bool {
        self.row_parity()
            && self.out_of_range.is_empty()
            && self.duplicate_rows.is_empty()
            && self.misowned_rows.is_empty()
            && self.unreferenced_rows.is_empty()
            && self.orphan_postings.is_empty()
    }

    pub fn problem_count(&self) -> usize {
        self.out_of_range.len()
            + self.duplicate_rows.len()
            + self.misowned_rows.len()
            + self.unreferenced_rows.len()
            + self.missing_postings.len()
            + self.orphan_postings.len()
    }
}

/// Compare a pod's stores with its registry records. `shard` is `None` when
/// the pod has no files.
pub fn inspect(pod: &PodKey, shard: Option<&PodShard>, records: &[DocumentRecord]) -> ConsistencyReport {
    let rows = shard.map_or(0, |s| s.vectors().len());

    let mut out_of_range = Vec::new();
    let mut misowned_rows = Vec::new();
    let mut by_row: BTreeMap<usize, Vec<DocId>> = BTreeMap::new();

    for record in records {
        if record.row >= rows {
            out_of_range.push(record.id);
            continue;
        }
        by_row.entry(record.row).or_default().push(record.id);

        if let Some(stored) = shard.and_then(|s| s.vectors().row(record.row)) {
            if stored.doc_id != record.id {
                misowned_rows.push(MisownedRow {
                    id: record.id,
                    row: record.row,
                    owner: stored.doc_id,
                });
            }
        }
    }

    let duplicate_rows = by_row
        .iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(&row, ids)| {
            let mut ids = ids.clone();
            ids.sort();
            DuplicateRow { row, ids }
        })
        .collect();

    let unreferenced_rows = (0..rows).filter(|row| !by_row.contains_key(row)).collect();

    let registry_ids: RoaringTreemap = records.iter().map(|r| r.id.0).collect();
    let posting_ids: RoaringTreemap = shard
        .map(|s| s.index().doc_ids().map(|id| id.0).collect())
        .unwrap_or_default();

    ConsistencyReport {
        pod: pod.clone(),
        store_present: shard.is_some(),
        rows,
        records: records.len(),
        out_of_range,
        duplicate_rows,
        misowned_rows,
        unreferenced_rows,
        missing_postings: (&registry_ids - &posting_ids).iter().map(DocId).collect(),
        orphan_postings: (&posting_ids - &registry_ids).iter().map(DocId).collect(),
    }
}

/// Read-only checks over one pod or all of them. Takes the pod's read lock,
/// so a check never observes a half-applied protocol step of this process.
pub struct ConsistencyChecker {
    store: Arc<PodStore>,
    registry: Arc<dyn DocumentRegistry>,
}

impl ConsistencyChecker {
    pub fn new(store: Arc<PodStore>, registry: Arc<dyn DocumentRegistry>) -> Self {
        ConsistencyChecker { store, registry }
    }

    pub fn check(&self, pod: &PodKey) -> Result<ConsistencyReport> {
        match self.store.get(pod) {
            Ok(shard) => {
                let shard = shard.read();
                let records = self.registry.by_pod(pod)?;
                let present = !shard.is_removed();
                Ok(inspect(pod, present.then_some(&*shard), &records))
            }
            Err(e) if e.is_pod_not_found() => {
                let records = self.registry.by_pod(pod)?;
                Ok(inspect(pod, None, &records))
            }
            Err(e) => Err(e),
        }
    }

    pub fn check_all(&self) -> Result<Vec<ConsistencyReport>> {
        self.known_pods()?.iter().map(|pod| self.check(pod)).collect()
    }

    /// Registered pods plus any pod a record points at
    pub fn known_pods(&self) -> Result<Vec<PodKey>> {
        let mut pods: BTreeSet<PodKey> = self.registry.pods()?.into_iter().map(|p| p.key).collect();
        for record in self.registry.scan(&RecordFilter::default())? {
            pods.insert(record.pod);
        }
        Ok(pods.into_iter().collect())
    }

    /// Row count equals live record count
    pub fn row_count_check(&self, pod: &PodKey) -> Result<bool> {
        Ok(self.check(pod)?.row_parity())
    }

    /// Ids with postings equal ids with records
    pub fn postings_check(&self, pod: &PodKey) -> Result<bool> {
        let report = self.check(pod)?;
        Ok(report.missing_postings.is_empty() && report.orphan_postings.is_empty())
    }

    /// No two records share a row
    pub fn duplicate_check(&self, pod: &PodKey) -> Result<bool> {
        Ok(self.check(pod)?.duplicate_rows.is_empty())
    }

    /// Ids with postings but no record
    pub fn orphan_check(&self, pod: &PodKey) -> Result<Vec<DocId>> {
        Ok(self.check(pod)?.orphan_postings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::analysis::vocabulary::Vocabulary;
    use crate::core::types::PermissionClass;
    use crate::registry::LocalRegistry;
    use crate::storage::layout::StorageLayout;
    use crate::vector::SparseVector;

    fn pod() -> PodKey {
        PodKey::new("ann", "laptop", "en", PermissionClass::User)
    }

    fn record(id: u64, row: usize) -> DocumentRecord {
        DocumentRecord {
            id: DocId(id),
            url: format!("/doc{}", id),
            title: String::new(),
            snippet: String::new(),
            description: String::new(),
            pod: pod(),
            row,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    /// Pod with rows tagged `row_ids`, postings for `posting_ids`
    fn setup(dir: &std::path::Path, row_ids: &[u64], posting_ids: &[u64]) -> Arc<PodStore> {
        let store = Arc::new(PodStore::new(StorageLayout::new(dir.to_path_buf()).unwrap()));
        let vocab = Vocabulary::from_terms(&["alpha", "beta"]).unwrap();
        let shard = store.get_or_create(&pod(), vocab.len()).unwrap();
        let mut shard = shard.write();
        for &id in row_ids {
            let vector = SparseVector::from_pairs(2, [(0, 1.0)]).unwrap();
            shard.vectors_mut().append(DocId(id), vector).unwrap();
        }
        for &id in posting_ids {
            shard.index_mut().add(DocId(id), &["alpha".to_string()], &vocab).unwrap();
        }
        store.clone()
    }

    #[test]
    fn test_consistent_pod() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup(dir.path(), &[1, 2], &[1, 2]);
        let registry = Arc::new(LocalRegistry::in_memory());
        registry.put(record(1, 0)).unwrap();
        registry.put(record(2, 1)).unwrap();

        let checker = ConsistencyChecker::new(store, registry);
        let report = checker.check(&pod()).unwrap();
        assert!(report.is_consistent(), "{:?}", report);
        assert!(checker.row_count_check(&pod()).unwrap());
        assert!(checker.postings_check(&pod()).unwrap());
    }

    #[test]
    fn test_every_kind_of_divergence() {
        let dir = tempfile::tempdir().unwrap();
        // rows: 0 -> #1, 1 -> #2, 2 -> #3, 3 -> #5
        let store = setup(dir.path(), &[1, 2, 3, 5], &[1, 2, 9]);
        let registry = Arc::new(LocalRegistry::in_memory());
        registry.put(record(1, 0)).unwrap();
        registry.put(record(2, 0)).unwrap(); // duplicate and misowned
        registry.put(record(4, 5)).unwrap(); // out of range

        let checker = ConsistencyChecker::new(store, registry);
        let report = checker.check(&pod()).unwrap();

        assert_eq!((report.rows, report.records), (4, 3));
        assert!(!report.row_parity());
        assert_eq!(report.out_of_range, vec![DocId(4)]);
        assert_eq!(report.duplicate_rows, vec![DuplicateRow { row: 0, ids: vec![DocId(1), DocId(2)] }]);
        assert_eq!(report.misowned_rows, vec![MisownedRow { id: DocId(2), row: 0, owner: DocId(1) }]);
        assert_eq!(report.unreferenced_rows, vec![1, 2, 3]);
        assert_eq!(report.missing_postings, vec![DocId(4)]);
        assert_eq!(report.orphan_postings, vec![DocId(9)]);
        assert_eq!(checker.orphan_check(&pod()).unwrap(), vec![DocId(9)]);
        assert!(!checker.duplicate_check(&pod()).unwrap());
    }

    #[test]
    fn test_records_without_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PodStore::new(StorageLayout::new(dir.path().to_path_buf()).unwrap()));
        let registry = Arc::new(LocalRegistry::in_memory());
        registry.put(record(1, 0)).unwrap();

        let checker = ConsistencyChecker::new(store, registry);
        let report = checker.check(&pod()).unwrap();
        assert!(!report.store_present);
        assert_eq!(report.out_of_range, vec![DocId(1)]);
        assert_eq!(checker.known_pods().unwrap(), vec![pod()]);
    }

    #[test]
    fn test_report_serialises() {
        let report = inspect(&pod(), None, &[]);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"rows\":0"));
        assert!(report.is_consistent());
    }
}
