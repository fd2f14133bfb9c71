use std::cmp::Ordering;
use tracing::{debug, warn};
use crate::core::types::PodKey;
use crate::registry::PodRecord;
use crate::storage::shard::PodStore;
use crate::vector::SparseVector;

/// A pod chosen for scoring. `similarity` is `None` for the requester's own
/// pods, which are searched whatever their aggregate looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPod {
    pub key: PodKey,
    pub similarity: Option<f32>,
}

impl SelectedPod {
    pub fn is_own(&self) -> bool {
        self.similarity.is_none()
    }
}

/// Picks the pods a query is scored against
pub struct PodSelector {
    max_pods: usize,
}

impl PodSelector {
    pub fn new(max_pods: usize) -> Self {
        PodSelector { max_pods }
    }

    pub fn max_pods(&self) -> usize {
        self.max_pods
    }

    /// The requester's pods in `language`, followed by up to `max_pods`
    /// shared pods of other owners ranked by aggregate cosine. Pods whose
    /// similarity is zero are never offered.
    pub fn select(
        &self,
        store: &PodStore,
        pods: &[PodRecord],
        language: &str,
        requester: Option<&str>,
        query: &SparseVector,
    ) -> Vec<SelectedPod> {
        let is_own = |key: &PodKey| requester.is_some_and(|user| key.is_owned_by(user));

        let mut selected: Vec<SelectedPod> = pods
            .iter()
            .filter(|pod| pod.key.language == language && is_own(&pod.key))
            .map(|pod| SelectedPod { key: pod.key.clone(), similarity: None })
            .collect();
        selected.sort_by(|a, b| a.key.cmp(&b.key));

        let mut ranked: Vec<SelectedPod> = pods
            .iter()
            .filter(|pod| {
                pod.key.language == language && !is_own(&pod.key) && pod.key.permission.is_shared()
            })
            .filter_map(|pod| {
                let similarity = self.similarity(store, &pod.key, query)?;
                (similarity > 0.0).then(|| SelectedPod { key: pod.key.clone(), similarity: Some(similarity) })
            })
            .collect();

        ranked.sort_by(|a, b| {
            let (x, y) = (a.similarity.unwrap_or(0.0), b.similarity.unwrap_or(0.0));
            y.partial_cmp(&x).unwrap_or(Ordering::Equal).then_with(|| a.key.cmp(&b.key))
        });
        ranked.truncate(self.max_pods);

        debug!(own = selected.len(), shared = ranked.len(), language, "pods selected");
        selected.extend(ranked);
        selected
    }

    fn similarity(&self, store: &PodStore, key: &PodKey, query: &SparseVector) -> Option<f32> {
        let shard = match store.get(key) {
            Ok(shard) => shard,
            Err(e) => {
                warn!(pod = %key, error = %e, "pod skipped during selection");
                return None;
            }
        };
        let shard = shard.read();
        if shard.is_removed() {
            return None;
        }
        let similarity = query.cosine(&shard.vectors().aggregate());
        Some(if similarity.is_nan() { 0.0 } else { similarity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::core::types::{DocId, PermissionClass};
    use crate::storage::layout::StorageLayout;

    fn record(key: &PodKey) -> PodRecord {
        PodRecord { key: key.clone(), registered: Utc::now() }
    }

    fn add_pod(store: &PodStore, key: &PodKey, rows: &[&[(u32, f32)]]) {
        let shard = store.get_or_create(key, 3).unwrap();
        let mut shard = shard.write();
        for (i, pairs) in rows.iter().enumerate() {
            let vector = SparseVector::from_pairs(3, pairs.iter().copied()).unwrap();
            shard.vectors_mut().append(DocId(i as u64), vector).unwrap();
        }
    }

    #[test]
    fn test_own_pods_always_included_shared_ranked() {
        let dir = tempfile::tempdir().unwrap();
        let store = PodStore::new(StorageLayout::new(dir.path().to_path_buf()).unwrap());

        let mine = PodKey::new("ann", "laptop", "en", PermissionClass::User);
        let close = PodKey::new("bob", "desk", "en", PermissionClass::Others);
        let far = PodKey::new("cat", "desk", "en", PermissionClass::Group);
        let unrelated = PodKey::new("dan", "desk", "en", PermissionClass::Others);
        let private = PodKey::new("eve", "desk", "en", PermissionClass::User);
        let french = PodKey::new("fay", "desk", "fr", PermissionClass::Others);

        add_pod(&store, &mine, &[&[(2, 1.0)]]);
        add_pod(&store, &close, &[&[(0, 1.0)]]);
        add_pod(&store, &far, &[&[(0, 0.2), (1, 1.0)]]);
        add_pod(&store, &unrelated, &[&[(2, 1.0)]]);
        add_pod(&store, &private, &[&[(0, 1.0)]]);
        add_pod(&store, &french, &[&[(0, 1.0)]]);
        let missing = PodKey::new("gus", "desk", "en", PermissionClass::Others);

        let pods: Vec<PodRecord> =
            [&mine, &close, &far, &unrelated, &private, &french, &missing].into_iter().map(record).collect();
        let query = SparseVector::from_pairs(3, [(0, 1.0)]).unwrap();

        let selected = PodSelector::new(3).select(&store, &pods, "en", Some("ann"), &query);
        let keys: Vec<&PodKey> = selected.iter().map(|p| &p.key).collect();
        assert_eq!(keys, vec![&mine, &close, &far]);
        assert!(selected[0].is_own());
        assert!(selected[1].similarity > selected[2].similarity);
    }

    #[test]
    fn test_limit_and_anonymous_requester() {
        let dir = tempfile::tempdir().unwrap();
        let store = PodStore::new(StorageLayout::new(dir.path().to_path_buf()).unwrap());
        let keys: Vec<PodKey> = (0..5)
            .map(|i| PodKey::new(&format!("user{}", i), "desk", "en", PermissionClass::Others))
            .collect();
        for key in &keys {
            add_pod(&store, key, &[&[(0, 1.0)]]);
        }
        let pods: Vec<PodRecord> = keys.iter().map(record).collect();
        let query = SparseVector::from_pairs(3, [(0, 1.0)]).unwrap();

        let selected = PodSelector::new(3).select(&store, &pods, "en", None, &query);
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|p| !p.is_own()));
        assert_eq!(selected[0].key, keys[0]);
    }
}
