use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use crate::analysis::analyzer::{AnalyzedText, Analyzer};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, PodKey};
use crate::index::RemovedPostings;
use crate::registry::record::url_filename;
use crate::registry::{DocumentRecord, DocumentRegistry, RecordFilter};
use crate::storage::shard::{PodShard, PodStore, ShardSet, ShardWriteGuards, SharedShard};

/// A record can change pod between our lookup and taking the lock; give up after this many tries
const MAX_LOCK_RETRIES: usize = 8;

/// A crawled document, ready to be indexed into `pod`
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingDocument {
    pub url: String,
    pub pod: PodKey,
    pub title: String,
    pub snippet: String,
    pub description: String,
    pub body: String,
}

impl IncomingDocument {
    pub fn new(url: impl Into<String>, pod: PodKey) -> Self {
        IncomingDocument {
            url: url.into(),
            pod,
            title: String::new(),
            snippet: String::new(),
            description: String::new(),
            body: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.pod.language
    }

    /// File name, title, description and body: everything that is vectorised and tokenised
    pub fn indexed_text(&self) -> String {
        [url_filename(&self.url), self.title.as_str(), self.description.as_str(), self.body.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexOutcome {
    pub id: DocId,
    pub pod: PodKey,
    pub row: usize,
    /// Id of the previous version of the url, removed before the insert
    pub replaced: Option<DocId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub record: DocumentRecord,
    /// Records of the same pod whose row moved down by one
    pub resequenced: usize,
    pub postings: RemovedPostings,
}

/// Keeps vector rows, positional postings and registry records of every pod in step.
///
/// Insert:
/// 1. analyse (the only step that may fail without consequences)
/// 2. delete the previous version of the url, if any
/// 3. append the row, tagged with a freshly reserved id
/// 4. write the record with `row` = the new position
/// 5. add postings under the id
///
/// Delete:
/// 1. check the record's row really holds the record's id
/// 2. remove the row
/// 3. shift every later record of the pod down by one
/// 4. drop the postings
/// 5. drop the record
///
/// Every step runs under the write lock of the pods involved.
pub struct Indexer {
    store: Arc<PodStore>,
    registry: Arc<dyn DocumentRegistry>,
    analyzer: Analyzer,
    needs_repair: Mutex<BTreeSet<PodKey>>,
}

impl Indexer {
    pub fn new(store: Arc<PodStore>, registry: Arc<dyn DocumentRegistry>, analyzer: Analyzer) -> Self {
        Indexer {
            store,
            registry,
            analyzer,
            needs_repair: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<PodStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn DocumentRegistry> {
        &self.registry
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Insert a document, replacing the live version at the same url.
    /// The new version always gets a new id.
    pub fn index_document(&self, doc: IncomingDocument) -> Result<IndexOutcome> {
        let analyzed = self.analyzer.analyze(doc.language(), &doc.indexed_text())?;
        if !analyzed.has_vocabulary_tokens() {
            return Err(Error::vectorization(format!(
                "'{}' has no token in the '{}' vocabulary",
                doc.url,
                doc.language()
            )));
        }

        let result = self.index_analyzed(&doc, &analyzed);
        if let Err(e) = &result {
            if e.is_inconsistent() {
                self.flag_for_repair(&doc.pod, e);
                if let Ok(Some(old)) = self.registry.get_by_url(&doc.url) {
                    self.flag_for_repair(&old.pod, e);
                }
            }
        }
        result
    }

    fn index_analyzed(&self, doc: &IncomingDocument, analyzed: &AnalyzedText) -> Result<IndexOutcome> {
        for _ in 0..MAX_LOCK_RETRIES {
            let target = self.store.get_or_create(&doc.pod, analyzed.model.width())?;
            let mut shards = vec![(doc.pod.clone(), target)];
            if let Some(old) = self.registry.get_by_url(&doc.url)? {
                if old.pod != doc.pod {
                    shards.push((old.pod.clone(), self.shard_of(&old)?));
                }
            }

            let set = ShardSet::new(shards);
            let mut guards = set.write();

            // Re-read under the lock: the old version may have moved or gone
            let current = self.registry.get_by_url(&doc.url)?;
            let moved = current.as_ref().is_some_and(|r| !set.contains(&r.pod));
            if moved || guards.any_removed() {
                debug!(url = %doc.url, "pods changed while locking, retrying");
                continue;
            }

            let fresh = current.is_none();
            match self.insert_locked(&mut guards, doc, analyzed, current) {
                // Another writer registered the url in a pod we did not lock.
                // Our row is already rolled back; retry as a re-index of theirs.
                Err(e) if fresh
                    && e.kind == ErrorKind::InvalidArgument
                    && matches!(self.registry.get_by_url(&doc.url), Ok(Some(_))) =>
                {
                    debug!(url = %doc.url, error = %e, "url claimed by a concurrent insert, retrying");
                    continue;
                }
                outcome => return outcome,
            }
        }

        Err(retries_exhausted(&doc.url))
    }

    fn insert_locked(
        &self,
        guards: &mut ShardWriteGuards<'_>,
        doc: &IncomingDocument,
        analyzed: &AnalyzedText,
        current: Option<DocumentRecord>,
    ) -> Result<IndexOutcome> {
        let mut created = Utc::now();
        let replaced = match current {
            Some(old) => {
                debug!(url = %doc.url, old_id = %old.id, old_pod = %old.pod, "removing previous version");
                created = old.created;
                self.delete_locked(guards.get_mut(&old.pod)?, &old)?;
                Some(old.id)
            }
            None => None,
        };

        let shard = guards.get_mut(&doc.pod)?;
        self.registry.register_pod(&doc.pod)?;

        let id = self.registry.next_id()?;
        let row = shard.vectors_mut().append(id, analyzed.vector.clone())?;
        debug!(pod = %doc.pod, %id, row, "appended row");

        let record = DocumentRecord {
            id,
            url: doc.url.clone(),
            title: doc.title.clone(),
            snippet: doc.snippet.clone(),
            description: doc.description.clone(),
            pod: doc.pod.clone(),
            row,
            created,
            modified: Utc::now(),
        };
        if let Err(e) = self.registry.put(record) {
            // The new row is the pod's last one, so dropping it shifts nothing
            return match shard.vectors_mut().remove(row) {
                Ok(_) => {
                    debug!(pod = %doc.pod, %id, row, "rolled back row after failed record write");
                    Err(e)
                }
                Err(undo) => Err(Error::inconsistent(format!(
                    "Row {} of pod {} left without a record ({}; rollback failed: {})",
                    row, doc.pod, e, undo
                ))),
            };
        }
        debug!(pod = %doc.pod, %id, row, "wrote record");

        let positions = shard.index_mut().add(id, &analyzed.tokens, &analyzed.model.vocabulary)?;
        shard.persist_index()?;
        debug!(pod = %doc.pod, %id, positions, "added postings");

        if let Some(old_id) = replaced {
            info!(url = %doc.url, %old_id, new_id = %id, pod = %doc.pod, row, "re-indexed document");
        }

        Ok(IndexOutcome {
            id,
            pod: doc.pod.clone(),
            row,
            replaced,
        })
    }

    /// Remove one document from all three stores. The shard must be the record's pod, write-locked.
    fn delete_locked(&self, shard: &mut PodShard, record: &DocumentRecord) -> Result<DeleteOutcome> {
        match shard.vectors().row(record.row) {
            Some(row) if row.doc_id == record.id => {}
            Some(row) => {
                return Err(Error::inconsistent(format!(
                    "Row {} of pod {} belongs to {}, not {}",
                    record.row, record.pod, row.doc_id, record.id
                )));
            }
            None => {
                return Err(Error::inconsistent(format!(
                    "Row {} of {} out of range for pod {} ({} rows)",
                    record.row,
                    record.id,
                    record.pod,
                    shard.vectors().len()
                )));
            }
        }

        shard.vectors_mut().remove(record.row)?;
        let resequenced = resequence_after_removal(self.registry.as_ref(), &record.pod, record.row)?;
        let postings = shard.index_mut().remove(record.id);
        shard.persist_index()?;
        self.registry.delete(record.id)?;

        info!(
            url = %record.url,
            id = %record.id,
            pod = %record.pod,
            row = record.row,
            resequenced,
            positions = postings.position_count(),
            "deleted document"
        );
        Ok(DeleteOutcome {
            record: record.clone(),
            resequenced,
            postings,
        })
    }

    pub fn delete_document(&self, id: DocId) -> Result<DeleteOutcome> {
        self.with_record_locked(
            || self.registry.get(id),
            || Error::document_not_found(id),
            |shard, record| self.delete_locked(shard, &record),
        )
    }

    pub fn delete_url(&self, url: &str) -> Result<DeleteOutcome> {
        self.with_record_locked(
            || self.registry.get_by_url(url),
            || Error::url_not_found(url),
            |shard, record| self.delete_locked(shard, &record),
        )
    }

    /// Drop a whole pod: its records, both files and its registry entry.
    /// Returns how many documents went with it.
    pub fn delete_pod(&self, pod: &PodKey) -> Result<usize> {
        let removed = match self.store.get(pod) {
            Ok(shard) => {
                let mut shard = shard.write();
                let removed = self.delete_records(pod)?;
                if !shard.is_removed() {
                    self.store.remove_files(&mut shard)?;
                }
                removed
            }
            Err(e) if e.is_pod_not_found() => self.delete_records(pod)?,
            Err(e) => return Err(e),
        };

        self.registry.remove_pod(pod)?;
        self.needs_repair.lock().remove(pod);
        info!(%pod, documents = removed, "deleted pod");
        Ok(removed)
    }

    fn delete_records(&self, pod: &PodKey) -> Result<usize> {
        let records = self.registry.by_pod(pod)?;
        for record in &records {
            self.registry.delete(record.id)?;
        }
        Ok(records.len())
    }

    /// Rename a document's url. A target ending in `/` keeps the file name.
    /// A title that was just the old file name follows the rename.
    pub fn move_document(&self, source: &str, target: &str) -> Result<DocumentRecord> {
        let target = if target.ends_with('/') {
            format!("{}{}", target, url_filename(source))
        } else {
            target.to_string()
        };

        self.with_record_locked(
            || self.registry.get_by_url(source),
            || Error::url_not_found(source),
            |_shard, record| {
                if let Some(holder) = self.registry.get_by_url(&target)? {
                    if holder.id != record.id {
                        return Err(Error::new(
                            ErrorKind::InvalidArgument,
                            format!("Cannot move '{}': '{}' is already indexed", record.url, target),
                        ));
                    }
                }

                let mut moved = record.clone();
                if moved.title == record.filename() {
                    moved.title = url_filename(&target).to_string();
                }
                moved.url = target.clone();
                moved.modified = Utc::now();
                self.registry.put(moved.clone())?;

                info!(from = %record.url, to = %moved.url, id = %moved.id, "moved document");
                Ok(moved)
            },
        )
    }

    /// Delete every document under `url_prefix` whose url the latest crawl did not see
    pub fn remove_stale(&self, url_prefix: &str, seen: &HashSet<String>) -> Result<Vec<DocId>> {
        let stale: Vec<DocumentRecord> = self
            .registry
            .scan(&RecordFilter::url_prefix(url_prefix))?
            .into_iter()
            .filter(|r| !seen.contains(&r.url))
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for record in stale {
            match self.delete_document(record.id) {
                Ok(_) => removed.push(record.id),
                // Deleted or re-indexed by someone else in the meantime
                Err(e) if e.kind == ErrorKind::DocumentNotFound => {}
                Err(e) => return Err(e),
            }
        }

        if !removed.is_empty() {
            info!(prefix = url_prefix, removed = removed.len(), "removed stale documents");
        }
        Ok(removed)
    }

    /// Look the record up, lock its pod, look it up again and run `f` if it did not move meanwhile
    fn with_record_locked<T>(
        &self,
        lookup: impl Fn() -> Result<Option<DocumentRecord>>,
        missing: impl Fn() -> Error,
        f: impl FnOnce(&mut PodShard, DocumentRecord) -> Result<T>,
    ) -> Result<T> {
        for _ in 0..MAX_LOCK_RETRIES {
            let record = lookup()?.ok_or_else(&missing)?;
            let shard = match self.shard_of(&record) {
                Ok(shard) => shard,
                Err(e) => {
                    if e.is_inconsistent() {
                        self.flag_for_repair(&record.pod, &e);
                    }
                    return Err(e);
                }
            };

            let set = ShardSet::single(record.pod.clone(), shard);
            let mut guards = set.write();
            let current = lookup()?.ok_or_else(&missing)?;
            if current.pod != record.pod || guards.any_removed() {
                continue;
            }

            let pod = current.pod.clone();
            let result = f(guards.get_mut(&pod)?, current);
            if let Err(e) = &result {
                if e.is_inconsistent() {
                    self.flag_for_repair(&pod, e);
                }
            }
            return result;
        }

        Err(Error::new(
            ErrorKind::InconsistentState,
            "Record kept changing pod while waiting for its lock".to_string(),
        ))
    }

    /// Store handle for the record's pod. A record pointing at a pod without
    /// files is an inconsistency, not a missing pod.
    fn shard_of(&self, record: &DocumentRecord) -> Result<SharedShard> {
        self.store.get(&record.pod).map_err(|e| {
            if e.is_pod_not_found() {
                Error::inconsistent(format!("{} points at pod {} which has no store", record.id, record.pod))
            } else {
                e
            }
        })
    }

    fn flag_for_repair(&self, pod: &PodKey, cause: &Error) {
        warn!(%pod, error = %cause, "pod flagged for repair");
        self.needs_repair.lock().insert(pod.clone());
    }

    pub fn needs_repair(&self, pod: &PodKey) -> bool {
        self.needs_repair.lock().contains(pod)
    }

    pub fn pods_needing_repair(&self) -> Vec<PodKey> {
        self.needs_repair.lock().iter().cloned().collect()
    }

    pub fn clear_repair_flag(&self, pod: &PodKey) {
        self.needs_repair.lock().remove(pod);
    }
}

/// After removing row `removed_row` of `pod`, move every record above it down by one.
/// Returns how many records moved.
pub fn resequence_after_removal(
    registry: &dyn DocumentRegistry,
    pod: &PodKey,
    removed_row: usize,
) -> Result<usize> {
    let shifted: Vec<DocumentRecord> = registry
        .by_pod(pod)?
        .into_iter()
        .filter(|r| r.row > removed_row)
        .map(|mut r| {
            r.row -= 1;
            r
        })
        .collect();

    let count = shifted.len();
    registry.put_many(shifted)?;
    Ok(count)
}

fn retries_exhausted(url: &str) -> Error {
    Error::new(
        ErrorKind::InconsistentState,
        format!("'{}' kept changing pod while waiting for its lock", url),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::language::{LanguageModel, LanguageModels};
    use crate::analysis::vocabulary::Vocabulary;
    use crate::core::types::PermissionClass;
    use crate::registry::{LocalRegistry, PodRecord};
    use crate::storage::layout::StorageLayout;
    use crate::vector::SparseVector;

    const WORDS: &[&str] = &["alpha", "beta", "gamma", "delta", "report", "notes"];

    fn indexer(dir: &std::path::Path) -> Indexer {
        let vocab = Vocabulary::from_terms(WORDS).unwrap();
        let models = Arc::new(LanguageModels::new().with_model(LanguageModel::new("en", vocab)));
        let store = Arc::new(PodStore::new(StorageLayout::new(dir.to_path_buf()).unwrap()));
        Indexer::new(store, Arc::new(LocalRegistry::in_memory()), Analyzer::standard(models))
    }

    fn pod() -> PodKey {
        PodKey::new("ann", "laptop", "en", PermissionClass::User)
    }

    fn doc(url: &str, body: &str) -> IncomingDocument {
        IncomingDocument::new(url, pod()).with_body(body)
    }

    fn rows(indexer: &Indexer, pod: &PodKey) -> usize {
        indexer.store().get(pod).unwrap().read().vectors().len()
    }

    #[test]
    fn test_indexed_text_includes_file_name() {
        let d = IncomingDocument::new("/docs/report", pod()).with_title("Q3").with_body("alpha");
        assert_eq!(d.indexed_text(), "report Q3 alpha");
    }

    #[test]
    fn test_insert_then_delete_resequences() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());

        let d1 = indexer.index_document(doc("/a", "alpha beta")).unwrap();
        let d2 = indexer.index_document(doc("/b", "gamma")).unwrap();
        assert_eq!((d1.row, d2.row), (0, 1));

        let deleted = indexer.delete_document(d1.id).unwrap();
        assert_eq!(deleted.resequenced, 1);
        assert_eq!(rows(&indexer, &pod()), 1);
        assert_eq!(indexer.registry().get(d2.id).unwrap().unwrap().row, 0);

        let shard = indexer.store().get(&pod()).unwrap();
        assert!(!shard.read().index().contains(d1.id));
        assert_eq!(shard.read().vectors().row(0).unwrap().doc_id, d2.id);
    }

    #[test]
    fn test_reindex_replaces_with_new_id() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());

        let first = indexer.index_document(doc("/a", "alpha")).unwrap();
        let second = indexer.index_document(doc("/a", "beta delta")).unwrap();

        assert_eq!(second.replaced, Some(first.id));
        assert_ne!(second.id, first.id);
        assert_eq!(second.row, 0);
        assert_eq!(rows(&indexer, &pod()), 1);
        assert!(indexer.registry().get(first.id).unwrap().is_none());
    }

    #[test]
    fn test_reindex_into_another_pod() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());
        let shared = PodKey::new("ann", "laptop", "en", PermissionClass::Group);

        indexer.index_document(doc("/a", "alpha")).unwrap();
        let moved = indexer
            .index_document(IncomingDocument::new("/a", shared.clone()).with_body("alpha"))
            .unwrap();

        assert_eq!(moved.pod, shared);
        assert_eq!(rows(&indexer, &pod()), 0);
        assert_eq!(rows(&indexer, &shared), 1);
    }

    /// Registers `rival` just before the first other write of the same url,
    /// as a writer on another pod would
    struct RacingRegistry {
        inner: LocalRegistry,
        rival: Mutex<Option<DocumentRecord>>,
    }

    impl DocumentRegistry for RacingRegistry {
        fn next_id(&self) -> Result<DocId> {
            self.inner.next_id()
        }
        fn get(&self, id: DocId) -> Result<Option<DocumentRecord>> {
            self.inner.get(id)
        }
        fn get_by_url(&self, url: &str) -> Result<Option<DocumentRecord>> {
            self.inner.get_by_url(url)
        }
        fn by_pod(&self, pod: &PodKey) -> Result<Vec<DocumentRecord>> {
            self.inner.by_pod(pod)
        }
        fn scan(&self, filter: &RecordFilter) -> Result<Vec<DocumentRecord>> {
            self.inner.scan(filter)
        }
        fn count(&self) -> Result<usize> {
            self.inner.count()
        }
        fn put(&self, record: DocumentRecord) -> Result<()> {
            let rival = self.rival.lock().take_if(|r| r.url == record.url);
            if let Some(rival) = rival {
                self.inner.put(rival)?;
            }
            self.inner.put(record)
        }
        fn put_many(&self, records: Vec<DocumentRecord>) -> Result<()> {
            self.inner.put_many(records)
        }
        fn delete(&self, id: DocId) -> Result<Option<DocumentRecord>> {
            self.inner.delete(id)
        }
        fn register_pod(&self, pod: &PodKey) -> Result<()> {
            self.inner.register_pod(pod)
        }
        fn pod(&self, pod: &PodKey) -> Result<Option<PodRecord>> {
            self.inner.pod(pod)
        }
        fn pods(&self) -> Result<Vec<PodRecord>> {
            self.inner.pods()
        }
        fn remove_pod(&self, pod: &PodKey) -> Result<bool> {
            self.inner.remove_pod(pod)
        }
    }

    #[test]
    fn test_url_claimed_by_another_pod_mid_insert() {
        let dir = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_terms(WORDS).unwrap();
        let width = vocab.len();
        let models = Arc::new(LanguageModels::new().with_model(LanguageModel::new("en", vocab)));
        let store = Arc::new(PodStore::new(StorageLayout::new(dir.path().to_path_buf()).unwrap()));
        let shared = PodKey::new("ann", "laptop", "en", PermissionClass::Group);

        // The rival's row is already in the shared pod; its record lands mid-insert
        let rival_id = DocId(100);
        let vector = SparseVector::from_pairs(width, [(0, 1.0)]).unwrap();
        store.get_or_create(&shared, width).unwrap().write().vectors_mut().append(rival_id, vector).unwrap();
        let registry = RacingRegistry {
            inner: LocalRegistry::in_memory(),
            rival: Mutex::new(Some(DocumentRecord {
                id: rival_id,
                url: "/a".to_string(),
                title: String::new(),
                snippet: String::new(),
                description: String::new(),
                pod: shared.clone(),
                row: 0,
                created: Utc::now(),
                modified: Utc::now(),
            })),
        };
        let indexer = Indexer::new(store, Arc::new(registry), Analyzer::standard(models));

        let outcome = indexer.index_document(doc("/a", "alpha beta")).unwrap();
        assert_eq!(outcome.replaced, Some(rival_id));
        assert_eq!(outcome.row, 0);
        assert_eq!(rows(&indexer, &pod()), 1);
        assert_eq!(rows(&indexer, &shared), 0);
        assert_eq!(indexer.registry().get_by_url("/a").unwrap().unwrap().id, outcome.id);
        assert_eq!(indexer.registry().count().unwrap(), 1);
        assert!(indexer.pods_needing_repair().is_empty());
    }

    #[test]
    fn test_vectorization_failure_leaves_no_trace() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());

        let err = indexer.index_document(doc("/zzz", "nothing known here")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VectorizationFailed);
        assert!(!indexer.store().exists(&pod()));
        assert_eq!(indexer.registry().count().unwrap(), 0);

        let other = PodKey::new("ann", "laptop", "xx", PermissionClass::User);
        let err = indexer.index_document(IncomingDocument::new("/b", other).with_body("alpha")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::VectorizationFailed);
    }

    #[test]
    fn test_broken_row_link_is_flagged_not_fixed() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());
        let d1 = indexer.index_document(doc("/a", "alpha")).unwrap();

        let mut record = indexer.registry().get(d1.id).unwrap().unwrap();
        record.row = 7;
        indexer.registry().put(record).unwrap();

        let err = indexer.delete_document(d1.id).unwrap_err();
        assert!(err.is_inconsistent());
        assert!(indexer.needs_repair(&pod()));
        assert_eq!(rows(&indexer, &pod()), 1);

        indexer.clear_repair_flag(&pod());
        assert!(indexer.pods_needing_repair().is_empty());
    }

    #[test]
    fn test_delete_unknown_document() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());
        assert_eq!(indexer.delete_document(DocId(42)).unwrap_err().kind, ErrorKind::DocumentNotFound);
        assert_eq!(indexer.delete_url("/nope").unwrap_err().kind, ErrorKind::DocumentNotFound);
    }

    #[test]
    fn test_move_document() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());
        indexer
            .index_document(IncomingDocument::new("/docs/notes", pod()).with_title("notes").with_body("alpha"))
            .unwrap();
        indexer.index_document(doc("/other", "beta")).unwrap();

        let moved = indexer.move_document("/docs/notes", "/archive/").unwrap();
        assert_eq!(moved.url, "/archive/notes");
        assert_eq!(moved.title, "notes");

        let renamed = indexer.move_document("/archive/notes", "/archive/report").unwrap();
        assert_eq!(renamed.title, "report");
        assert!(indexer.registry().get_by_url("/archive/notes").unwrap().is_none());

        let err = indexer.move_document("/archive/report", "/other").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_remove_stale() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());
        indexer.index_document(doc("/share/a", "alpha")).unwrap();
        let b = indexer.index_document(doc("/share/b", "beta")).unwrap();
        indexer.index_document(doc("/home/c", "gamma")).unwrap();

        let seen: HashSet<String> = ["/share/a".to_string()].into_iter().collect();
        let removed = indexer.remove_stale("/share/", &seen).unwrap();
        assert_eq!(removed, vec![b.id]);
        assert_eq!(indexer.registry().count().unwrap(), 2);
    }

    #[test]
    fn test_delete_pod() {
        let dir = tempfile::tempdir().unwrap();
        let indexer = indexer(dir.path());
        indexer.index_document(doc("/a", "alpha")).unwrap();
        indexer.index_document(doc("/b", "beta")).unwrap();

        assert_eq!(indexer.delete_pod(&pod()).unwrap(), 2);
        assert!(!indexer.store().exists(&pod()));
        assert!(indexer.registry().pods().unwrap().is_empty());

        // The pod comes back on the next write
        let again = indexer.index_document(doc("/a", "alpha")).unwrap();
        assert_eq!(again.row, 0);
    }
}
