use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use crossbeam::channel::Sender;
use tracing::info;
use crate::analysis::analyzer::Analyzer;
use crate::analysis::language::LanguageModels;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::{EngineStats, HealthStatus, PodStats};
use crate::core::types::{DocId, PodKey};
use crate::registry::{DocumentRecord, DocumentRegistry, LocalRegistry};
use crate::repair::{ConsistencyChecker, ConsistencyReport, RepairReport, Repairer};
use crate::search::{PermissionFilter, SearchEngine, SearchResults};
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::shard::PodStore;
use crate::writer::{
    CorpusReader, DeleteOutcome, IncomingDocument, IndexJob, IndexOutcome, Indexer, JobEvent, JobHandle,
    JobSummary,
};

/// One store directory: pods, registry and the components working on them
pub struct PodEngine {
    config: Config,
    started: DateTime<Utc>,
    store: Arc<PodStore>,
    registry: Arc<dyn DocumentRegistry>,
    indexer: Arc<Indexer>,
    search: SearchEngine,
    checker: ConsistencyChecker,
    repairer: Repairer,
    corpus: CorpusReader,
    _lock: Option<FileLock>,
}

impl PodEngine {
    /// Open (or create) the store at `config.storage_path`, holding its
    /// process lock for the engine's lifetime.
    pub fn open(config: Config, models: Arc<LanguageModels>) -> Result<Self> {
        let layout = StorageLayout::new(config.storage_path.clone())?;
        let lock = FileLock::acquire(&layout)?;
        let registry: Arc<dyn DocumentRegistry> = Arc::new(LocalRegistry::open(&layout.registry_path())?);
        let analyzer = Analyzer::standard(models);

        let mut engine = Self::open_with(config, layout, registry, analyzer)?;
        engine._lock = Some(lock);
        Ok(engine)
    }

    /// Assemble around caller-supplied collaborators; no process lock is taken
    pub fn open_with(
        config: Config,
        layout: StorageLayout,
        registry: Arc<dyn DocumentRegistry>,
        analyzer: Analyzer,
    ) -> Result<Self> {
        let store = Arc::new(PodStore::new(layout));
        let indexer = Arc::new(Indexer::new(store.clone(), registry.clone(), analyzer.clone()));
        let search = SearchEngine::new(store.clone(), registry.clone(), analyzer, &config)?;
        let checker = ConsistencyChecker::new(store.clone(), registry.clone());
        let repairer = Repairer::new(store.clone(), registry.clone(), config.max_repair_passes);
        let corpus = CorpusReader::new(config.snippet_length)?;

        info!(
            path = %config.storage_path.display(),
            documents = registry.count()?,
            languages = ?indexer.analyzer().models.languages(),
            "pod engine opened"
        );

        Ok(PodEngine {
            config,
            started: Utc::now(),
            store,
            registry,
            indexer,
            search,
            checker,
            repairer,
            corpus,
            _lock: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<PodStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn DocumentRegistry> {
        &self.registry
    }

    pub fn indexer(&self) -> &Arc<Indexer> {
        &self.indexer
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    // Writes

    pub fn index_document(&self, doc: IncomingDocument) -> Result<IndexOutcome> {
        self.indexer.index_document(doc)
    }

    pub fn delete_document(&self, id: DocId) -> Result<DeleteOutcome> {
        self.indexer.delete_document(id)
    }

    pub fn delete_url(&self, url: &str) -> Result<DeleteOutcome> {
        self.indexer.delete_url(url)
    }

    pub fn delete_pod(&self, pod: &PodKey) -> Result<usize> {
        self.indexer.delete_pod(pod)
    }

    pub fn move_document(&self, source: &str, target: &str) -> Result<DocumentRecord> {
        self.indexer.move_document(source, target)
    }

    pub fn remove_stale(&self, url_prefix: &str, seen: &HashSet<String>) -> Result<Vec<DocId>> {
        self.indexer.remove_stale(url_prefix, seen)
    }

    // Jobs

    pub fn run_job(&self, documents: Vec<IncomingDocument>, events: &Sender<JobEvent>) -> JobSummary {
        IndexJob::new(documents).run(&self.indexer, events)
    }

    pub fn spawn_job(&self, documents: Vec<IncomingDocument>) -> JobHandle {
        IndexJob::new(documents).spawn(self.indexer.clone())
    }

    /// Read a crawler corpus file and index it into `pod` in the background
    pub fn spawn_corpus_job(&self, path: &Path, pod: &PodKey) -> Result<JobHandle> {
        let documents = self
            .corpus
            .read_file(path)?
            .into_iter()
            .map(|entry| entry.into_document(pod.clone()))
            .collect();
        Ok(self.spawn_job(documents))
    }

    // Reads

    pub fn search(&self, query: &str, filter: &PermissionFilter, requester: Option<&str>) -> Result<SearchResults> {
        self.search.search(query, filter, requester)
    }

    pub fn search_urls(&self, query: &str, filter: &PermissionFilter, requester: Option<&str>) -> Result<Vec<String>> {
        self.search.search_urls(query, filter, requester)
    }

    // Consistency

    pub fn check(&self, pod: &PodKey) -> Result<ConsistencyReport> {
        self.checker.check(pod)
    }

    pub fn check_all(&self) -> Result<Vec<ConsistencyReport>> {
        self.checker.check_all()
    }

    pub fn pods_needing_repair(&self) -> Vec<PodKey> {
        self.indexer.pods_needing_repair()
    }

    pub fn repair(&self, pod: &PodKey) -> Result<RepairReport> {
        let report = self.repairer.repair(pod)?;
        self.indexer.clear_repair_flag(pod);
        Ok(report)
    }

    pub fn repair_all(&self) -> Result<Vec<RepairReport>> {
        let pods = self.checker.known_pods()?;
        let reports = self.repairer.repair_all(&pods)?;
        for report in &reports {
            self.indexer.clear_repair_flag(&report.pod);
        }
        Ok(reports)
    }

    // Stats

    pub fn pod_stats(&self, pod: &PodKey) -> Result<PodStats> {
        let records = self.registry.by_pod(pod)?.len();
        let shard = self.store.get(pod)?;
        let shard = shard.read();
        Ok(PodStats {
            pod: pod.clone(),
            rows: shard.vectors().len(),
            records,
            postings: shard.index().doc_count(),
            indexed_terms: shard.index().slots().iter().filter(|slot| !slot.is_empty()).count(),
        })
    }

    /// Pods without files on disk are left out
    pub fn stats(&self) -> Result<EngineStats> {
        let mut pods = Vec::new();
        for pod in self.checker.known_pods()? {
            match self.pod_stats(&pod) {
                Ok(stats) => pods.push(stats),
                Err(e) if e.is_pod_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        let flagged = self.indexer.pods_needing_repair();

        Ok(EngineStats {
            started: self.started,
            uptime_secs: (Utc::now() - self.started).num_seconds().max(0) as u64,
            documents: self.registry.count()?,
            languages: self.indexer.analyzer().models.languages().into_iter().map(String::from).collect(),
            health: HealthStatus::from_flagged(&flagged),
            pods_needing_repair: flagged,
            pods,
        })
    }
}
