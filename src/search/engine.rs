use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::PodKey;
use crate::registry::{DocumentRecord, DocumentRegistry};
use crate::search::filter::PermissionFilter;
use crate::search::pod_selector::PodSelector;
use crate::search::query::QueryParser;
use crate::search::results::{SearchHit, SearchResults, TopKCollector};
use crate::search::scorer::{Candidate, CombinedScorer, QueryTerms, Scorer};
use crate::storage::shard::PodStore;

/// Read-only query pipeline: parse, pick pods, score each pod on the worker
/// pool, merge the best hits, filter by permission.
pub struct SearchEngine {
    store: Arc<PodStore>,
    registry: Arc<dyn DocumentRegistry>,
    analyzer: Analyzer,
    parser: QueryParser,
    selector: PodSelector,
    scorer: Arc<dyn Scorer>,
    max_results: usize,
    pool: rayon::ThreadPool,
}

impl SearchEngine {
    pub fn new(
        store: Arc<PodStore>,
        registry: Arc<dyn DocumentRegistry>,
        analyzer: Analyzer,
        config: &Config,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.query_workers.max(1))
            .thread_name(|i| format!("pod-scorer-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::InvalidArgument, format!("query pool: {}", e)))?;

        Ok(SearchEngine {
            store,
            registry,
            analyzer,
            parser: QueryParser::new(&config.default_language)?,
            selector: PodSelector::new(config.max_pods),
            scorer: Arc::new(CombinedScorer::new(config.min_completeness)),
            max_results: config.max_results,
            pool,
        })
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    pub fn search(
        &self,
        query: &str,
        filter: &PermissionFilter,
        requester: Option<&str>,
    ) -> Result<SearchResults> {
        let start = Instant::now();
        let parsed = self.parser.parse(query);
        let mut results = SearchResults {
            language: parsed.language.clone(),
            ..SearchResults::default()
        };

        if parsed.text.is_empty() {
            return Ok(results);
        }
        if !self.analyzer.models.contains(&parsed.language) {
            warn!(language = %parsed.language, "no model for query language");
            return Ok(results);
        }

        let analyzed = self.analyzer.analyze(&parsed.language, &parsed.text)?;
        if analyzed.vector.is_zero() {
            debug!(query = %parsed.text, "query has no vocabulary terms");
            results.took_ms = start.elapsed().as_millis() as u64;
            return Ok(results);
        }
        let terms = QueryTerms::new(analyzed.model, analyzed.vector, analyzed.tokens);

        let pods = self.registry.pods()?;
        let selected = self.selector.select(&self.store, &pods, &parsed.language, requester, &terms.vector);

        let per_pod: Vec<(PodKey, Result<Vec<SearchHit>>)> = self.pool.install(|| {
            selected
                .par_iter()
                .map(|pod| (pod.key.clone(), self.score_pod(&pod.key, &terms)))
                .collect()
        });

        let mut collector = TopKCollector::new(self.max_results);
        for (pod, scored) in per_pod {
            match scored {
                Ok(hits) => {
                    results.pods_searched.push(pod);
                    hits.into_iter().for_each(|hit| collector.collect(hit));
                }
                Err(e) if e.is_pod_not_found() => {
                    warn!(pod = %pod, "pod vanished during search, skipped");
                }
                Err(e) => return Err(e),
            }
        }

        results.total_hits = collector.total_collected();
        results.max_score = collector.max_score();
        results.hits = collector
            .into_sorted()
            .into_iter()
            .filter(|hit| filter.allows(&hit.url))
            .collect();
        results.took_ms = start.elapsed().as_millis() as u64;

        info!(
            query = %parsed.text,
            language = %parsed.language,
            pods = results.pods_searched.len(),
            hits = results.hits.len(),
            took_ms = results.took_ms,
            "search"
        );
        Ok(results)
    }

    /// Ranked urls only
    pub fn search_urls(
        &self,
        query: &str,
        filter: &PermissionFilter,
        requester: Option<&str>,
    ) -> Result<Vec<String>> {
        Ok(self.search(query, filter, requester)?.urls())
    }

    /// Score every live document of one pod under its read lock
    fn score_pod(&self, pod: &PodKey, query: &QueryTerms) -> Result<Vec<SearchHit>> {
        let shard = self.store.get(pod)?;
        let shard = shard.read();
        if shard.is_removed() {
            return Err(Error::pod_not_found(pod));
        }
        if shard.width() != query.vector.width() {
            warn!(pod = %pod, width = shard.width(), query_width = query.vector.width(), "pod width differs from model");
            return Ok(Vec::new());
        }

        let records = self.registry.by_pod(pod)?;
        let by_row: HashMap<usize, &DocumentRecord> = records.iter().map(|r| (r.row, r)).collect();
        let positional = shard.index().score(&query.tokens, &query.model.vocabulary);

        let mut hits = Vec::new();
        let mut mismatched = 0usize;
        for (row, stored) in shard.vectors().rows().iter().enumerate() {
            let Some(record) = by_row.get(&row) else {
                continue;
            };
            if record.id != stored.doc_id {
                mismatched += 1;
                continue;
            }

            let snippet_tokens = self
                .analyzer
                .tokenizer
                .tokenize(&pod.language, &record.snippet)
                .unwrap_or_default();
            let breakdown = self.scorer.score(
                query,
                &Candidate {
                    vector: &stored.vector,
                    positional: positional.get(&record.id).copied().unwrap_or(0.0),
                    snippet_tokens: &snippet_tokens,
                },
            );
            if breakdown.total > 0.0 {
                hits.push(SearchHit {
                    id: record.id,
                    url: record.url.clone(),
                    title: record.title.clone(),
                    snippet: record.snippet.clone(),
                    pod: pod.clone(),
                    score: breakdown.total,
                    breakdown,
                });
            }
        }

        if mismatched > 0 || by_row.len() != records.len() {
            warn!(pod = %pod, mismatched, "pod rows and records disagree, check consistency");
        }
        debug!(pod = %pod, rows = shard.vectors().len(), hits = hits.len(), "pod scored");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::language::{LanguageModel, LanguageModels};
    use crate::analysis::vocabulary::Vocabulary;
    use crate::core::types::PermissionClass;
    use crate::registry::LocalRegistry;
    use crate::storage::layout::StorageLayout;
    use crate::writer::indexer::{IncomingDocument, Indexer};

    struct Fixture {
        _dir: tempfile::TempDir,
        indexer: Indexer,
        engine: SearchEngine,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let vocab = Vocabulary::from_terms(&["pod", "search", "engine", "garden", "tomato"]).unwrap();
        let models = Arc::new(LanguageModels::new().with_model(LanguageModel::new("en", vocab)));
        let store = Arc::new(PodStore::new(StorageLayout::new(dir.path().to_path_buf()).unwrap()));
        let registry: Arc<dyn DocumentRegistry> = Arc::new(LocalRegistry::in_memory());
        let analyzer = Analyzer::standard(models);
        let config = Config { query_workers: 2, ..Config::with_storage_path(dir.path()) };

        Fixture {
            indexer: Indexer::new(store.clone(), registry.clone(), analyzer.clone()),
            engine: SearchEngine::new(store, registry, analyzer, &config).unwrap(),
            _dir: dir,
        }
    }

    fn index(f: &Fixture, url: &str, pod: &PodKey, body: &str) {
        let doc = IncomingDocument::new(url, pod.clone()).with_body(body).with_snippet(body);
        f.indexer.index_document(doc).unwrap();
    }

    #[test]
    fn test_best_match_first() {
        let f = fixture();
        let pod = PodKey::new("ann", "laptop", "en", PermissionClass::User);
        index(&f, "/ann/a", &pod, "pod search engine");
        index(&f, "/ann/b", &pod, "search tomato garden pod");
        index(&f, "/ann/c", &pod, "tomato garden");

        let results = f.engine.search("pod search", &PermissionFilter::allow_all(), Some("ann")).unwrap();
        assert_eq!(results.urls()[0], "/ann/a");
        assert!(!results.urls().contains(&"/ann/c".to_string()));
        assert_eq!(results.pods_searched, vec![pod]);
        assert_eq!(results.language, "en");
    }

    #[test]
    fn test_no_matching_terms_is_empty() {
        let f = fixture();
        let pod = PodKey::new("ann", "laptop", "en", PermissionClass::User);
        index(&f, "/ann/a", &pod, "pod search engine");

        let filter = PermissionFilter::allow_all();
        assert!(f.engine.search_urls("unknown words", &filter, Some("ann")).unwrap().is_empty());
        assert!(f.engine.search_urls("   ", &filter, Some("ann")).unwrap().is_empty());
        assert!(f.engine.search_urls("pod -fr", &filter, Some("ann")).unwrap().is_empty());
    }

    #[test]
    fn test_private_pods_of_others_hidden() {
        let f = fixture();
        let private = PodKey::new("bob", "desk", "en", PermissionClass::User);
        let shared = PodKey::new("bob", "desk", "en", PermissionClass::Others);
        index(&f, "/bob/private", &private, "garden tomato");
        index(&f, "/bob/shared", &shared, "garden tomato");

        let urls = f.engine.search_urls("garden tomato", &PermissionFilter::allow_all(), Some("ann")).unwrap();
        assert_eq!(urls, vec!["/bob/shared"]);
        let urls = f.engine.search_urls("garden tomato", &PermissionFilter::allow_all(), Some("bob")).unwrap();
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn test_permission_filter_applied_last() {
        let f = fixture();
        let pod = PodKey::new("ann", "laptop", "en", PermissionClass::User);
        index(&f, "/ann/public/a", &pod, "garden");
        index(&f, "/ann/private/b", &pod, "garden");

        let filter = PermissionFilter::new(["/ann/public/"]);
        let results = f.engine.search("garden", &filter, Some("ann")).unwrap();
        assert_eq!(results.urls(), vec!["/ann/public/a"]);
        assert_eq!(results.total_hits, 2);
        assert!(f.engine.search_urls("garden", &PermissionFilter::default(), Some("ann")).unwrap().is_empty());
    }
}
