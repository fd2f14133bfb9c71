pub mod core;
pub mod compression;
pub mod vector;
pub mod analysis;
pub mod storage;
pub mod index;
pub mod registry;
pub mod writer;
pub mod repair;
pub mod search;

pub use crate::core::PodEngine;
pub use crate::core::config::Config;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, PermissionClass, PodKey};

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                              PODSEARCH STRUCT ARCHITECTURE                                  │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ──────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct PodEngine                                      │    │
│  │  ┌──────────────────────────────────────────────────────────────────────────────┐ │    │
│  │  │ config: Config                      // Paths, K pods, cut-off, thresholds    │ │    │
│  │  │ store: Arc<PodStore>                // Lazily opened pods                    │ │    │
│  │  │ registry: Arc<dyn DocumentRegistry> // Records + pods                        │ │    │
│  │  │ indexer: Arc<Indexer>               // Indexing protocol, repair flags      │ │    │
│  │  │ search: SearchEngine                // Query pipeline + rayon pool          │ │    │
│  │  │ checker: ConsistencyChecker         // Read-only checks                     │ │    │
│  │  │ repairer: Repairer                  // Idempotent repair                    │ │    │
│  │  │ corpus: CorpusReader                // Crawler corpus files                 │ │    │
│  │  │ _lock: Option<FileLock>             // One process per store directory     │ │    │
│  │  └──────────────────────────────────────────────────────────────────────────────┘ │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────┐  ┌──────────────────────┐  ┌───────────────────────────────────┐    │
│  │ struct PodKey    │  │ struct DocId         │  │ struct EngineStats                │    │
│  │ • owner          │  │ • 0: u64 (stable)    │  │ • pods: Vec<PodStats>             │    │
│  │ • device         │  └──────────────────────┘  │ • documents                       │    │
│  │ • language       │  ┌──────────────────────┐  │ • pods_needing_repair             │    │
│  │ • permission     │  │ enum PermissionClass │  │ • health: HealthStatus            │    │
│  └──────────────────┘  │ • User/Group/Others  │  └───────────────────────────────────┘    │
│                        └──────────────────────┘                                            │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── STORAGE LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │ struct PodStore                                                                     │    │
│  │ • shards: RwLock<HashMap<PodKey, Arc<RwLock<PodShard>>>>   // unit of exclusion    │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌──────────────────────────┐  ┌───────────────────────────┐  ┌────────────────────────┐  │
│  │ struct PodShard          │  │ struct VectorStore        │  │ struct ShardSet        │  │
│  │ • vectors: VectorStore   │  │ • rows: Vec<StoredRow>    │  │ • sorted by PodKey     │  │
│  │ • index: PositionalIndex │  │   (doc_id, SparseVector)  │  │ • write() / read()     │  │
│  │ • removed: bool          │  │ • <class>.vec, crc frames │  └────────────────────────┘  │
│  └──────────────────────────┘  └───────────────────────────┘                               │
│                                                                                              │
│  StorageLayout: <base>/pods/<owner>/<device>/<lang>/<class>.{vec,pos}, registry/, .lock    │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── INDEXING LAYER ────────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────┐  ┌──────────────────────────────────────────────┐     │
│  │ struct PositionalIndex         │  │ struct Indexer                               │     │
│  │ • slots: Vec<PostingList>      │  │ 1. delete old version (same url)            │     │
│  │   one per vocabulary id        │  │ 2. append row tagged with reserved id       │     │
│  │ • doc_terms: doc -> term ids   │  │ 3. write record                             │     │
│  └────────────────────────────────┘  │ 4. add postings, persist index              │     │
│                                       │ delete: remove row, re-sequence, postings    │     │
│  ┌────────────────────────────────┐  └──────────────────────────────────────────────┘     │
│  │ struct IndexJob                │                                                        │
│  │ • CancelToken between docs     │  ┌──────────────────────────────────────────────┐     │
│  │ • JobEvent over crossbeam      │  │ Analyzer: Tokenizer + Vectorizer traits      │     │
│  └────────────────────────────────┘  │ LanguageModels: lang -> Arc<LanguageModel>   │     │
│                                       └──────────────────────────────────────────────┘     │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── SEARCH LAYER ─────────────────────────────────────────┐
│                                                                                              │
│  QueryParser ("text -xx") → Analyzer → PodSelector (own pods + top K shared by cosine)      │
│      → per pod on rayon pool: Scorer (positional + completeness + snippet)                  │
│      → TopKCollector (max_results) → PermissionFilter (url prefixes) → SearchResults        │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── REPAIR LAYER ─────────────────────────────────────────┐
│                                                                                              │
│  ConsistencyChecker::check → ConsistencyReport (parity, out of range, duplicates,           │
│                              misowned rows, unreferenced rows, missing/orphan postings)      │
│  Repairer::repair          → passes under the pod write lock until nothing is left          │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
