pub mod record;
pub mod local;

use crate::core::error::Result;
use crate::core::types::{DocId, PodKey};

pub use local::LocalRegistry;
pub use record::{DocumentRecord, PodRecord};

/// Filtered scan over live records. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub owner: Option<String>,
    pub url_prefix: Option<String>,
}

impl RecordFilter {
    pub fn owner(owner: &str) -> Self {
        RecordFilter {
            owner: Some(owner.to_string()),
            url_prefix: None,
        }
    }

    pub fn url_prefix(prefix: &str) -> Self {
        RecordFilter {
            owner: None,
            url_prefix: Some(prefix.to_string()),
        }
    }

    pub fn matches(&self, record: &DocumentRecord) -> bool {
        self.owner.as_deref().is_none_or(|o| record.pod.is_owned_by(o))
            && self.url_prefix.as_deref().is_none_or(|p| record.url.starts_with(p))
    }
}

/// Document metadata store.
///
/// The engine owns the update protocol for `row` and `pod`; implementations
/// only need to keep urls unique and hand out ids that are never reused.
pub trait DocumentRegistry: Send + Sync {
    /// Reserve a fresh stable id
    fn next_id(&self) -> Result<DocId>;

    fn get(&self, id: DocId) -> Result<Option<DocumentRecord>>;

    fn get_by_url(&self, url: &str) -> Result<Option<DocumentRecord>>;

    /// Records of one pod, ascending id
    fn by_pod(&self, pod: &PodKey) -> Result<Vec<DocumentRecord>>;

    fn scan(&self, filter: &RecordFilter) -> Result<Vec<DocumentRecord>>;

    fn count(&self) -> Result<usize>;

    /// Insert or replace by id. Fails with `InvalidArgument` when another
    /// record already holds the url.
    fn put(&self, record: DocumentRecord) -> Result<()>;

    /// All-or-nothing `put` of several records
    fn put_many(&self, records: Vec<DocumentRecord>) -> Result<()>;

    fn delete(&self, id: DocId) -> Result<Option<DocumentRecord>>;

    /// No-op if already registered
    fn register_pod(&self, pod: &PodKey) -> Result<()>;

    fn pod(&self, pod: &PodKey) -> Result<Option<PodRecord>>;

    fn pods(&self) -> Result<Vec<PodRecord>>;

    fn remove_pod(&self, pod: &PodKey) -> Result<bool>;
}
