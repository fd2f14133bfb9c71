use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::types::{DocId, PodKey};

/// Metadata of one live document.
///
/// `row` is the position of the document's vector in its pod's vector store.
/// It moves whenever an earlier row of the same pod is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocId,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub description: String,
    pub pod: PodKey,
    pub row: usize,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl DocumentRecord {
    /// Last path segment of the url
    pub fn filename(&self) -> &str {
        url_filename(&self.url)
    }
}

/// A pod known to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRecord {
    pub key: PodKey,
    pub registered: DateTime<Utc>,
}

impl PodRecord {
    pub fn owner(&self) -> &str {
        &self.key.owner
    }

    pub fn language(&self) -> &str {
        &self.key.language
    }
}

pub fn url_filename(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}
