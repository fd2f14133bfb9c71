use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: PathBuf,
    pub default_language: String,

    // Query pipeline
    pub max_pods: usize,            // K best shared pods on top of the requester's own
    pub max_results: usize,         // Ranked list cut-off
    pub min_completeness: f32,      // Below this a document scores zero
    pub query_workers: usize,       // Per-pod scoring pool

    // Indexing
    pub snippet_length: usize,      // Characters kept by the corpus reader

    // Repair
    pub max_repair_passes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage_path: PathBuf::from("./data"),
            default_language: "en".to_string(),
            max_pods: 3,
            max_results: 20,
            min_completeness: 0.3,
            query_workers: (num_cpus::get() / 2).max(1),
            snippet_length: 200,
            max_repair_passes: 8,
        }
    }
}

impl Config {
    pub fn with_storage_path(path: impl Into<PathBuf>) -> Self {
        Config {
            storage_path: path.into(),
            ..Config::default()
        }
    }

    /// Missing fields fall back to their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let config = serde_json::from_slice(&data)?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
