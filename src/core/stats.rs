use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use crate::core::types::PodKey;

/// Size of one pod's three stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodStats {
    pub pod: PodKey,
    pub rows: usize,
    pub records: usize,
    /// Documents with at least one posting
    pub postings: usize,
    /// Vocabulary slots holding any posting
    pub indexed_terms: usize,
}

/// Engine statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub started: DateTime<Utc>,
    pub uptime_secs: u64,
    pub pods: Vec<PodStats>,
    pub documents: usize,
    pub languages: Vec<String>,
    pub pods_needing_repair: Vec<PodKey>,
    pub health: HealthStatus,
}

impl EngineStats {
    pub fn total_rows(&self) -> usize {
        self.pods.iter().map(|p| p.rows).sum()
    }
}

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum HealthStatus {
    Healthy,
    /// Some pods were flagged for repair by a live operation
    Degraded(String),
}

impl HealthStatus {
    pub fn from_flagged(flagged: &[PodKey]) -> Self {
        if flagged.is_empty() {
            HealthStatus::Healthy
        } else {
            let pods: Vec<String> = flagged.iter().map(|p| p.to_string()).collect();
            HealthStatus::Degraded(format!("pods need repair: {}", pods.join(", ")))
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}
