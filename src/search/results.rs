use std::collections::BinaryHeap;
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::core::types::{DocId, PodKey};
use crate::search::scorer::ScoreBreakdown;

/// Search results container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    /// Documents that scored above zero, before the cut-off and the filter
    pub total_hits: usize,
    pub max_score: f32,
    pub pods_searched: Vec<PodKey>,
    pub language: String,
    pub took_ms: u64,
}

impl SearchResults {
    pub fn urls(&self) -> Vec<String> {
        self.hits.iter().map(|hit| hit.url.clone()).collect()
    }
}

/// Document with relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub pod: PodKey,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
}

impl SearchHit {
    /// Best first: score, then cosine, then url
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| other.breakdown.cosine.total_cmp(&self.breakdown.cosine))
            .then_with(|| self.url.cmp(&other.url))
    }
}

// Heap order is reversed so the worst hit sits on top
impl PartialEq for SearchHit {
    fn eq(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Equal
    }
}

impl Eq for SearchHit {}

impl PartialOrd for SearchHit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchHit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank(other)
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<SearchHit>,
    k: usize,
    total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k + 1),
            k,
            total_collected: 0,
        }
    }

    /// Hits scoring zero or less are not results
    pub fn collect(&mut self, hit: SearchHit) {
        if hit.score.is_nan() || hit.score <= 0.0 || self.k == 0 {
            return;
        }
        self.total_collected += 1;
        self.heap.push(hit);
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn total_collected(&self) -> usize {
        self.total_collected
    }

    pub fn max_score(&self) -> f32 {
        self.heap.iter().map(|hit| hit.score).fold(0.0, f32::max)
    }

    /// Best first
    pub fn into_sorted(self) -> Vec<SearchHit> {
        self.heap.into_sorted_vec()
    }
}
