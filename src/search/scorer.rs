use std::collections::BTreeSet;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::analysis::language::LanguageModel;
use crate::vector::SparseVector;

/// The analysed query, shared read-only by every pod's scoring task
#[derive(Clone)]
pub struct QueryTerms {
    pub model: Arc<LanguageModel>,
    pub vector: SparseVector,
    /// In query order, for the proximity score
    pub tokens: Vec<String>,
    /// Distinct words, for the snippet overlap
    pub words: BTreeSet<String>,
}

impl QueryTerms {
    pub fn new(model: Arc<LanguageModel>, vector: SparseVector, tokens: Vec<String>) -> Self {
        let words = tokens.iter().cloned().collect();
        QueryTerms { model, vector, tokens, words }
    }
}

/// What a scorer sees of one document
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub vector: &'a SparseVector,
    /// Proximity score from the pod's positional index
    pub positional: f32,
    pub snippet_tokens: &'a [String],
}

/// The parts a document's score is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub cosine: f32,
    pub completeness: f32,
    pub positional: f32,
    pub snippet: f32,
    pub total: f32,
}

/// Scorer trait
pub trait Scorer: Send + Sync {
    fn score(&self, query: &QueryTerms, candidate: &Candidate) -> ScoreBreakdown;

    fn name(&self) -> &str;
}

/// positional + completeness, zeroed when NaN or when completeness is under
/// the threshold, plus the snippet overlap (and +1 for a full overlap).
pub struct CombinedScorer {
    pub min_completeness: f32,
}

impl Default for CombinedScorer {
    fn default() -> Self {
        CombinedScorer {
            min_completeness: 0.3,
        }
    }
}

impl CombinedScorer {
    pub fn new(min_completeness: f32) -> Self {
        CombinedScorer { min_completeness }
    }

    fn combine(&self, positional: f32, completeness: f32, snippet: f32) -> f32 {
        let base = positional + completeness;
        if base.is_nan() || completeness.is_nan() || completeness < self.min_completeness {
            return 0.0;
        }
        let bonus = if snippet >= 1.0 { 1.0 } else { 0.0 };
        base + snippet + bonus
    }
}

impl Scorer for CombinedScorer {
    fn score(&self, query: &QueryTerms, candidate: &Candidate) -> ScoreBreakdown {
        let completeness = query.vector.completeness(candidate.vector);
        let snippet = snippet_overlap(&query.words, candidate.snippet_tokens);
        ScoreBreakdown {
            cosine: query.vector.cosine(candidate.vector),
            completeness,
            positional: candidate.positional,
            snippet,
            total: self.combine(candidate.positional, completeness, snippet),
        }
    }

    fn name(&self) -> &str {
        "combined"
    }
}

/// Fraction of the distinct query words present in the snippet
pub fn snippet_overlap(words: &BTreeSet<String>, snippet_tokens: &[String]) -> f32 {
    if words.is_empty() {
        return 0.0;
    }
    let snippet: BTreeSet<&str> = snippet_tokens.iter().map(String::as_str).collect();
    let found = words.iter().filter(|w| snippet.contains(w.as_str())).count();
    found as f32 / words.len() as f32
}
