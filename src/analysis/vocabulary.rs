use std::fs;
use std::path::Path;
use fst::Map;
use crate::core::error::{Error, ErrorKind, Result};

/// Term dictionary of one language: term <-> vocabulary id.
///
/// Ids follow the order of the source file, which is also the column order of
/// every vector of that language.
pub struct Vocabulary {
    map: Map<Vec<u8>>,
    terms: Vec<String>,
    log_probs: Vec<f32>,
}

impl Vocabulary {
    /// Build from `(term, log_prob)` entries; the entry index becomes the term id.
    /// Repeated terms keep their first id.
    pub fn from_entries(entries: Vec<(String, f32)>) -> Result<Self> {
        let mut terms = Vec::with_capacity(entries.len());
        let mut log_probs = Vec::with_capacity(entries.len());
        let mut keyed: Vec<(String, u64)> = Vec::with_capacity(entries.len());

        for (term, log_prob) in entries {
            // Blank entries hold their id but are never looked up
            if !term.is_empty() {
                keyed.push((term.clone(), terms.len() as u64));
            }
            terms.push(term);
            log_probs.push(log_prob);
        }

        // fst wants sorted, unique keys; stable sort keeps the first id of a repeated term first
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.dedup_by(|later, earlier| later.0 == earlier.0);

        let map = Map::from_iter(keyed.iter().map(|(t, id)| (t.as_bytes(), *id)))?;

        Ok(Vocabulary { map, terms, log_probs })
    }

    pub fn from_terms(terms: &[&str]) -> Result<Self> {
        Self::from_entries(terms.iter().map(|t| (t.to_string(), 0.0)).collect())
    }

    /// SentencePiece vocab format: `piece<TAB>log_prob` per line, id = line number
    pub fn from_vocab_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut entries = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            let mut parts = line.split('\t');
            let term = parts.next().unwrap_or_default().to_string();
            let log_prob = match parts.next() {
                Some(raw) => raw.trim().parse::<f32>().map_err(|_| {
                    Error::new(
                        ErrorKind::Parse,
                        format!("{}:{}: bad log probability '{}'", path.display(), line_no + 1, raw),
                    )
                })?,
                None => 0.0,
            };
            entries.push((term, log_prob));
        }

        Self::from_entries(entries)
    }

    pub fn id(&self, term: &str) -> Option<u32> {
        self.map.get(term).map(|id| id as u32)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.map.contains_key(term)
    }

    pub fn term(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(|s| s.as_str())
    }

    pub fn log_prob(&self, id: u32) -> f32 {
        self.log_probs.get(id as usize).copied().unwrap_or(0.0)
    }

    /// Vector width for this language
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
