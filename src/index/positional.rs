use std::collections::{BTreeMap, BTreeSet, HashMap};
use crate::analysis::vocabulary::Vocabulary;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::posting::{min_forward_gap, Posting, PostingList};

/// Everything `remove` took out for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovedPostings {
    pub doc_id: DocId,
    pub terms: Vec<(u32, Vec<u32>)>,  // (vocabulary id, positions)
}

impl RemovedPostings {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn position_count(&self) -> usize {
        self.terms.iter().map(|(_, p)| p.len()).sum()
    }
}

/// Per-pod positional index: one posting list per vocabulary id, keyed by
/// stable document id so vector row shifts never touch it.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalIndex {
    slots: Vec<PostingList>,
    // Reverse map doc -> vocabulary ids holding it, so removal does not scan every slot
    doc_terms: BTreeMap<DocId, Vec<u32>>,
}

impl PositionalIndex {
    pub fn new(vocab_size: usize) -> Self {
        PositionalIndex {
            slots: vec![PostingList::new(); vocab_size],
            doc_terms: BTreeMap::new(),
        }
    }

    /// Rebuild from decoded slots
    pub fn from_slots(slots: Vec<PostingList>) -> Self {
        let mut doc_terms: BTreeMap<DocId, Vec<u32>> = BTreeMap::new();
        for (term_id, list) in slots.iter().enumerate() {
            for posting in list.iter() {
                doc_terms.entry(posting.doc_id).or_default().push(term_id as u32);
            }
        }
        PositionalIndex { slots, doc_terms }
    }

    pub fn vocab_size(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[PostingList] {
        &self.slots
    }

    pub fn postings(&self, term_id: u32) -> Option<&PostingList> {
        self.slots.get(term_id as usize)
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.doc_terms.contains_key(&doc_id)
    }

    /// Ids with at least one posting, ascending
    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.doc_terms.keys().copied()
    }

    pub fn doc_count(&self) -> usize {
        self.doc_terms.len()
    }

    pub fn posting_count(&self) -> usize {
        self.slots.iter().map(|s| s.len()).sum()
    }

    /// Record the position of every in-vocabulary token; out-of-vocabulary
    /// tokens are skipped but still count towards later positions.
    /// Returns the number of positions recorded.
    pub fn add(&mut self, doc_id: DocId, tokens: &[String], vocab: &Vocabulary) -> Result<usize> {
        if vocab.len() != self.slots.len() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Vocabulary of {} terms for an index of {} slots", vocab.len(), self.slots.len()),
            ));
        }
        if self.contains(doc_id) {
            return Err(Error::inconsistent(format!("Document {} already has postings", doc_id)));
        }

        let mut recorded = 0;
        let mut touched = BTreeSet::new();
        for (position, token) in tokens.iter().enumerate() {
            if let Some(term_id) = vocab.id(token) {
                self.slots[term_id as usize].add_position(doc_id, position as u32);
                touched.insert(term_id);
                recorded += 1;
            }
        }

        if !touched.is_empty() {
            self.doc_terms.insert(doc_id, touched.into_iter().collect());
        }
        Ok(recorded)
    }

    /// Drop every posting of `doc_id`
    pub fn remove(&mut self, doc_id: DocId) -> RemovedPostings {
        let mut removed = RemovedPostings {
            doc_id,
            terms: Vec::new(),
        };

        if let Some(term_ids) = self.doc_terms.remove(&doc_id) {
            for term_id in term_ids {
                if let Some(Posting { positions, .. }) = self.slots[term_id as usize].remove(doc_id) {
                    removed.terms.push((term_id, positions));
                }
            }
        }

        removed
    }

    /// Proximity/coverage score per document for a tokenized query.
    ///
    /// coverage = distinct query terms present / distinct query terms in vocabulary.
    /// proximity = mean over adjacent query-token pairs of 1 / (1 + gap), where gap
    /// is the fewest tokens between the first term and a later occurrence of the second.
    /// Documents matching nothing are absent from the map.
    pub fn score(&self, query_tokens: &[String], vocab: &Vocabulary) -> HashMap<DocId, f32> {
        let query_ids: Vec<u32> = query_tokens
            .iter()
            .filter_map(|t| vocab.id(t))
            .filter(|&id| (id as usize) < self.slots.len())
            .collect();
        let distinct: BTreeSet<u32> = query_ids.iter().copied().collect();

        let mut scores: HashMap<DocId, f32> = HashMap::new();
        if distinct.is_empty() {
            return scores;
        }

        let mut matched: HashMap<DocId, usize> = HashMap::new();
        for &term_id in &distinct {
            for posting in self.slots[term_id as usize].iter() {
                *matched.entry(posting.doc_id).or_insert(0) += 1;
            }
        }

        for (&doc_id, &count) in &matched {
            scores.insert(doc_id, count as f32 / distinct.len() as f32);
        }

        if query_ids.len() > 1 {
            let pairs = (query_ids.len() - 1) as f32;
            for window in query_ids.windows(2) {
                let (first, second) = (&self.slots[window[0] as usize], &self.slots[window[1] as usize]);
                for posting in first.iter() {
                    let Some(other) = second.get(posting.doc_id) else {
                        continue;
                    };
                    if let Some(gap) = min_forward_gap(&posting.positions, &other.positions) {
                        if let Some(score) = scores.get_mut(&posting.doc_id) {
                            *score += 1.0 / (1.0 + gap as f32) / pairs;
                        }
                    }
                }
            }
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_terms(&["pod", "search", "engine", "rust"]).unwrap()
    }

    fn tokens(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_add_skips_out_of_vocabulary_tokens() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        let recorded = index.add(DocId(1), &tokens("the pod search the pod"), &vocab).unwrap();

        assert_eq!(recorded, 3);
        assert_eq!(index.postings(0).unwrap().get(DocId(1)).unwrap().positions, vec![1, 4]);
        assert_eq!(index.postings(1).unwrap().get(DocId(1)).unwrap().positions, vec![2]);
        assert!(index.postings(2).unwrap().is_empty());
    }

    #[test]
    fn test_document_without_vocabulary_tokens_has_no_postings() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        assert_eq!(index.add(DocId(1), &tokens("nothing here"), &vocab).unwrap(), 0);
        assert!(!index.contains(DocId(1)));
    }

    #[test]
    fn test_double_add_is_inconsistent() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        index.add(DocId(1), &tokens("pod"), &vocab).unwrap();
        assert!(index.add(DocId(1), &tokens("pod"), &vocab).unwrap_err().is_inconsistent());
    }

    #[test]
    fn test_remove_returns_what_was_removed() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        index.add(DocId(1), &tokens("pod search pod"), &vocab).unwrap();
        index.add(DocId(2), &tokens("pod"), &vocab).unwrap();

        let removed = index.remove(DocId(1));
        assert_eq!(removed.terms, vec![(0, vec![0, 2]), (1, vec![1])]);
        assert_eq!(removed.position_count(), 3);
        assert_eq!(index.doc_ids().collect::<Vec<_>>(), vec![DocId(2)]);
        assert!(index.remove(DocId(1)).is_empty());
    }

    #[test]
    fn test_removing_unknown_doc_is_default() {
        let mut index = PositionalIndex::new(vocab().len());
        let removed = index.remove(DocId(7));
        assert_eq!(removed, RemovedPostings { doc_id: DocId(7), ..RemovedPostings::default() });
        assert_eq!(RemovedPostings::default().doc_id, DocId::default());
    }

    #[test]
    fn test_score_rewards_coverage_and_proximity() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        index.add(DocId(1), &tokens("pod search engine"), &vocab).unwrap();
        index.add(DocId(2), &tokens("pod x x x x search engine"), &vocab).unwrap();
        index.add(DocId(3), &tokens("pod only"), &vocab).unwrap();
        index.add(DocId(4), &tokens("rust"), &vocab).unwrap();

        let scores = index.score(&tokens("pod search"), &vocab);
        assert!(scores[&DocId(1)] > scores[&DocId(2)]);
        assert!(scores[&DocId(2)] > scores[&DocId(3)]);
        assert!((scores[&DocId(1)] - 2.0).abs() < 1e-6);
        assert!((scores[&DocId(3)] - 0.5).abs() < 1e-6);
        assert!(!scores.contains_key(&DocId(4)));
    }

    #[test]
    fn test_score_unknown_query_is_empty() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        index.add(DocId(1), &tokens("pod"), &vocab).unwrap();
        assert!(index.score(&tokens("zebra"), &vocab).is_empty());
    }

    #[test]
    fn test_from_slots_rebuilds_reverse_map() {
        let vocab = vocab();
        let mut index = PositionalIndex::new(vocab.len());
        index.add(DocId(5), &tokens("engine rust"), &vocab).unwrap();

        let rebuilt = PositionalIndex::from_slots(index.slots().to_vec());
        assert_eq!(rebuilt, index);
    }
}
