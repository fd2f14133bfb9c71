use crate::core::types::DocId;

/// Positions of one vocabulary term inside one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<u32>,  // Ascending token offsets
}

impl Posting {
    pub fn term_freq(&self) -> usize {
        self.positions.len()
    }
}

/// Posting list for a term
/// Note: Sorted by doc_id for efficient merging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Positions must arrive in ascending order per document
    pub fn add_position(&mut self, doc_id: DocId, position: u32) {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => self.postings[pos].positions.push(position),
            Err(pos) => self.postings.insert(pos, Posting {
                doc_id,
                positions: vec![position],
            }),
        }
    }

    /// Insert a fully built posting (loading from disk); replaces any posting of the same doc
    pub fn insert(&mut self, posting: Posting) {
        match self.postings.binary_search_by_key(&posting.doc_id, |p| p.doc_id) {
            Ok(pos) => self.postings[pos] = posting,
            Err(pos) => self.postings.insert(pos, posting),
        }
    }

    pub fn remove(&mut self, doc_id: DocId) -> Option<Posting> {
        match self.postings.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(pos) => Some(self.postings.remove(pos)),
            Err(_) => None,
        }
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }
}

/// Smallest number of tokens strictly between an occurrence in `first` and a
/// later occurrence in `second`. Both lists ascending.
pub fn min_forward_gap(first: &[u32], second: &[u32]) -> Option<u32> {
    let mut best: Option<u32> = None;
    let mut j = 0;

    for &a in first {
        while j < second.len() && second[j] <= a {
            j += 1;
        }
        if j == second.len() {
            break;
        }
        let gap = second[j] - a - 1;
        best = Some(best.map_or(gap, |b| b.min(gap)));
        if gap == 0 {
            break;
        }
    }

    best
}
