use std::collections::HashMap;
use std::sync::Arc;
use crate::analysis::language::LanguageModels;
use crate::analysis::tokenizer::Tokenizer;
use crate::core::error::Result;
use crate::vector::SparseVector;

/// Turns text into a sparse term-weight vector as wide as the language's vocabulary.
/// Must be deterministic for a given vocabulary.
pub trait Vectorizer: Send + Sync {
    fn vectorize(&self, language: &str, text: &str) -> Result<SparseVector>;

    fn name(&self) -> &str;
}

/// Term counts weighted by the term's rarity (|log prob|, at least 1), L2-normalised
pub struct WeightedVectorizer {
    models: Arc<LanguageModels>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl WeightedVectorizer {
    pub fn new(models: Arc<LanguageModels>, tokenizer: Arc<dyn Tokenizer>) -> Self {
        WeightedVectorizer { models, tokenizer }
    }
}

impl Vectorizer for WeightedVectorizer {
    fn vectorize(&self, language: &str, text: &str) -> Result<SparseVector> {
        let model = self.models.get(language)?;
        let vocab = &model.vocabulary;

        let mut counts: HashMap<u32, f32> = HashMap::new();
        for token in self.tokenizer.tokenize(language, text)? {
            if let Some(id) = vocab.id(&token) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }

        let weighted = counts
            .into_iter()
            .map(|(id, count)| (id, count * vocab.log_prob(id).abs().max(1.0)));

        let mut vector = SparseVector::from_pairs(vocab.len(), weighted)?;
        vector.normalize();
        Ok(vector)
    }

    fn name(&self) -> &str {
        "weighted"
    }
}
