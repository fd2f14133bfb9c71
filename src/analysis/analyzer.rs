use std::sync::Arc;
use crate::analysis::language::{LanguageModel, LanguageModels};
use crate::analysis::tokenizer::{Tokenizer, UnicodeTokenizer};
use crate::analysis::vectorizer::{Vectorizer, WeightedVectorizer};
use crate::core::error::{Error, Result};
use crate::vector::SparseVector;

/// Text after both collaborators ran over it
pub struct AnalyzedText {
    pub model: Arc<LanguageModel>,
    pub tokens: Vec<String>,
    pub vector: SparseVector,
}

impl AnalyzedText {
    pub fn has_vocabulary_tokens(&self) -> bool {
        self.tokens.iter().any(|t| self.model.vocabulary.contains(t))
    }
}

/// Text analysis pipeline: tokenizer + vectorizer over the installed languages
#[derive(Clone)]
pub struct Analyzer {
    pub models: Arc<LanguageModels>,
    pub tokenizer: Arc<dyn Tokenizer>,
    pub vectorizer: Arc<dyn Vectorizer>,
}

impl Analyzer {
    pub fn new(
        models: Arc<LanguageModels>,
        tokenizer: Arc<dyn Tokenizer>,
        vectorizer: Arc<dyn Vectorizer>,
    ) -> Self {
        Analyzer { models, tokenizer, vectorizer }
    }

    /// Unicode tokenizer + weighted vectorizer
    pub fn standard(models: Arc<LanguageModels>) -> Self {
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(UnicodeTokenizer::default());
        let vectorizer = Arc::new(WeightedVectorizer::new(models.clone(), tokenizer.clone()));
        Analyzer::new(models, tokenizer, vectorizer)
    }

    /// Runs both collaborators. Any failure, including a vector of the wrong
    /// width, is reported as `VectorizationFailed`.
    pub fn analyze(&self, language: &str, text: &str) -> Result<AnalyzedText> {
        let model = self.models.get(language)?;

        let tokens = self.tokenizer.tokenize(language, text)
            .map_err(|e| Error::vectorization(format!("{} tokenizer: {}", self.tokenizer.name(), e)))?;
        let vector = self.vectorizer.vectorize(language, text)
            .map_err(|e| Error::vectorization(format!("{} vectorizer: {}", self.vectorizer.name(), e)))?;

        if vector.width() != model.width() {
            return Err(Error::vectorization(format!(
                "{} vectorizer produced width {} for '{}', vocabulary has {}",
                self.vectorizer.name(), vector.width(), language, model.width()
            )));
        }

        Ok(AnalyzedText { model, tokens, vector })
    }
}
