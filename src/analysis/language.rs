use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use crate::analysis::vocabulary::Vocabulary;
use crate::core::error::{Error, Result};

/// Everything loaded for one installed language
pub struct LanguageModel {
    pub language: String,
    pub vocabulary: Vocabulary,
}

impl LanguageModel {
    pub fn new(language: &str, vocabulary: Vocabulary) -> Self {
        LanguageModel {
            language: language.to_string(),
            vocabulary,
        }
    }

    /// Vector width of this language
    pub fn width(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Installed languages, loaded once at start-up and read-only afterwards.
/// Shared by the vectorizer, the indexer and the query engine.
#[derive(Default)]
pub struct LanguageModels {
    models: HashMap<String, Arc<LanguageModel>>,
}

impl LanguageModels {
    pub fn new() -> Self {
        LanguageModels::default()
    }

    pub fn with_model(mut self, model: LanguageModel) -> Self {
        self.models.insert(model.language.clone(), Arc::new(model));
        self
    }

    /// Scan `<dir>/<lang>/<lang>wiki.vocab`; every subdirectory holding one is an installed language
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut models = LanguageModels::new();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let language = entry.file_name().to_string_lossy().to_string();
            let vocab_path = entry.path().join(format!("{}wiki.vocab", language));
            if !vocab_path.exists() {
                continue;
            }

            let vocabulary = Vocabulary::from_vocab_file(&vocab_path)?;
            info!(language = %language, terms = vocabulary.len(), "loaded vocabulary");
            models = models.with_model(LanguageModel::new(&language, vocabulary));
        }

        Ok(models)
    }

    pub fn get(&self, language: &str) -> Result<Arc<LanguageModel>> {
        self.models.get(language).cloned().ok_or_else(|| {
            Error::vectorization(format!("Language '{}' is not installed", language))
        })
    }

    pub fn contains(&self, language: &str) -> bool {
        self.models.contains_key(language)
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.models.keys().map(|s| s.as_str()).collect();
        langs.sort_unstable();
        langs
    }
}
