#![allow(dead_code)]

use std::sync::Arc;
use podsearch::analysis::language::{LanguageModel, LanguageModels};
use podsearch::analysis::vocabulary::Vocabulary;
use podsearch::writer::IncomingDocument;
use podsearch::{Config, PermissionClass, PodEngine, PodKey};
use tempfile::TempDir;

pub const TERMS: &[&str] = &[
    "pod", "search", "engine", "garden", "tomato", "river", "bridge", "rust", "index", "vector",
];

pub fn models() -> Arc<LanguageModels> {
    let english = Vocabulary::from_terms(TERMS).unwrap();
    let french = Vocabulary::from_terms(&["jardin", "tomate", "pont"]).unwrap();
    Arc::new(
        LanguageModels::new()
            .with_model(LanguageModel::new("en", english))
            .with_model(LanguageModel::new("fr", french)),
    )
}

pub fn open(dir: &TempDir) -> PodEngine {
    let config = Config {
        query_workers: 2,
        ..Config::with_storage_path(dir.path())
    };
    PodEngine::open(config, models()).unwrap()
}

pub fn pod(owner: &str, permission: PermissionClass) -> PodKey {
    PodKey::new(owner, "laptop", "en", permission)
}

pub fn doc(url: &str, pod: &PodKey, body: &str) -> IncomingDocument {
    IncomingDocument::new(url, pod.clone()).with_body(body).with_snippet(body)
}
