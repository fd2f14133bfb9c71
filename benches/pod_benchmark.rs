use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use podsearch::analysis::language::{LanguageModel, LanguageModels};
use podsearch::analysis::vocabulary::Vocabulary;
use podsearch::search::PermissionFilter;
use podsearch::writer::IncomingDocument;
use podsearch::{Config, PermissionClass, PodEngine, PodKey};
use rand::Rng;
use std::sync::Arc;
use tempfile::TempDir;

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "river", "bridge",
    "garden", "tomato", "rust", "index", "vector", "pod", "search", "engine",
];

fn models() -> Arc<LanguageModels> {
    let vocab = Vocabulary::from_terms(WORDS).unwrap();
    Arc::new(LanguageModels::new().with_model(LanguageModel::new("en", vocab)))
}

fn random_body(words: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..words)
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

fn open_engine() -> (TempDir, PodEngine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = PodEngine::open(Config::with_storage_path(dir.path()), models()).unwrap();
    (dir, engine)
}

/// `pods` shared pods of `docs` documents each
fn populated(pods: usize, docs: usize) -> (TempDir, PodEngine) {
    let (dir, engine) = open_engine();
    for p in 0..pods {
        let key = PodKey::new(&format!("user{}", p), "desk", "en", PermissionClass::Others);
        for d in 0..docs {
            let doc = IncomingDocument::new(format!("/user{}/doc{}", p, d), key.clone()).with_body(random_body(50));
            engine.index_document(doc).unwrap();
        }
    }
    (dir, engine)
}

fn bench_index(c: &mut Criterion) {
    let (_dir, engine) = open_engine();
    let pod = PodKey::new("ann", "laptop", "en", PermissionClass::User);

    c.bench_function("index_document", |b| {
        let mut id = 0u64;
        b.iter(|| {
            let doc = IncomingDocument::new(format!("/ann/doc{}", id), pod.clone()).with_body(random_body(100));
            engine.index_document(doc).unwrap();
            id += 1;
        });
    });
}

fn bench_delete_resequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_first_row");
    group.sample_size(20);

    for size in [50, 200].iter() {
        let (_dir, engine) = populated(1, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let mut n = 0u64;
            b.iter(|| {
                let pod = PodKey::new("user0", "desk", "en", PermissionClass::Others);
                let first = engine.registry().by_pod(&pod).unwrap().into_iter().find(|r| r.row == 0).unwrap();
                engine.delete_document(first.id).unwrap();
                let doc = IncomingDocument::new(format!("/refill{}", n), pod).with_body(random_body(50));
                engine.index_document(doc).unwrap();
                n += 1;
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let (_dir, engine) = populated(5, 200);
    let filter = PermissionFilter::allow_all();
    let mut group = c.benchmark_group("search");

    group.bench_function("single_term", |b| {
        b.iter(|| engine.search(black_box("garden"), &filter, Some("ann")).unwrap());
    });

    group.bench_function("phrase", |b| {
        b.iter(|| engine.search(black_box("quick brown fox"), &filter, Some("ann")).unwrap());
    });

    group.bench_function("no_match", |b| {
        b.iter(|| engine.search(black_box("volcano"), &filter, Some("ann")).unwrap());
    });

    group.finish();
}

fn bench_check(c: &mut Criterion) {
    let (_dir, engine) = populated(3, 200);
    c.bench_function("check_all", |b| {
        b.iter(|| engine.check_all().unwrap());
    });
}

criterion_group!(benches, bench_index, bench_delete_resequence, bench_search, bench_check);
criterion_main!(benches);
