/// podsearch walkthrough
///
/// - index a few documents into two pods
/// - search as the owner and as another user
/// - re-index, move, delete
/// - consistency check, repair and statistics

use podsearch::analysis::language::{LanguageModel, LanguageModels};
use podsearch::analysis::vocabulary::Vocabulary;
use podsearch::search::PermissionFilter;
use podsearch::writer::IncomingDocument;
use podsearch::{Config, PermissionClass, PodEngine, PodKey};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let dir = tempfile::tempdir()?;
    let vocab = Vocabulary::from_terms(&[
        "rust", "programming", "language", "database", "systems", "garden", "tomato", "web", "search",
    ])?;
    let models = Arc::new(LanguageModels::new().with_model(LanguageModel::new("en", vocab)));
    let engine = PodEngine::open(Config::with_storage_path(dir.path()), models)?;

    let private = PodKey::new("ann", "laptop", "en", PermissionClass::User);
    let shared = PodKey::new("ann", "laptop", "en", PermissionClass::Others);

    println!("Indexing...");
    let docs = [
        ("/ann/notes/rust.txt", &private, "Rust Programming", "Learn the rust programming language"),
        ("/ann/notes/db.txt", &private, "Database Systems", "Database systems and search"),
        ("/ann/blog/garden.html", &shared, "My Garden", "Growing tomato plants in the garden"),
        ("/ann/blog/rust.html", &shared, "Rust on the web", "Rust for web programming"),
    ];
    for (url, pod, title, body) in docs {
        let doc = IncomingDocument::new(url, pod.clone())
            .with_title(title)
            .with_snippet(body)
            .with_body(body);
        let outcome = engine.index_document(doc)?;
        println!("  {} -> {} row {}", url, outcome.pod, outcome.row);
    }

    println!("\nSearching...");
    let everything = PermissionFilter::allow_all();
    for query in ["rust programming", "tomato garden", "rust -en", "volcano"] {
        let results = engine.search(query, &everything, Some("ann"))?;
        println!("  ann: '{}' -> {} hits in {}ms", query, results.hits.len(), results.took_ms);
        for hit in &results.hits {
            println!("      {:.3}  {}", hit.score, hit.url);
        }
    }
    let visible = PermissionFilter::new(["/ann/blog/"]);
    println!("  bob: 'rust' -> {:?}", engine.search_urls("rust", &visible, Some("bob"))?);

    println!("\nUpdating...");
    let again = IncomingDocument::new("/ann/notes/db.txt", private.clone()).with_body("garden database");
    let outcome = engine.index_document(again)?;
    println!("  re-indexed db.txt as {} (was {:?})", outcome.id, outcome.replaced);
    let moved = engine.move_document("/ann/notes/rust.txt", "/ann/archive/")?;
    println!("  moved to {}", moved.url);
    let deleted = engine.delete_url("/ann/blog/garden.html")?;
    println!("  deleted {} ({} rows shifted)", deleted.record.url, deleted.resequenced);

    println!("\nConsistency...");
    for report in engine.check_all()? {
        println!("  {}: consistent={} rows={} records={}", report.pod, report.is_consistent(), report.rows, report.records);
    }
    for report in engine.repair_all()? {
        println!("  {}: repaired in {} passes, changed={}", report.pod, report.passes, report.changed_anything());
    }

    let stats = engine.stats()?;
    println!("\nStats: {} documents in {} pods, health {:?}", stats.documents, stats.pods.len(), stats.health);
    for pod in &stats.pods {
        println!("  {}: rows={} postings={} terms={}", pod.pod, pod.rows, pod.postings, pod.indexed_terms);
    }

    Ok(())
}
