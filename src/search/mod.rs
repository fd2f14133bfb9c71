pub mod query;
pub mod filter;
pub mod pod_selector;
pub mod scorer;
pub mod results;
pub mod engine;

pub use engine::SearchEngine;
pub use filter::PermissionFilter;
pub use pod_selector::{PodSelector, SelectedPod};
pub use query::{ParsedQuery, QueryParser};
pub use results::{SearchHit, SearchResults, TopKCollector};
pub use scorer::{Candidate, CombinedScorer, QueryTerms, ScoreBreakdown, Scorer};
