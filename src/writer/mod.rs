pub mod indexer;
pub mod corpus;
pub mod job;

pub use corpus::{CorpusEntry, CorpusReader};
pub use indexer::{DeleteOutcome, IncomingDocument, IndexOutcome, Indexer};
pub use job::{CancelToken, IndexJob, JobEvent, JobHandle, JobId, JobSummary};
