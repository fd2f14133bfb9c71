use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use crate::core::error::{Error, ErrorKind, Result};
use crate::writer::indexer::{IncomingDocument, Indexer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared stop flag. Checked between documents only, so a cancelled job
/// never leaves a document half indexed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job: JobId,
    pub started: DateTime<Utc>,
    pub elapsed: Duration,
    pub total: usize,
    pub indexed: usize,
    pub failed: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Started { job: JobId, total: usize },
    Progress { job: JobId, done: usize, total: usize, percent: u8 },
    Failed { job: JobId, url: String, error: String },
    Finished(JobSummary),
}

/// Batch of documents indexed one after the other, reporting as it goes
pub struct IndexJob {
    id: JobId,
    documents: Vec<IncomingDocument>,
    cancel: CancelToken,
}

impl IndexJob {
    pub fn new(documents: Vec<IncomingDocument>) -> Self {
        IndexJob {
            id: JobId::new(),
            documents,
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Index every document on the calling thread. A failing document is
    /// reported and skipped; the job carries on with the next one.
    /// Events go to `events`; a dropped receiver does not stop the job.
    pub fn run(self, indexer: &Indexer, events: &Sender<JobEvent>) -> JobSummary {
        let started = Utc::now();
        let clock = Instant::now();
        let total = self.documents.len();
        let mut summary = JobSummary {
            job: self.id,
            started,
            elapsed: Duration::ZERO,
            total,
            indexed: 0,
            failed: 0,
            cancelled: false,
        };

        info!(job = %self.id, total, "index job started");
        let _ = events.send(JobEvent::Started { job: self.id, total });

        for (done, doc) in self.documents.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                info!(job = %self.id, done, total, "index job cancelled");
                break;
            }

            let url = doc.url.clone();
            match indexer.index_document(doc) {
                Ok(_) => summary.indexed += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(job = %self.id, %url, error = %e, "document failed");
                    let _ = events.send(JobEvent::Failed {
                        job: self.id,
                        url,
                        error: e.to_string(),
                    });
                }
            }

            let done = done + 1;
            let percent = percent_done(done, total);
            let _ = events.send(JobEvent::Progress { job: self.id, done, total, percent });
            if percent_done(done - 1, total) / 10 != percent / 10 {
                info!(job = %self.id, done, total, percent, "index job progress");
            }
        }

        summary.elapsed = clock.elapsed();
        info!(
            job = %summary.job,
            indexed = summary.indexed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "index job finished"
        );
        let _ = events.send(JobEvent::Finished(summary.clone()));
        summary
    }

    /// Run on a background thread; progress arrives on the handle's receiver
    pub fn spawn(self, indexer: Arc<Indexer>) -> JobHandle {
        let (sender, receiver) = channel::unbounded();
        let id = self.id;
        let cancel = self.cancel.clone();
        let thread = thread::spawn(move || self.run(&indexer, &sender));

        JobHandle {
            id,
            cancel,
            events: receiver,
            thread,
        }
    }
}

/// Rounded up so that any progress at all shows as at least 1%
fn percent_done(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    done.saturating_mul(100).div_ceil(total).min(100) as u8
}

pub struct JobHandle {
    id: JobId,
    cancel: CancelToken,
    events: Receiver<JobEvent>,
    thread: JoinHandle<JobSummary>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Wait for the job to end
    pub fn join(self) -> Result<JobSummary> {
        self.thread
            .join()
            .map_err(|_| Error::new(ErrorKind::Io, format!("index job {} panicked", self.id)))
    }
}
