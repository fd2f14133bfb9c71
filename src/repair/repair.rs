use std::collections::BTreeSet;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, PodKey};
use crate::registry::DocumentRegistry;
use crate::repair::checks::{inspect, ConsistencyReport};
use crate::storage::shard::{PodShard, PodStore};
use crate::writer::indexer::resequence_after_removal;

/// What a repair run removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub pod: PodKey,
    pub passes: usize,
    pub dropped_records: Vec<DocId>,
    /// (row position at removal time, id the row was tagged with)
    pub removed_rows: Vec<(usize, DocId)>,
    pub removed_postings: Vec<DocId>,
    pub before: ConsistencyReport,
    pub after: ConsistencyReport,
}

impl RepairReport {
    pub fn changed_anything(&self) -> bool {
        !self.dropped_records.is_empty() || !self.removed_rows.is_empty() || !self.removed_postings.is_empty()
    }
}

/// Heals a pod by removing whatever is inconsistent. Never fabricates rows,
/// postings or records. Running it twice is the same as running it once.
///
/// One pass, in order:
/// 1. drop records whose row is out of range
/// 2. drop all but one record of every shared row (the row's owner, else the lowest id)
/// 3. drop records whose row is tagged with another id
/// 4. remove rows no record points at, highest first, re-sequencing after each
/// 5. drop postings of ids without a record
///
/// Passes repeat until row count equals record count.
pub struct Repairer {
    store: Arc<PodStore>,
    registry: Arc<dyn DocumentRegistry>,
    max_passes: usize,
}

impl Repairer {
    pub fn new(store: Arc<PodStore>, registry: Arc<dyn DocumentRegistry>, max_passes: usize) -> Self {
        Repairer {
            store,
            registry,
            max_passes: max_passes.max(1),
        }
    }

    /// Holds the pod's write lock for the whole run
    pub fn repair(&self, pod: &PodKey) -> Result<RepairReport> {
        let handle = match self.store.get(pod) {
            Ok(shard) => Some(shard),
            Err(e) if e.is_pod_not_found() => None,
            Err(e) => return Err(e),
        };
        let mut guard = handle.as_ref().map(|shard| shard.write());
        let mut shard: Option<&mut PodShard> = match guard.as_deref_mut() {
            Some(s) if !s.is_removed() => Some(s),
            _ => None,
        };

        let before = inspect(pod, shard.as_deref(), &self.registry.by_pod(pod)?);
        let mut report = RepairReport {
            pod: pod.clone(),
            passes: 0,
            dropped_records: Vec::new(),
            removed_rows: Vec::new(),
            removed_postings: Vec::new(),
            before: before.clone(),
            after: before.clone(),
        };

        let mut current = before;
        while !current.repair_complete() {
            if report.passes == self.max_passes {
                warn!(%pod, passes = report.passes, problems = current.problem_count(), "repair gave up");
                return Err(Error::inconsistent(format!(
                    "Pod {} still inconsistent after {} repair passes",
                    pod, report.passes
                )));
            }
            report.passes += 1;
            self.pass(pod, shard.as_deref_mut(), &current, &mut report)?;
            current = inspect(pod, shard.as_deref(), &self.registry.by_pod(pod)?);
        }

        report.after = current;
        if report.changed_anything() {
            info!(
                %pod,
                passes = report.passes,
                dropped_records = report.dropped_records.len(),
                removed_rows = report.removed_rows.len(),
                removed_postings = report.removed_postings.len(),
                without_postings = report.after.missing_postings.len(),
                "repaired pod"
            );
        } else {
            debug!(%pod, "nothing to repair");
        }
        Ok(report)
    }

    fn pass(
        &self,
        pod: &PodKey,
        mut shard: Option<&mut PodShard>,
        findings: &ConsistencyReport,
        report: &mut RepairReport,
    ) -> Result<()> {
        // 1-3: records
        let mut doomed: BTreeSet<DocId> = findings.out_of_range.iter().copied().collect();
        for duplicate in &findings.duplicate_rows {
            let owner = shard
                .as_deref()
                .and_then(|s| s.vectors().row(duplicate.row))
                .map(|row| row.doc_id)
                .filter(|owner| duplicate.ids.contains(owner));
            let keep = owner.unwrap_or(duplicate.ids[0]);
            doomed.extend(duplicate.ids.iter().copied().filter(|&id| id != keep));
        }
        doomed.extend(findings.misowned_rows.iter().map(|m| m.id));

        for id in &doomed {
            if let Some(record) = self.registry.delete(*id)? {
                info!(%pod, %id, url = %record.url, row = record.row, "dropped record");
                report.dropped_records.push(*id);
            }
        }

        let Some(shard) = shard.as_deref_mut() else {
            return Ok(());
        };

        // 4: rows nobody points at, recomputed after the drops above
        let records = self.registry.by_pod(pod)?;
        let referenced: BTreeSet<usize> = records.iter().map(|r| r.row).collect();
        let unreferenced: Vec<usize> = (0..shard.vectors().len())
            .filter(|row| !referenced.contains(row))
            .collect();

        for &row in unreferenced.iter().rev() {
            let removed = shard.vectors_mut().remove(row)?;
            let shifted = resequence_after_removal(self.registry.as_ref(), pod, row)?;
            info!(%pod, row, tagged = %removed.doc_id, shifted, "removed unreferenced row");
            report.removed_rows.push((row, removed.doc_id));
        }

        // 5: postings without a record
        let live: BTreeSet<DocId> = self.registry.by_pod(pod)?.iter().map(|r| r.id).collect();
        let orphans: Vec<DocId> = shard.index().doc_ids().filter(|id| !live.contains(id)).collect();
        for id in &orphans {
            let removed = shard.index_mut().remove(*id);
            debug!(%pod, %id, positions = removed.position_count(), "dropped orphan postings");
        }
        if !orphans.is_empty() {
            shard.persist_index()?;
            info!(%pod, count = orphans.len(), "dropped orphan postings");
            report.removed_postings.extend(orphans);
        }

        Ok(())
    }

    /// Repair each pod in turn; stops at the first pod that cannot be healed
    pub fn repair_all(&self, pods: &[PodKey]) -> Result<Vec<RepairReport>> {
        pods.iter().map(|pod| self.repair(pod)).collect()
    }
}
