mod common;

use std::collections::{BTreeMap, BTreeSet};
use proptest::prelude::*;
use podsearch::registry::RecordFilter;
use podsearch::{PermissionClass, PodEngine, PodKey};
use common::{doc, open, pod, TERMS};

#[derive(Debug, Clone)]
enum Op {
    Index { url: usize, pod: usize, words: Vec<usize> },
    Delete { url: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..6usize, 0..2usize, prop::collection::vec(0..TERMS.len(), 1..5))
            .prop_map(|(url, pod, words)| Op::Index { url, pod, words }),
        1 => (0..6usize).prop_map(|url| Op::Delete { url }),
    ]
}

fn pods() -> [PodKey; 2] {
    [pod("ann", PermissionClass::User), pod("ann", PermissionClass::Others)]
}

fn body(words: &[usize]) -> String {
    words.iter().map(|&w| TERMS[w]).collect::<Vec<_>>().join(" ")
}

fn apply(engine: &PodEngine, op: &Op) {
    match op {
        Op::Index { url, pod, words } => {
            let pods = pods();
            engine.index_document(doc(&format!("/u{}", url), &pods[*pod], &body(words))).unwrap();
        }
        Op::Delete { url } => {
            // Deleting a url that is not indexed is allowed to fail
            let _ = engine.delete_url(&format!("/u{}", url));
        }
    }
}

/// url -> row for every live record of `pod`
fn rows_by_url(engine: &PodEngine, pod: &PodKey) -> BTreeMap<String, usize> {
    engine
        .registry()
        .by_pod(pod)
        .unwrap()
        .into_iter()
        .map(|r| (r.url, r.row))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_stores_stay_in_step(ops in prop::collection::vec(op(), 1..20)) {
        let dir = tempfile::tempdir().unwrap();
        let engine = open(&dir);
        for op in &ops {
            apply(&engine, op);
        }

        for pod in pods() {
            let records = engine.registry().by_pod(&pod).unwrap();
            let rows = engine.pod_stats(&pod).map(|s| s.rows).unwrap_or(0);
            prop_assert_eq!(rows, records.len());

            let distinct_rows: BTreeSet<usize> = records.iter().map(|r| r.row).collect();
            prop_assert_eq!(distinct_rows.len(), records.len());

            let report = engine.check(&pod).unwrap();
            prop_assert!(report.missing_postings.is_empty());
            prop_assert!(report.orphan_postings.is_empty());
            prop_assert!(report.is_consistent(), "{:?}", report);
        }

        let urls: BTreeSet<String> = engine
            .registry()
            .scan(&RecordFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.url)
            .collect();
        prop_assert_eq!(urls.len(), engine.registry().count().unwrap());
    }

    #[test]
    fn prop_delete_order_does_not_matter(
        count in 3..8usize,
        first in 0..8usize,
        second in 0..8usize,
    ) {
        let (first, second) = (first % count, second % count);
        prop_assume!(first != second);
        let p = pod("ann", PermissionClass::User);

        let run = |order: [usize; 2]| {
            let dir = tempfile::tempdir().unwrap();
            let engine = open(&dir);
            for i in 0..count {
                engine.index_document(doc(&format!("/d{}", i), &p, TERMS[i % TERMS.len()])).unwrap();
            }
            for i in order {
                engine.delete_url(&format!("/d{}", i)).unwrap();
            }
            rows_by_url(&engine, &p)
        };

        prop_assert_eq!(run([first, second]), run([second, first]));
    }

    #[test]
    fn prop_index_then_delete_restores_pod(
        existing in prop::collection::vec(prop::collection::vec(0..TERMS.len(), 1..4), 0..5),
        words in prop::collection::vec(0..TERMS.len(), 1..6),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let engine = open(&dir);
        let p = pod("ann", PermissionClass::User);
        for (i, words) in existing.iter().enumerate() {
            engine.index_document(doc(&format!("/e{}", i), &p, &body(words))).unwrap();
        }
        let before_rows = rows_by_url(&engine, &p);
        let before = engine.pod_stats(&p).ok();

        let added = engine.index_document(doc("/new", &p, &body(&words))).unwrap();
        let removed = engine.delete_document(added.id).unwrap();

        prop_assert_eq!(removed.resequenced, 0);
        prop_assert!(!removed.postings.is_empty());
        prop_assert_eq!(rows_by_url(&engine, &p), before_rows);
        let after = engine.pod_stats(&p).unwrap();
        match before {
            Some(before) => prop_assert_eq!(after, before),
            None => prop_assert_eq!((after.rows, after.postings), (0, 0)),
        }
    }
}
