mod common;

use std::collections::BTreeMap;

use common::{rule, sg};
use nest_control::{assign, AssignmentRecord, OrderingPlan};
use nest_core::SubjectId;

fn run(plan: &OrderingPlan, subjects: &[i64]) -> Vec<AssignmentRecord> {
    let mut history = Vec::new();
    for (idx, raw) in subjects.iter().enumerate() {
        let subject = SubjectId::from_raw(*raw);
        let stimulusgroups = assign(plan, subject, &history, idx as u64).expect("assign");
        history.push(AssignmentRecord {
            subject,
            stimulusgroups,
        });
    }
    history
}

fn counts(history: &[AssignmentRecord]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for record in history {
        for id in record.stimulusgroups.values() {
            *counts.entry(id.as_raw()).or_insert(0) += 1;
        }
    }
    counts
}

#[test]
fn distinct_subjects_cover_the_pool_evenly() {
    let plan = OrderingPlan::new(5, (0..10).map(sg).collect());
    let subjects: Vec<i64> = (1..=10).collect();
    let history = run(&plan, &subjects);
    let counts = counts(&history);
    assert_eq!(counts.len(), 10);
    assert!(counts.values().all(|count| *count == 5));
}

#[test]
fn returning_subjects_stay_balanced() {
    let plan = OrderingPlan::new(37, (0..102).map(sg).collect())
        .with_prioritized(vec![
            rule(None, Some(0), 0),
            rule(None, Some(5), 1),
            rule(None, Some(10), 1),
        ])
        .with_blocklist(vec![sg(0), sg(1)]);
    let subjects: Vec<i64> = (1..=24).cycle().take(72).collect();
    let history = run(&plan, &subjects);
    let counts = counts(&history);

    assert_eq!(counts[&0], 72);
    assert_eq!(counts[&1], 144);
    for id in 2..102 {
        let count = counts.get(&id).copied().unwrap_or(0);
        assert!((24..=25).contains(&count), "group {id} shown {count} times");
    }

    for raw in 1..=24 {
        let mut seen: BTreeMap<i64, usize> = BTreeMap::new();
        for record in history.iter().filter(|r| r.subject.as_raw() == raw) {
            for id in record.stimulusgroups.values().filter(|id| id.as_raw() > 1) {
                *seen.entry(id.as_raw()).or_insert(0) += 1;
            }
        }
        assert!(seen.values().all(|count| *count <= 2), "subject {raw} repeats too often");
    }
}
