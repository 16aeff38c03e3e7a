use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nest_control::{assign, AssignmentRecord, OrderingPlan, PriorityRule};
use nest_core::{StimulusGroupId, SubjectId};

fn assign_bench(c: &mut Criterion) {
    let plan = OrderingPlan::new(37, (0..102).map(StimulusGroupId::from_raw).collect())
        .with_prioritized(vec![PriorityRule {
            session_idx: None,
            round_id: Some(0),
            stimulusgroup_id: StimulusGroupId::from_raw(0),
        }])
        .with_blocklist(vec![StimulusGroupId::from_raw(0)]);
    let mut history = Vec::new();
    for idx in 0..200u64 {
        let subject = SubjectId::from_raw((idx % 40) as i64);
        let stimulusgroups = assign(&plan, subject, &history, idx).unwrap();
        history.push(AssignmentRecord {
            subject,
            stimulusgroups,
        });
    }

    c.bench_function("assign_with_history", |b| {
        b.iter(|| {
            black_box(assign(&plan, SubjectId::from_raw(7), &history, 42).unwrap());
        });
    });
}

criterion_group!(benches, assign_bench);
criterion_main!(benches);
