mod common;

use common::{pool, record, rule, sg};
use nest_control::{assign, OrderingPlan};
use nest_core::SubjectId;

fn subject() -> SubjectId {
    SubjectId::from_raw(1)
}

#[test]
fn zero_rounds_is_a_config_error() {
    let plan = OrderingPlan::new(0, pool(&[0, 1]));
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "assign.rounds_per_session");
}

#[test]
fn duplicate_pool_entries_are_rejected() {
    let plan = OrderingPlan::new(2, pool(&[0, 1, 0]));
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert_eq!(err.info().code, "assign.duplicate_stimulusgroup");
}

#[test]
fn rule_outside_round_range_is_rejected() {
    let plan = OrderingPlan::new(4, pool(&[0, 1])).with_prioritized(vec![rule(None, Some(4), 0)]);
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "assign.rule_round");
    assert_eq!(err.info().context["round_id"], "4");
}

#[test]
fn rule_with_unknown_group_is_rejected() {
    let plan = OrderingPlan::new(4, pool(&[0, 1])).with_prioritized(vec![rule(None, Some(0), 9)]);
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert_eq!(err.info().code, "assign.rule_stimulusgroup");
}

#[test]
fn unknown_blocklist_entry_is_rejected() {
    let plan = OrderingPlan::new(4, pool(&[0, 1])).with_blocklist(vec![sg(5)]);
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert_eq!(err.info().code, "assign.blocklist");
}

#[test]
fn exhausted_blocklist_is_a_config_error() {
    let plan = OrderingPlan::new(3, pool(&[0, 1])).with_blocklist(vec![sg(0), sg(1)]);
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "assign.blocklist_exhausted");
}

#[test]
fn full_blocklist_is_fine_when_rules_fill_every_round() {
    let plan = OrderingPlan::new(2, pool(&[0, 1]))
        .with_prioritized(vec![rule(None, Some(0), 1), rule(None, None, 0)])
        .with_blocklist(vec![sg(0), sg(1)]);
    let got = assign(&plan, subject(), &[], 0).expect("assign");
    assert_eq!(got[&0], sg(1));
    assert_eq!(got[&1], sg(0));
}

#[test]
fn history_with_unknown_group_is_an_integrity_error() {
    let plan = OrderingPlan::new(2, pool(&[0, 1]));
    let history = vec![record(3, &[0, 7])];
    let err = assign(&plan, subject(), &history, 0).unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(err.info().code, "weights.unknown_stimulusgroup");
}

#[test]
fn too_many_pooled_rules_leave_groups_behind() {
    let plan = OrderingPlan::new(2, pool(&[0, 1])).with_prioritized(vec![rule(None, None, 0); 3]);
    let err = assign(&plan, subject(), &[], 0).unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(err.info().code, "assign.pool_leftover");
}
