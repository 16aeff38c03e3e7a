mod common;

use common::{assignment, controller, FIRST};
use nest_control::{SessionStatus, StepContext};
use nest_core::{NestError, SessionId, StimulusVoteGroupId};
use nest_store::{find_or_create_subject, ExperimentController};

fn svg(raw: i64) -> StimulusVoteGroupId {
    StimulusVoteGroupId::from_raw(raw)
}

// Every stimulus group of the fixture holds the vote group with the same id.
fn vote_all(controller: &mut ExperimentController, session: SessionId) {
    for (round_id, sg) in controller.session_assignment(session).expect("assignment") {
        controller
            .record_vote(session, round_id, svg(sg.as_raw()), 4.0)
            .expect("vote");
    }
}

#[test]
fn status_moves_from_initialized_to_finished() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    assert_eq!(controller.session_status(session).unwrap(), SessionStatus::Initialized);

    controller.record_vote(session, 0, svg(0), 5.0).expect("first vote");
    assert_eq!(controller.session_status(session).unwrap(), SessionStatus::PartiallyFinished);

    for (round_id, sg) in assignment(&FIRST).into_iter().skip(1) {
        controller
            .record_vote(session, round_id, svg(sg.as_raw()), 3.0)
            .expect("vote");
    }
    assert_eq!(controller.session_status(session).unwrap(), SessionStatus::Finished);
}

#[test]
fn second_vote_for_a_target_is_rejected() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    controller.record_vote(session, 0, svg(0), 5.0).expect("vote");
    let err = controller.record_vote(session, 0, svg(0), 4.0).unwrap_err();
    assert!(err.is_integrity());
    assert_eq!(err.info().code, "nest_store.duplicate_vote");
}

#[test]
fn raw_duplicate_votes_surface_as_integrity_errors() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    controller.record_vote(session, 0, svg(0), 5.0).expect("vote");
    controller
        .connection()
        .execute(
            "INSERT INTO votes(round_pk, stimulusvotegroup_id, score, vote_scale, created)
             SELECT id, stimulusgroup_id, 2, 'FIVE_POINT', 'now' FROM rounds
             WHERE session_id = ? AND round_id = 0",
            [session.as_raw()],
        )
        .expect("raw insert");
    let err = controller.session_status(session).unwrap_err();
    assert_eq!(err.info().code, "status.duplicate_vote");
}

#[test]
fn votes_outside_scale_or_round_are_rejected() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");

    let err = controller.record_vote(session, 0, svg(0), 6.0).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "nest_store.vote_scale");
    let err = controller.record_vote(session, 0, svg(0), 0.0).unwrap_err();
    assert_eq!(err.info().code, "nest_store.vote_scale");

    let err = controller.record_vote(session, 0, svg(3), 3.0).unwrap_err();
    assert_eq!(err.info().code, "nest_store.vote_target");
    let err = controller.record_vote(session, 8, svg(0), 3.0).unwrap_err();
    assert_eq!(err.info().code, "nest_store.round_not_found");
    assert_eq!(controller.session_status(session).unwrap(), SessionStatus::Initialized);
}

#[test]
fn unknown_sessions_are_storage_errors() {
    let mut controller = controller();
    let missing = SessionId::from_raw(42);
    let err = controller.session_status(missing).unwrap_err();
    assert!(matches!(err, NestError::Storage(_)));
    assert_eq!(err.info().code, "nest_store.session_not_found");
    assert!(controller.delete_session(missing).is_err());
}

#[test]
fn deleting_a_session_removes_rounds_and_votes() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    vote_all(&mut controller, session);
    controller.delete_session(session).expect("delete");

    assert!(controller.sessions().expect("sessions").is_empty());
    let conn = controller.connection();
    let rounds: i64 = conn
        .query_row("SELECT COUNT(*) FROM rounds", [], |row| row.get(0))
        .expect("rounds");
    let votes: i64 = conn
        .query_row("SELECT COUNT(*) FROM votes", [], |row| row.get(0))
        .expect("votes");
    assert_eq!((rounds, votes), (0, 0));
}

#[test]
fn reset_clears_votes_and_keeps_rounds() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    vote_all(&mut controller, session);
    assert_eq!(controller.reset_session(session).expect("reset"), 8);
    assert_eq!(controller.session_status(session).unwrap(), SessionStatus::Initialized);
    assert_eq!(controller.session_assignment(session).unwrap(), assignment(&FIRST));
}

#[test]
fn reset_unfinished_requires_a_partial_session() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    let err = controller.reset_unfinished_session(session).unwrap_err();
    assert_eq!(err.info().code, "nest_store.reset_status");

    controller.record_vote(session, 3, svg(3), 2.0).expect("vote");
    assert_eq!(controller.reset_unfinished_session(session).expect("reset"), 1);
    assert_eq!(controller.session_status(session).unwrap(), SessionStatus::Initialized);

    vote_all(&mut controller, session);
    assert!(controller.reset_unfinished_session(session).is_err());
}

#[test]
fn sessions_can_change_hands() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    let bob = find_or_create_subject(controller.connection(), "bob").expect("bob");
    controller.reassign_subject(session, bob).expect("reassign");
    assert_eq!(controller.sessions().unwrap()[0].subject, bob);
    assert_eq!(controller.session_info(session).unwrap().subject, "bob");
}

#[test]
fn response_times_are_stored_per_round() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    controller.record_response_time(session, 2, 7.5).expect("time");
    let err = controller.record_response_time(session, 2, -1.0).unwrap_err();
    assert_eq!(err.info().code, "nest_store.response_sec");
    let info = controller.session_info(session).expect("info");
    assert_eq!(info.rounds[2].response_sec, Some(7.5));
    assert_eq!(info.rounds[1].response_sec, None);
}

#[test]
fn steps_wrap_rounds_with_additions() {
    let mut controller = controller();
    let session = controller.add_session_for("alice").expect("session");
    let steps = controller.session_steps(session).expect("steps");
    assert_eq!(steps.len(), 10);
    assert!(!steps[0].is_round());
    assert!(!steps[9].is_round());
    match (&steps[0].context, &steps[9].context) {
        (StepContext::Addition(first), StepContext::Addition(last)) => {
            assert_eq!(first.title.as_deref(), Some("Instructions"));
            assert_eq!(last.title.as_deref(), Some("Thank you"));
        }
        other => panic!("unexpected step contexts: {other:?}"),
    }
    let rounds: Vec<u32> = steps.iter().filter(|s| s.is_round()).map(|s| s.round_id()).collect();
    assert_eq!(rounds, (0..8).collect::<Vec<_>>());
}
