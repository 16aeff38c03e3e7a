#![allow(dead_code)]

use nest_control::{Assignment, AssignmentRecord, PriorityRule};
use nest_core::{StimulusGroupId, SubjectId};

pub fn sg(raw: i64) -> StimulusGroupId {
    StimulusGroupId::from_raw(raw)
}

pub fn pool(raw: &[i64]) -> Vec<StimulusGroupId> {
    raw.iter().copied().map(sg).collect()
}

pub fn rule(session_idx: Option<usize>, round_id: Option<u32>, stimulusgroup_id: i64) -> PriorityRule {
    PriorityRule {
        session_idx,
        round_id,
        stimulusgroup_id: sg(stimulusgroup_id),
    }
}

pub fn assignment(raw: &[i64]) -> Assignment {
    raw.iter()
        .enumerate()
        .map(|(round_id, id)| (round_id as u32, sg(*id)))
        .collect()
}

pub fn record(subject: i64, raw: &[i64]) -> AssignmentRecord {
    AssignmentRecord {
        subject: SubjectId::from_raw(subject),
        stimulusgroups: assignment(raw),
    }
}
