//! Round to stimulus-group assignment for new sessions.

use std::collections::{BTreeMap, BTreeSet};

use nest_core::{ErrorInfo, NestError, RngHandle, RoundId, StimulusGroupId, SubjectId};
use serde::{Deserialize, Serialize};

use crate::weights::WeightHistogram;

/// Extra weight a subject's own exposure to a group carries over everyone else's.
pub const SUBJECT_WEIGHT: u64 = 5;

/// Complete round to stimulus-group mapping of one session.
pub type Assignment = BTreeMap<RoundId, StimulusGroupId>;

/// Fixed override applied while scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    /// Zero based session index the rule applies to; `None` applies to all.
    #[serde(default)]
    pub session_idx: Option<usize>,
    /// Round to pin the group to; `None` places it anywhere in the session.
    #[serde(default)]
    pub round_id: Option<RoundId>,
    /// Group forced into the session.
    pub stimulusgroup_id: StimulusGroupId,
}

impl PriorityRule {
    /// Returns `true` when the rule applies to the session at `session_idx`.
    pub fn applies_to(&self, session_idx: usize) -> bool {
        self.session_idx.map_or(true, |idx| idx == session_idx)
    }
}

/// Assignment committed for an earlier session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    /// Subject the session belonged to.
    pub subject: SubjectId,
    /// Groups shown in that session by round.
    pub stimulusgroups: Assignment,
}

/// Static scheduling inputs of an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingPlan {
    /// Number of rounds every session holds.
    pub rounds_per_session: u32,
    /// Ordered pool of schedulable groups.
    pub stimulusgroup_ids: Vec<StimulusGroupId>,
    /// Overrides, in configured order.
    #[serde(default)]
    pub prioritized: Vec<PriorityRule>,
    /// Groups never chosen by the balancing fill.
    #[serde(default)]
    pub blocklist: Vec<StimulusGroupId>,
}

impl OrderingPlan {
    /// Creates a plan without overrides or blocklist.
    pub fn new(rounds_per_session: u32, stimulusgroup_ids: Vec<StimulusGroupId>) -> Self {
        Self {
            rounds_per_session,
            stimulusgroup_ids,
            prioritized: Vec::new(),
            blocklist: Vec::new(),
        }
    }

    /// Replaces the priority rules.
    pub fn with_prioritized(mut self, prioritized: Vec<PriorityRule>) -> Self {
        self.prioritized = prioritized;
        self
    }

    /// Replaces the blocklist.
    pub fn with_blocklist(mut self, blocklist: Vec<StimulusGroupId>) -> Self {
        self.blocklist = blocklist;
        self
    }

    /// Maps every pooled group to its position, rejecting duplicates.
    pub fn pool_index(&self) -> Result<BTreeMap<StimulusGroupId, usize>, NestError> {
        let mut index = BTreeMap::new();
        for (idx, id) in self.stimulusgroup_ids.iter().enumerate() {
            if index.insert(*id, idx).is_some() {
                return Err(NestError::Config(
                    ErrorInfo::new("assign.duplicate_stimulusgroup", "stimulus group pooled twice")
                        .with_context("stimulusgroup_id", id),
                ));
            }
        }
        Ok(index)
    }

    /// Checks the plan against its own pool.
    pub fn validate(&self) -> Result<(), NestError> {
        if self.rounds_per_session == 0 {
            return Err(NestError::config(
                "assign.rounds_per_session",
                "rounds_per_session must be at least 1",
            ));
        }
        if self.stimulusgroup_ids.is_empty() {
            return Err(NestError::config(
                "assign.empty_pool",
                "no stimulus groups to schedule",
            ));
        }
        let index = self.pool_index()?;
        for (rule_idx, rule) in self.prioritized.iter().enumerate() {
            if let Some(round_id) = rule.round_id {
                if round_id >= self.rounds_per_session {
                    return Err(NestError::Config(
                        ErrorInfo::new("assign.rule_round", "priority rule targets a missing round")
                            .with_context("rule", rule_idx)
                            .with_context("round_id", round_id)
                            .with_context("rounds_per_session", self.rounds_per_session),
                    ));
                }
            }
            if !index.contains_key(&rule.stimulusgroup_id) {
                return Err(NestError::Config(
                    ErrorInfo::new("assign.rule_stimulusgroup", "priority rule names an unknown group")
                        .with_context("rule", rule_idx)
                        .with_context("stimulusgroup_id", rule.stimulusgroup_id),
                ));
            }
        }
        for id in &self.blocklist {
            if !index.contains_key(id) {
                return Err(NestError::Config(
                    ErrorInfo::new("assign.blocklist", "blocklist names an unknown group")
                        .with_context("stimulusgroup_id", id),
                ));
            }
        }
        Ok(())
    }
}

fn position(index: &BTreeMap<StimulusGroupId, usize>, id: StimulusGroupId) -> Result<usize, NestError> {
    index.get(&id).copied().ok_or_else(|| {
        NestError::Config(
            ErrorInfo::new("assign.unknown_stimulusgroup", "stimulus group outside the pool")
                .with_context("stimulusgroup_id", id),
        )
    })
}

/// Computes the assignment of a new session for `subject`.
///
/// `history` lists committed sessions in creation order; its length is the
/// new session's index. The same plan, subject, history and seed always
/// produce the same assignment.
pub fn assign(
    plan: &OrderingPlan,
    subject: SubjectId,
    history: &[AssignmentRecord],
    seed: u64,
) -> Result<Assignment, NestError> {
    plan.validate()?;
    let index = plan.pool_index()?;
    let mut weights = WeightHistogram::from_history(&index, subject, history)?;

    let session_idx = history.len();
    let mut fixed = Assignment::new();
    let mut pending: Vec<StimulusGroupId> = Vec::new();
    for rule in plan.prioritized.iter().filter(|rule| rule.applies_to(session_idx)) {
        match rule.round_id {
            Some(round_id) => {
                fixed.insert(round_id, rule.stimulusgroup_id);
            }
            None => pending.push(rule.stimulusgroup_id),
        }
    }
    for id in fixed.values().chain(pending.iter()) {
        weights.bump(position(&index, *id)?, SUBJECT_WEIGHT + 1);
    }

    let mut rng = RngHandle::from_seed(seed);
    let blocked = plan
        .blocklist
        .iter()
        .map(|id| position(&index, *id))
        .collect::<Result<BTreeSet<_>, _>>()?;
    let remaining = (plan.rounds_per_session as usize).saturating_sub(fixed.len() + pending.len());
    let mut candidates: Vec<usize> = Vec::new();
    for _ in 0..remaining {
        if candidates.is_empty() {
            candidates.extend((0..plan.stimulusgroup_ids.len()).filter(|idx| !blocked.contains(idx)));
            if candidates.is_empty() {
                return Err(NestError::Config(
                    ErrorInfo::new("assign.blocklist_exhausted", "blocklist removes every stimulus group")
                        .with_context("blocked", blocked.len())
                        .with_hint("shrink blocklist_stimulusgroup_ids or add stimulus groups"),
                ));
            }
        }
        let ties = weights.argmin(&candidates);
        let chosen = match ties.as_slice() {
            [only] => *only,
            _ => ties[rng.index(ties.len())],
        };
        pending.push(plan.stimulusgroup_ids[chosen]);
        weights.bump(chosen, SUBJECT_WEIGHT + 1);
        candidates.retain(|&idx| idx != chosen);
    }

    rng.shuffle(&mut pending);
    let mut queue = pending.into_iter();
    let mut assignment = fixed;
    for round_id in 0..plan.rounds_per_session {
        if assignment.contains_key(&round_id) {
            continue;
        }
        let id = queue.next().ok_or_else(|| {
            NestError::Integrity(
                ErrorInfo::new("assign.pool_short", "not enough groups to fill every round")
                    .with_context("round_id", round_id),
            )
        })?;
        assignment.insert(round_id, id);
    }
    let leftover = queue.count();
    if leftover > 0 {
        return Err(NestError::Integrity(
            ErrorInfo::new("assign.pool_leftover", "pending groups left after filling every round")
                .with_context("leftover", leftover)
                .with_hint("priority rules place more groups than rounds_per_session"),
        ));
    }
    Ok(assignment)
}
