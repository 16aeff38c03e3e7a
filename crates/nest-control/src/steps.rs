//! Ordered session steps: rounds interleaved with configured additions.

use std::collections::BTreeMap;

use nest_core::{ErrorInfo, NestError, RoundId, StimulusGroupId};
use serde::{Deserialize, Serialize};

/// Side of a round an addition is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Shown before the round.
    Before,
    /// Shown after the round.
    After,
}

/// Where an addition is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionPosition {
    /// Anchor round.
    pub round_id: RoundId,
    /// Side of the anchor.
    pub before_or_after: Placement,
}

/// Content of an extra (non-voting) step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionContext {
    /// Heading shown on the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_html: Option<String>,
    /// Markup for the step's controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions_html: Option<String>,
}

/// Configured extra step such as an instruction page or a survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addition {
    /// Anchor of the addition.
    pub position: AdditionPosition,
    /// Content of the addition.
    #[serde(default)]
    pub context: AdditionContext,
}

/// Position of a step in the merged sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPosition {
    /// Round the step belongs to or is anchored on.
    pub round_id: RoundId,
    /// Set for additions only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_or_after: Option<Placement>,
}

/// Payload of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepContext {
    /// A voting round showing one stimulus group.
    Round {
        /// Group shown in the round.
        stimulusgroup_id: StimulusGroupId,
    },
    /// An extra step.
    Addition(AdditionContext),
}

/// One entry of a session's step sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Where the step sits.
    pub position: StepPosition,
    /// What the step shows.
    pub context: StepContext,
}

impl Step {
    /// Creates a round step.
    pub fn round(round_id: RoundId, stimulusgroup_id: StimulusGroupId) -> Self {
        Self {
            position: StepPosition {
                round_id,
                before_or_after: None,
            },
            context: StepContext::Round { stimulusgroup_id },
        }
    }

    /// Creates the step inserted for `addition`.
    pub fn from_addition(addition: &Addition) -> Self {
        Self {
            position: StepPosition {
                round_id: addition.position.round_id,
                before_or_after: Some(addition.position.before_or_after),
            },
            context: StepContext::Addition(addition.context.clone()),
        }
    }

    /// Round the step belongs to.
    pub fn round_id(&self) -> RoundId {
        self.position.round_id
    }

    /// Returns `true` for round steps.
    pub fn is_round(&self) -> bool {
        matches!(self.context, StepContext::Round { .. })
    }

    fn is_before_addition(&self) -> bool {
        self.position.before_or_after == Some(Placement::Before)
    }
}

fn misplaced(addition: &Addition, message: &str) -> NestError {
    let placement = match addition.position.before_or_after {
        Placement::Before => "before",
        Placement::After => "after",
    };
    NestError::Config(
        ErrorInfo::new("steps.addition_position", message)
            .with_context("round_id", addition.position.round_id)
            .with_context("before_or_after", placement),
    )
}

/// Inserts `addition` into `steps` at its anchored position.
///
/// `before` lands after any earlier `before` additions of the same round and
/// right ahead of the round step. `after` lands right ahead of the first step
/// of the next round, or at the tail when anchored on the last round.
pub fn insert_addition(steps: &mut Vec<Step>, addition: &Addition) -> Result<(), NestError> {
    let target = addition.position.round_id;
    match addition.position.before_or_after {
        Placement::Before => {
            let pos = steps
                .iter()
                .position(|step| {
                    !(step.round_id() < target || (step.round_id() == target && step.is_before_addition()))
                })
                .ok_or_else(|| misplaced(addition, "addition anchored past the last round"))?;
            if steps[pos].round_id() != target {
                return Err(misplaced(addition, "addition anchored on a missing round"));
            }
            steps.insert(pos, Step::from_addition(addition));
        }
        Placement::After => {
            let next = u64::from(target) + 1;
            match steps.iter().position(|step| u64::from(step.round_id()) >= next) {
                Some(0) => return Err(misplaced(addition, "addition would precede every round")),
                Some(pos) => {
                    if u64::from(steps[pos].round_id()) != next {
                        return Err(misplaced(addition, "addition anchored on a missing round"));
                    }
                    steps.insert(pos, Step::from_addition(addition));
                }
                None => {
                    let anchored_on_tail = steps.last().map_or(false, |last| last.round_id() == target);
                    if !anchored_on_tail {
                        return Err(misplaced(addition, "addition anchored past the last round"));
                    }
                    steps.push(Step::from_addition(addition));
                }
            }
        }
    }
    Ok(())
}

/// Builds the step sequence of a session from its assignment and the
/// configured additions, applied in order.
pub fn build_steps(
    assignment: &BTreeMap<RoundId, StimulusGroupId>,
    additions: &[Addition],
) -> Result<Vec<Step>, NestError> {
    let mut steps = Vec::with_capacity(assignment.len() + additions.len());
    for (expected, (round_id, stimulusgroup_id)) in assignment.iter().enumerate() {
        if *round_id as usize != expected {
            return Err(NestError::Config(
                ErrorInfo::new("steps.round_gap", "round ids must be contiguous from 0")
                    .with_context("expected", expected)
                    .with_context("round_id", round_id),
            ));
        }
        steps.push(Step::round(*round_id, *stimulusgroup_id));
    }
    for addition in additions {
        insert_addition(&mut steps, addition)?;
    }
    Ok(steps)
}
