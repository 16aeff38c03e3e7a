//! Session completion state derived from persisted rounds and votes.

use std::fmt;

use nest_core::{ErrorInfo, NestError, RoundId, StimulusVoteGroupId};
use serde::{Deserialize, Serialize};

/// Completion state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// No rounds exist yet.
    Uninitialized,
    /// Some but not all rounds exist.
    PartiallyInitialized,
    /// All rounds exist and nothing has been voted.
    Initialized,
    /// Some vote targets have a vote, others do not.
    PartiallyFinished,
    /// Every vote target has exactly one vote.
    Finished,
}

impl SessionStatus {
    /// Stable uppercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Uninitialized => "UNINITIALIZED",
            SessionStatus::PartiallyInitialized => "PARTIALLY_INITIALIZED",
            SessionStatus::Initialized => "INITIALIZED",
            SessionStatus::PartiallyFinished => "PARTIALLY_FINISHED",
            SessionStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of votes cast for one stimulus-vote-group of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Vote target.
    pub stimulusvotegroup_id: StimulusVoteGroupId,
    /// Votes recorded against it in this round.
    pub votes: usize,
}

/// Persisted round with the vote tallies of its group's vote targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTally {
    /// Round position.
    pub round_id: RoundId,
    /// One entry per stimulus-vote-group reachable from the round's group.
    pub tallies: Vec<VoteTally>,
}

/// Derives the status of a session from its rounds.
pub fn evaluate_status(
    rounds_per_session: u32,
    rounds: &[RoundTally],
) -> Result<SessionStatus, NestError> {
    let mut existing = vec![false; rounds_per_session as usize];
    for round in rounds {
        match existing.get_mut(round.round_id as usize) {
            Some(slot) => *slot = true,
            None => {
                return Err(NestError::Integrity(
                    ErrorInfo::new("status.round_range", "round id outside the session range")
                        .with_context("round_id", round.round_id)
                        .with_context("rounds_per_session", rounds_per_session),
                ))
            }
        }
    }
    if !existing.iter().all(|present| *present) {
        return Ok(if existing.iter().any(|present| *present) {
            SessionStatus::PartiallyInitialized
        } else {
            SessionStatus::Uninitialized
        });
    }

    let mut seen_empty = false;
    let mut seen_voted = false;
    for round in rounds {
        for tally in &round.tallies {
            match tally.votes {
                0 => seen_empty = true,
                1 => seen_voted = true,
                count => {
                    return Err(NestError::Integrity(
                        ErrorInfo::new("status.duplicate_vote", "more than one vote for a vote target")
                            .with_context("round_id", round.round_id)
                            .with_context("stimulusvotegroup_id", tally.stimulusvotegroup_id)
                            .with_context("votes", count),
                    ))
                }
            }
            if seen_empty && seen_voted {
                return Ok(SessionStatus::PartiallyFinished);
            }
        }
    }
    Ok(if seen_voted {
        SessionStatus::Finished
    } else {
        SessionStatus::Initialized
    })
}
