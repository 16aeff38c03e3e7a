use nest_config::StimulusConfig;
use nest_core::{RoundId, SessionId, StimulusGroupId, StimulusVoteGroupId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub stimulusvotegroup_id: StimulusVoteGroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub round_id: RoundId,
    pub stimulusgroup_id: StimulusGroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_sec: Option<f64>,
    pub stimulusvotegroups: Vec<VoteInfo>,
}

/// Snapshot of one session: who took it, what each round showed and how it
/// was voted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub subject: String,
    pub seed: u64,
    pub rounds: Vec<RoundInfo>,
}

/// Compact snapshot of a whole experiment, the input of every export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentInfo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub sessions: Vec<SessionInfo>,
    pub stimuli_info: StimulusConfig,
}
