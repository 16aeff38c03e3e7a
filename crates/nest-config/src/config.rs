//! Experiment and stimulus configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use nest_control::{Addition, OrderingPlan, PriorityRule};
use nest_core::{
    ErrorInfo, NestError, RoundId, StimulusGroupId, StimulusId, StimulusVoteGroupId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::serde::load_path;
use crate::vote::{Methodology, VoteScale};

/// A source content several stimuli are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Content identifier.
    pub content_id: i64,
    /// Display name.
    pub name: String,
}

/// One media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusEntry {
    /// Stimulus identifier.
    pub stimulus_id: StimulusId,
    /// URL or media path.
    pub path: String,
    /// Media type, e.g. `video/mp4`.
    #[serde(rename = "type")]
    pub media_type: String,
    /// Content the stimulus is derived from.
    pub content_id: i64,
}

/// One or two stimuli voted on together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusVoteGroupEntry {
    /// Vote group identifier.
    pub stimulusvotegroup_id: StimulusVoteGroupId,
    /// Member stimuli; the second one is the reference in paired tests.
    pub stimulus_ids: Vec<StimulusId>,
}

/// Vote groups shown together in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusGroupEntry {
    /// Group identifier.
    pub stimulusgroup_id: StimulusGroupId,
    /// Vote groups of the round.
    pub stimulusvotegroup_ids: Vec<StimulusVoteGroupId>,
    /// Share of the canvas used for playback, `1..=100`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_display_percentage: Option<u32>,
    /// Message shown before playback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_message: Option<String>,
    /// Parent group for hierarchical designs. Carried, not scheduled on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_stimulusgroup_id: Option<i64>,
}

impl StimulusGroupEntry {
    /// Display percentage, defaulting to the full canvas.
    pub fn display_percentage(&self) -> u32 {
        self.video_display_percentage.unwrap_or(100)
    }
}

/// The stimulus tables of an experiment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusConfig {
    /// Contents.
    pub contents: Vec<ContentEntry>,
    /// Stimuli.
    pub stimuli: Vec<StimulusEntry>,
    /// Vote groups.
    pub stimulusvotegroups: Vec<StimulusVoteGroupEntry>,
    /// Stimulus groups, in pool order.
    pub stimulusgroups: Vec<StimulusGroupEntry>,
}

fn config_error(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
}

fn unique<T: Ord + Copy + std::fmt::Display>(
    ids: impl IntoIterator<Item = T>,
    code: &str,
) -> Result<BTreeSet<T>, NestError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(NestError::Config(
                config_error(code, "identifier declared twice").with_context("id", id),
            ));
        }
    }
    Ok(seen)
}

impl StimulusConfig {
    /// Ordered pool of stimulus group ids.
    pub fn stimulusgroup_ids(&self) -> Vec<StimulusGroupId> {
        self.stimulusgroups.iter().map(|sg| sg.stimulusgroup_id).collect()
    }

    /// Looks up a stimulus group entry.
    pub fn stimulusgroup(&self, id: StimulusGroupId) -> Option<&StimulusGroupEntry> {
        self.stimulusgroups.iter().find(|sg| sg.stimulusgroup_id == id)
    }

    /// Vote groups keyed by id.
    pub fn stimulusvotegroup_map(&self) -> BTreeMap<StimulusVoteGroupId, &StimulusVoteGroupEntry> {
        self.stimulusvotegroups
            .iter()
            .map(|svg| (svg.stimulusvotegroup_id, svg))
            .collect()
    }

    /// Stimuli keyed by id.
    pub fn stimulus_map(&self) -> BTreeMap<StimulusId, &StimulusEntry> {
        self.stimuli.iter().map(|s| (s.stimulus_id, s)).collect()
    }

    /// Checks identifiers are unique and every reference resolves.
    pub fn validate(&self) -> Result<(), NestError> {
        let contents = unique(self.contents.iter().map(|c| c.content_id), "config.content_id")?;
        let stimuli = unique(self.stimuli.iter().map(|s| s.stimulus_id), "config.stimulus_id")?;
        for stimulus in &self.stimuli {
            if !contents.contains(&stimulus.content_id) {
                return Err(NestError::Config(
                    config_error("config.stimulus_content", "stimulus references an unknown content")
                        .with_context("stimulus_id", stimulus.stimulus_id)
                        .with_context("content_id", stimulus.content_id),
                ));
            }
        }

        let svgs = unique(
            self.stimulusvotegroups.iter().map(|svg| svg.stimulusvotegroup_id),
            "config.stimulusvotegroup_id",
        )?;
        for svg in &self.stimulusvotegroups {
            if !(1..=2).contains(&svg.stimulus_ids.len()) {
                return Err(NestError::Config(
                    config_error("config.stimulusvotegroup_arity", "vote groups hold one or two stimuli")
                        .with_context("stimulusvotegroup_id", svg.stimulusvotegroup_id)
                        .with_context("stimuli", svg.stimulus_ids.len()),
                ));
            }
            if let Some(missing) = svg.stimulus_ids.iter().find(|id| !stimuli.contains(id)) {
                return Err(NestError::Config(
                    config_error("config.stimulusvotegroup_stimulus", "vote group references an unknown stimulus")
                        .with_context("stimulusvotegroup_id", svg.stimulusvotegroup_id)
                        .with_context("stimulus_id", missing),
                ));
            }
        }

        unique(self.stimulusgroups.iter().map(|sg| sg.stimulusgroup_id), "config.stimulusgroup_id")?;
        let mut owner: BTreeMap<StimulusVoteGroupId, StimulusGroupId> = BTreeMap::new();
        for sg in &self.stimulusgroups {
            if sg.stimulusvotegroup_ids.is_empty() {
                return Err(NestError::Config(
                    config_error("config.stimulusgroup_empty", "stimulus group has no vote groups")
                        .with_context("stimulusgroup_id", sg.stimulusgroup_id),
                ));
            }
            for svg_id in &sg.stimulusvotegroup_ids {
                if !svgs.contains(svg_id) {
                    return Err(NestError::Config(
                        config_error("config.stimulusgroup_svg", "stimulus group references an unknown vote group")
                            .with_context("stimulusgroup_id", sg.stimulusgroup_id)
                            .with_context("stimulusvotegroup_id", svg_id),
                    ));
                }
                if let Some(previous) = owner.insert(*svg_id, sg.stimulusgroup_id) {
                    return Err(NestError::Config(
                        config_error("config.stimulusgroup_shared_svg", "vote group belongs to two stimulus groups")
                            .with_context("stimulusvotegroup_id", svg_id)
                            .with_context("first", previous)
                            .with_context("second", sg.stimulusgroup_id),
                    ));
                }
            }
            if let Some(pct) = sg.video_display_percentage {
                if pct == 0 || pct > 100 {
                    return Err(NestError::Config(
                        config_error("config.video_display_percentage", "display percentage must be in 1..=100")
                            .with_context("stimulusgroup_id", sg.stimulusgroup_id)
                            .with_context("value", pct),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Experiment level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Unique experiment title.
    pub title: String,
    /// Free text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Rounds in every session.
    pub rounds_per_session: u32,
    /// Seed of the session seed stream; `None` draws from OS entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Scale votes are recorded on.
    pub vote_scale: VoteScale,
    /// Test methodology.
    pub methodology: Methodology,
    /// Scheduling overrides.
    #[serde(default)]
    pub prioritized: Vec<PriorityRule>,
    /// Groups the balancing fill never picks.
    #[serde(default)]
    pub blocklist_stimulusgroup_ids: Vec<StimulusGroupId>,
    /// Rounds presented as training.
    #[serde(default)]
    pub training_round_ids: Vec<RoundId>,
    /// Extra non-voting steps.
    #[serde(default)]
    pub additions: Vec<Addition>,
    /// Opaque rendering settings for round pages.
    #[serde(default)]
    pub round_context: BTreeMap<String, Value>,
    /// Opaque rendering settings for the final page.
    #[serde(default)]
    pub done_context: BTreeMap<String, Value>,
}

impl ExperimentConfig {
    /// Projects the scheduling inputs over `stimuli`.
    pub fn ordering_plan(&self, stimuli: &StimulusConfig) -> OrderingPlan {
        OrderingPlan::new(self.rounds_per_session, stimuli.stimulusgroup_ids())
            .with_prioritized(self.prioritized.clone())
            .with_blocklist(self.blocklist_stimulusgroup_ids.clone())
    }

    /// Returns `true` when `round_id` is a training round.
    pub fn is_training_round(&self, round_id: RoundId) -> bool {
        self.training_round_ids.contains(&round_id)
    }

    /// Checks the settings against `stimuli`.
    pub fn validate(&self, stimuli: &StimulusConfig) -> Result<(), NestError> {
        if self.title.trim().is_empty() {
            return Err(NestError::config("config.title", "experiment title is empty"));
        }
        self.ordering_plan(stimuli).validate()?;

        let arity = self.methodology.stimuli_per_vote_group();
        if let Some(svg) = stimuli
            .stimulusvotegroups
            .iter()
            .find(|svg| svg.stimulus_ids.len() != arity)
        {
            return Err(NestError::Config(
                config_error("config.methodology_arity", "vote group size does not fit the methodology")
                    .with_context("stimulusvotegroup_id", svg.stimulusvotegroup_id)
                    .with_context("expected", arity),
            ));
        }

        if !self.methodology.supports(self.vote_scale) {
            return Err(NestError::Config(
                config_error("config.methodology_vote_scale", "vote scale does not fit the methodology")
                    .with_context("methodology", self.methodology.as_str())
                    .with_context("vote_scale", self.vote_scale),
            ));
        }
        if self.methodology.shares_reference() {
            let svgs = stimuli.stimulusvotegroup_map();
            for sg in &stimuli.stimulusgroups {
                let references: BTreeSet<StimulusId> = sg
                    .stimulusvotegroup_ids
                    .iter()
                    .filter_map(|id| svgs.get(id))
                    .filter_map(|svg| svg.stimulus_ids.get(1).copied())
                    .collect();
                if references.len() > 1 {
                    return Err(NestError::Config(
                        config_error("config.shared_reference", "vote groups of a round must share one reference")
                            .with_context("stimulusgroup_id", sg.stimulusgroup_id)
                            .with_context("references", references.len()),
                    ));
                }
            }
        }

        for round_id in &self.training_round_ids {
            if *round_id >= self.rounds_per_session {
                return Err(NestError::Config(
                    config_error("config.training_round", "training round outside the session")
                        .with_context("round_id", round_id),
                ));
            }
        }
        for addition in &self.additions {
            if addition.position.round_id >= self.rounds_per_session {
                return Err(NestError::Config(
                    config_error("config.addition_round", "addition anchored outside the session")
                        .with_context("round_id", addition.position.round_id),
                ));
            }
        }
        Ok(())
    }
}

/// A complete experiment definition as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestConfig {
    /// Stimulus tables.
    pub stimulus_config: StimulusConfig,
    /// Experiment settings.
    pub experiment_config: ExperimentConfig,
}

impl NestConfig {
    /// Loads and validates a YAML or JSON definition.
    pub fn from_path(path: &Path) -> Result<Self, NestError> {
        let config: NestConfig = load_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates both halves of the definition.
    pub fn validate(&self) -> Result<(), NestError> {
        self.stimulus_config.validate()?;
        self.experiment_config.validate(&self.stimulus_config)
    }

    /// Scheduling inputs of the experiment.
    pub fn ordering_plan(&self) -> OrderingPlan {
        self.experiment_config.ordering_plan(&self.stimulus_config)
    }
}
