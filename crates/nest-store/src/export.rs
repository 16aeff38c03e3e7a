use std::fs;
use std::path::Path;

use nest_config::to_canonical_json_bytes;
use nest_core::errors::{ErrorInfo, NestError};
use nest_core::{RoundId, SessionId, StimulusGroupId, StimulusId, StimulusVoteGroupId};
use serde::{Deserialize, Serialize};

use crate::info::ExperimentInfo;

/// One vote target of one round, flattened with its stimuli.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub subject: String,
    pub session_id: SessionId,
    pub round_id: RoundId,
    pub sg_id: StimulusGroupId,
    pub svg_id: StimulusVoteGroupId,
    pub vote: Option<f64>,
    pub sid: StimulusId,
    pub path: String,
    pub sid2: Option<StimulusId>,
    pub path2: Option<String>,
}

fn export_error(err: impl ToString, path: &Path) -> NestError {
    NestError::Serde(
        ErrorInfo::new("nest_store.export", err.to_string()).with_context("path", path.display()),
    )
}

/// Flattens an experiment snapshot into one row per (session, round, vote group).
pub fn denormalize(info: &ExperimentInfo) -> Result<Vec<ExportRow>, NestError> {
    let stimuli = info.stimuli_info.stimulus_map();
    let svgs = info.stimuli_info.stimulusvotegroup_map();
    let path_of = |sid: StimulusId| -> Result<String, NestError> {
        stimuli.get(&sid).map(|s| s.path.clone()).ok_or_else(|| {
            NestError::Integrity(
                ErrorInfo::new("nest_store.export_stimulus", "vote group references an unknown stimulus")
                    .with_context("stimulus_id", sid),
            )
        })
    };

    let mut rows = Vec::new();
    for session in &info.sessions {
        for round in &session.rounds {
            for target in &round.stimulusvotegroups {
                let svg = svgs.get(&target.stimulusvotegroup_id).ok_or_else(|| {
                    NestError::Integrity(
                        ErrorInfo::new("nest_store.export_svg", "round references an unknown vote group")
                            .with_context("stimulusvotegroup_id", target.stimulusvotegroup_id),
                    )
                })?;
                let (sid, sid2) = match svg.stimulus_ids.as_slice() {
                    [single] => (*single, None),
                    [first, second] => (*first, Some(*second)),
                    other => {
                        return Err(NestError::Integrity(
                            ErrorInfo::new("nest_store.export_arity", "vote groups hold one or two stimuli")
                                .with_context("stimulusvotegroup_id", svg.stimulusvotegroup_id)
                                .with_context("stimuli", other.len()),
                        ))
                    }
                };
                rows.push(ExportRow {
                    subject: session.subject.clone(),
                    session_id: session.session_id,
                    round_id: round.round_id,
                    sg_id: round.stimulusgroup_id,
                    svg_id: target.stimulusvotegroup_id,
                    vote: target.vote,
                    sid,
                    path: path_of(sid)?,
                    sid2,
                    path2: sid2.map(path_of).transpose()?,
                });
            }
        }
    }
    Ok(rows)
}

pub fn export_json(info: &ExperimentInfo, out_path: &Path) -> Result<(), NestError> {
    let bytes = to_canonical_json_bytes(info)?;
    fs::write(out_path, bytes).map_err(|err| export_error(err, out_path))
}

pub fn export_csv(info: &ExperimentInfo, out_path: &Path) -> Result<(), NestError> {
    let rows = denormalize(info)?;
    let mut wtr = csv::Writer::from_path(out_path).map_err(|err| export_error(err, out_path))?;
    for row in &rows {
        wtr.serialize(row).map_err(|err| export_error(err, out_path))?;
    }
    wtr.flush().map_err(|err| export_error(err, out_path))
}
