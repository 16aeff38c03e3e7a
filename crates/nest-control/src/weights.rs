//! Exposure weights accumulated from assignment history.

use std::collections::BTreeMap;

use nest_core::{ErrorInfo, NestError, StimulusGroupId, SubjectId};

use crate::assign::{AssignmentRecord, SUBJECT_WEIGHT};

/// Exposure weight per pool position.
///
/// Rebuilt from scratch for every scheduling call. A group's weight grows by
/// one for every committed round that showed it, plus [`SUBJECT_WEIGHT`] when
/// the round belonged to the subject being scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightHistogram {
    weights: Vec<u64>,
}

impl WeightHistogram {
    /// Creates a histogram of `len` zero weights.
    pub fn zeroed(len: usize) -> Self {
        Self {
            weights: vec![0; len],
        }
    }

    /// Accumulates weights for `subject` from prior sessions.
    pub fn from_history(
        index: &BTreeMap<StimulusGroupId, usize>,
        subject: SubjectId,
        history: &[AssignmentRecord],
    ) -> Result<Self, NestError> {
        let mut histogram = Self::zeroed(index.len());
        for (session_idx, record) in history.iter().enumerate() {
            let same_subject = record.subject == subject;
            for (round_id, stimulusgroup_id) in &record.stimulusgroups {
                let idx = index.get(stimulusgroup_id).copied().ok_or_else(|| {
                    NestError::Integrity(
                        ErrorInfo::new(
                            "weights.unknown_stimulusgroup",
                            "history references a stimulus group outside the pool",
                        )
                        .with_context("session_idx", session_idx)
                        .with_context("round_id", round_id)
                        .with_context("stimulusgroup_id", stimulusgroup_id),
                    )
                })?;
                histogram.bump(idx, 1);
                if same_subject {
                    histogram.bump(idx, SUBJECT_WEIGHT);
                }
            }
        }
        Ok(histogram)
    }

    /// Adds `amount` to the weight at pool position `idx`.
    pub fn bump(&mut self, idx: usize, amount: u64) {
        if let Some(weight) = self.weights.get_mut(idx) {
            *weight += amount;
        }
    }

    /// Returns the weight at pool position `idx`.
    pub fn weight(&self, idx: usize) -> u64 {
        self.weights.get(idx).copied().unwrap_or(0)
    }

    /// Candidates sharing the minimum weight, in candidate order.
    pub fn argmin(&self, candidates: &[usize]) -> Vec<usize> {
        let Some(min) = candidates.iter().map(|&idx| self.weight(idx)).min() else {
            return Vec::new();
        };
        candidates
            .iter()
            .copied()
            .filter(|&idx| self.weight(idx) == min)
            .collect()
    }

    /// Number of pool positions tracked.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Returns `true` when the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Raw weights in pool order.
    pub fn as_slice(&self) -> &[u64] {
        &self.weights
    }
}
