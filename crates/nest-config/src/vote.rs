//! Vote scales and test methodologies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scale a vote score is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteScale {
    /// Discrete `1..=3`.
    #[serde(rename = "THREE_POINT")]
    ThreePoint,
    /// Discrete `1..=5`.
    #[serde(rename = "FIVE_POINT")]
    FivePoint,
    /// Discrete `1..=7`.
    #[serde(rename = "SEVEN_POINT")]
    SevenPoint,
    /// Discrete `1..=11`.
    #[serde(rename = "ELEVEN_POINT")]
    ElevenPoint,
    /// Two-alternative forced choice, `0` or `1`.
    #[serde(rename = "2AFC")]
    TwoAfc,
    /// Comparison category rating, `-1..=1`.
    ///
    /// Ranges of the CCR scales are a local convention: centered on "same",
    /// negative when the first stimulus is worse.
    #[serde(rename = "CCR_THREE_POINT")]
    CcrThreePoint,
    /// Comparison category rating, `-2..=2`.
    #[serde(rename = "CCR_FIVE_POINT")]
    CcrFivePoint,
    /// Continuous `[0, 100]`.
    #[serde(rename = "0_TO_100")]
    ZeroToHundred,
}

impl VoteScale {
    /// Configuration label of the scale.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteScale::ThreePoint => "THREE_POINT",
            VoteScale::FivePoint => "FIVE_POINT",
            VoteScale::SevenPoint => "SEVEN_POINT",
            VoteScale::ElevenPoint => "ELEVEN_POINT",
            VoteScale::TwoAfc => "2AFC",
            VoteScale::CcrThreePoint => "CCR_THREE_POINT",
            VoteScale::CcrFivePoint => "CCR_FIVE_POINT",
            VoteScale::ZeroToHundred => "0_TO_100",
        }
    }

    /// Inclusive bounds of the scale.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            VoteScale::ThreePoint => (1.0, 3.0),
            VoteScale::FivePoint => (1.0, 5.0),
            VoteScale::SevenPoint => (1.0, 7.0),
            VoteScale::ElevenPoint => (1.0, 11.0),
            VoteScale::TwoAfc => (0.0, 1.0),
            VoteScale::CcrThreePoint => (-1.0, 1.0),
            VoteScale::CcrFivePoint => (-2.0, 2.0),
            VoteScale::ZeroToHundred => (0.0, 100.0),
        }
    }

    /// Returns `true` when only integer scores are allowed.
    pub fn is_discrete(&self) -> bool {
        !matches!(self, VoteScale::ZeroToHundred)
    }

    /// Discrete support of the scale, empty for continuous scales.
    pub fn support(&self) -> Vec<i64> {
        if !self.is_discrete() {
            return Vec::new();
        }
        let (low, high) = self.bounds();
        (low as i64..=high as i64).collect()
    }

    /// Returns `true` when `score` belongs to the scale.
    pub fn validate(&self, score: f64) -> bool {
        let (low, high) = self.bounds();
        if !score.is_finite() || score < low || score > high {
            return false;
        }
        !self.is_discrete() || score.fract() == 0.0
    }
}

impl fmt::Display for VoteScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Test methodology of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Methodology {
    /// Absolute category rating.
    Acr,
    /// Absolute category rating on a continuous scale.
    Acr5c,
    /// Degradation category rating.
    Dcr,
    /// Two-alternative forced choice.
    Tafc,
    /// Comparison category rating.
    Ccr,
    /// Subjective assessment of multimedia video quality.
    Samviq,
    /// SAMVIQ with a five point scale.
    Samviq5d,
}

impl Methodology {
    /// Configuration label of the methodology.
    pub fn as_str(&self) -> &'static str {
        match self {
            Methodology::Acr => "acr",
            Methodology::Acr5c => "acr5c",
            Methodology::Dcr => "dcr",
            Methodology::Tafc => "tafc",
            Methodology::Ccr => "ccr",
            Methodology::Samviq => "samviq",
            Methodology::Samviq5d => "samviq5d",
        }
    }

    /// Number of stimuli every vote group of this methodology pairs.
    pub fn stimuli_per_vote_group(&self) -> usize {
        match self {
            Methodology::Acr | Methodology::Acr5c => 1,
            Methodology::Dcr
            | Methodology::Tafc
            | Methodology::Ccr
            | Methodology::Samviq
            | Methodology::Samviq5d => 2,
        }
    }

    /// Returns `true` when votes of this methodology can be cast on `scale`.
    pub fn supports(&self, scale: VoteScale) -> bool {
        match self {
            Methodology::Acr | Methodology::Dcr => matches!(
                scale,
                VoteScale::ThreePoint
                    | VoteScale::FivePoint
                    | VoteScale::SevenPoint
                    | VoteScale::ElevenPoint
            ),
            Methodology::Tafc => scale == VoteScale::TwoAfc,
            Methodology::Ccr => matches!(scale, VoteScale::CcrThreePoint | VoteScale::CcrFivePoint),
            Methodology::Acr5c | Methodology::Samviq => scale == VoteScale::ZeroToHundred,
            Methodology::Samviq5d => scale == VoteScale::FivePoint,
        }
    }

    /// SAMVIQ variants compare every vote group of a round against one
    /// shared reference stimulus.
    pub fn shares_reference(&self) -> bool {
        matches!(self, Methodology::Samviq | Methodology::Samviq5d)
    }
}
