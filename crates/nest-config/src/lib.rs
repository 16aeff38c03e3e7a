#![deny(missing_docs)]
#![doc = "Typed experiment and stimulus configuration, vote scales and serialization helpers."]

pub mod config;
pub mod serde;
pub mod vote;

pub use config::{
    ContentEntry, ExperimentConfig, NestConfig, StimulusConfig, StimulusEntry, StimulusGroupEntry,
    StimulusVoteGroupEntry,
};
pub use crate::serde::{from_json_slice, from_yaml_slice, load_path, to_canonical_json_bytes};
pub use vote::{Methodology, VoteScale};
