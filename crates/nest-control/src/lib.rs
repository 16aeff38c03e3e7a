#![deny(missing_docs)]
#![doc = "Assignment scheduling, session status evaluation and step sequencing for NEST experiments."]

pub mod assign;
pub mod status;
pub mod steps;
pub mod weights;

pub use assign::{assign, Assignment, AssignmentRecord, OrderingPlan, PriorityRule, SUBJECT_WEIGHT};
pub use status::{evaluate_status, RoundTally, SessionStatus, VoteTally};
pub use steps::{
    build_steps, insert_addition, Addition, AdditionContext, AdditionPosition, Placement, Step,
    StepContext, StepPosition,
};
pub use weights::WeightHistogram;
