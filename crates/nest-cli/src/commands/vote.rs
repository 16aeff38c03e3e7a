use std::error::Error;

use clap::Args;
use nest_core::{SessionId, StimulusVoteGroupId};

use super::ExperimentArgs;

#[derive(Args, Debug)]
pub struct VoteArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
    #[arg(long)]
    pub session: i64,
    #[arg(long)]
    pub round: u32,
    /// Vote group the score applies to.
    #[arg(long)]
    pub svg: i64,
    #[arg(long, allow_negative_numbers = true)]
    pub score: f64,
    /// Seconds the subject took to answer.
    #[arg(long)]
    pub response_sec: Option<f64>,
}

pub fn run(args: &VoteArgs) -> Result<(), Box<dyn Error>> {
    let mut controller = args.experiment.open()?;
    let session = SessionId::from_raw(args.session);
    controller.record_vote(
        session,
        args.round,
        StimulusVoteGroupId::from_raw(args.svg),
        args.score,
    )?;
    if let Some(seconds) = args.response_sec {
        controller.record_response_time(session, args.round, seconds)?;
    }
    println!("{}\t{}", session.as_raw(), controller.session_status(session)?);
    Ok(())
}
