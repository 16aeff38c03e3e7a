use std::error::Error;

use clap::Args;
use nest_core::SessionId;

use super::ExperimentArgs;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
    /// Only report this session.
    #[arg(long)]
    pub session: Option<i64>,
}

pub fn run(args: &StatusArgs) -> Result<(), Box<dyn Error>> {
    let controller = args.experiment.open()?;
    let sessions: Vec<SessionId> = match args.session {
        Some(raw) => vec![SessionId::from_raw(raw)],
        None => controller.sessions()?.into_iter().map(|s| s.id).collect(),
    };
    for session in sessions {
        let status = controller.session_status(session)?;
        println!("{}\t{}", session.as_raw(), status);
    }
    Ok(())
}
