use std::error::Error;

use clap::Args;
use nest_config::to_canonical_json_bytes;
use nest_core::SessionId;

use super::ExperimentArgs;

#[derive(Args, Debug)]
pub struct StepsArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
    #[arg(long)]
    pub session: i64,
}

pub fn run(args: &StepsArgs) -> Result<(), Box<dyn Error>> {
    let controller = args.experiment.open()?;
    let steps = controller.session_steps(SessionId::from_raw(args.session))?;
    let json = to_canonical_json_bytes(&steps)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
