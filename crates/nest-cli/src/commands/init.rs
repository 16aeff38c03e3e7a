use std::error::Error;

use clap::Args;

use super::ExperimentArgs;

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
}

pub fn run(args: &InitArgs) -> Result<(), Box<dyn Error>> {
    let mut controller = args.experiment.open()?;
    controller.populate_stimuli()?;
    println!(
        "experiment {} ready ({})",
        controller.config().experiment_config.title,
        controller.experiment_id()
    );
    Ok(())
}
