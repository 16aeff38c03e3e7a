use std::error::Error;

use clap::Args;
use nest_config::to_canonical_json_bytes;
use serde::Serialize;
use tracing::info;

use super::ExperimentArgs;

#[derive(Args, Debug)]
pub struct AddSessionArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
    /// Username of the subject; registered on first use.
    #[arg(long)]
    pub subject: String,
    /// Number of sessions to add.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Serialize)]
struct Added {
    session_id: i64,
    stimulusgroup_ids: Vec<i64>,
}

pub fn run(args: &AddSessionArgs) -> Result<(), Box<dyn Error>> {
    let mut controller = args.experiment.open()?;
    controller.populate_stimuli()?;
    let mut added = Vec::with_capacity(args.count);
    for _ in 0..args.count {
        let session = controller.add_session_for(&args.subject)?;
        let assignment = controller.session_assignment(session)?;
        added.push(Added {
            session_id: session.as_raw(),
            stimulusgroup_ids: assignment.values().map(|sg| sg.as_raw()).collect(),
        });
    }
    info!(subject = %args.subject, count = added.len(), "sessions added");
    let json = to_canonical_json_bytes(&added)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
