use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use nest_config::{to_canonical_json_bytes, NestConfig};
use nest_control::{assign, AssignmentRecord};
use nest_core::SubjectId;
use nest_store::{open_database, ExperimentController};

#[derive(Args, Debug)]
pub struct OrderArgs {
    /// YAML or JSON experiment definition.
    #[arg(long)]
    pub config: PathBuf,
    /// Use the committed sessions of this database as history.
    #[arg(long)]
    pub db: Option<PathBuf>,
    /// Raw subject id the assignment is computed for.
    #[arg(long)]
    pub subject: i64,
    #[arg(long)]
    pub seed: u64,
}

pub fn run(args: &OrderArgs) -> Result<(), Box<dyn Error>> {
    let config = NestConfig::from_path(&args.config)?;
    let plan = config.ordering_plan();
    let history: Vec<AssignmentRecord> = match &args.db {
        Some(path) => ExperimentController::open(open_database(path)?, config)?.history()?,
        None => Vec::new(),
    };
    let assignment = assign(&plan, SubjectId::from_raw(args.subject), &history, args.seed)?;
    let json = to_canonical_json_bytes(&assignment)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}
