use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use nest_store::{export_csv, export_json};
use tracing::info;

use super::ExperimentArgs;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
    pub format: ExportFormat,
}

pub fn run(args: &ExportArgs) -> Result<(), Box<dyn Error>> {
    let controller = args.experiment.open()?;
    let snapshot = controller.experiment_info()?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match args.format {
        ExportFormat::Json => export_json(&snapshot, &args.out)?,
        ExportFormat::Csv => export_csv(&snapshot, &args.out)?,
    }
    info!(sessions = snapshot.sessions.len(), out = %args.out.display(), "experiment exported");
    Ok(())
}
