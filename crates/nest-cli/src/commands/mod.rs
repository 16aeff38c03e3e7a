pub mod add_session;
pub mod export;
pub mod init;
pub mod order;
pub mod status;
pub mod steps;
pub mod vote;

use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use nest_config::NestConfig;
use nest_store::{open_database, ExperimentController};

/// Experiment definition and the database it lives in.
#[derive(Args, Debug)]
pub struct ExperimentArgs {
    /// YAML or JSON experiment definition.
    #[arg(long)]
    pub config: PathBuf,
    /// SQLite database path.
    #[arg(long)]
    pub db: PathBuf,
}

impl ExperimentArgs {
    pub fn open(&self) -> Result<ExperimentController, Box<dyn Error>> {
        if let Some(parent) = self.db.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let config = NestConfig::from_path(&self.config)?;
        let conn = open_database(&self.db)?;
        Ok(ExperimentController::open(conn, config)?)
    }
}
