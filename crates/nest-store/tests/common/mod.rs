#![allow(dead_code)]

use std::path::{Path, PathBuf};

use nest_config::NestConfig;
use nest_control::Assignment;
use nest_core::StimulusGroupId;
use nest_store::{open_database, open_in_memory, ExperimentController};

pub fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../nest-config/tests/fixtures/acr_small.yaml")
}

pub fn config() -> NestConfig {
    NestConfig::from_path(&fixture()).expect("fixture loads")
}

pub fn controller() -> ExperimentController {
    let conn = open_in_memory().expect("in-memory db");
    let mut controller = ExperimentController::open(conn, config()).expect("open");
    controller.populate_stimuli().expect("populate");
    controller
}

pub fn controller_at(db: &Path) -> ExperimentController {
    let conn = open_database(db).expect("db file");
    let mut controller = ExperimentController::open(conn, config()).expect("open");
    controller.populate_stimuli().expect("populate");
    controller
}

pub fn assignment(raw: &[i64]) -> Assignment {
    raw.iter()
        .enumerate()
        .map(|(round_id, id)| (round_id as u32, StimulusGroupId::from_raw(*id)))
        .collect()
}

pub const FIRST: [i64; 8] = [0, 4, 4, 3, 2, 5, 2, 3];
pub const SECOND: [i64; 8] = [0, 2, 4, 2, 4, 5, 3, 3];
pub const THIRD: [i64; 8] = [0, 3, 4, 2, 4, 5, 3, 2];
