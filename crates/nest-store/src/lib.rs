//! SQLite persistence and orchestration of NEST experiments.

pub mod controller;
pub mod export;
pub mod info;
pub mod schema;

pub use controller::ExperimentController;
pub use export::{denormalize, export_csv, export_json, ExportRow};
pub use info::{ExperimentInfo, RoundInfo, SessionInfo, VoteInfo};
pub use schema::{
    find_or_create_subject, init_schema, open_database, open_in_memory, RoundRecord, SessionRecord,
    SCHEMA_VERSION,
};
