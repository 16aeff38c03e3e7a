use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    add_session::{self, AddSessionArgs},
    export::{self, ExportArgs},
    init::{self, InitArgs},
    order::{self, OrderArgs},
    status::{self, StatusArgs},
    steps::{self, StepsArgs},
    vote::{self, VoteArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "nest", about = "Subjective test session scheduler")]
struct Cli {
    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and register the experiment with its stimuli.
    Init(InitArgs),
    /// Schedule new sessions for a subject.
    AddSession(AddSessionArgs),
    /// Print the completion state of sessions.
    Status(StatusArgs),
    /// Print the step sequence of a session.
    Steps(StepsArgs),
    /// Record one vote.
    Vote(VoteArgs),
    /// Preview an assignment for a given seed without persisting it.
    Order(OrderArgs),
    /// Dump sessions and votes as JSON or CSV.
    Export(ExportArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Init(args) => init::run(&args),
        Command::AddSession(args) => add_session::run(&args),
        Command::Status(args) => status::run(&args),
        Command::Steps(args) => steps::run(&args),
        Command::Vote(args) => vote::run(&args),
        Command::Order(args) => order::run(&args),
        Command::Export(args) => export::run(&args),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_session_parses_repeat_count() {
        let cli = Cli::try_parse_from([
            "nest",
            "add-session",
            "--config",
            "acr.yaml",
            "--db",
            "nest.sqlite3",
            "--subject",
            "alice",
            "--count",
            "3",
        ])
        .expect("parse");
        match cli.command {
            Command::AddSession(args) => {
                assert_eq!(args.subject, "alice");
                assert_eq!(args.count, 3);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn export_rejects_unknown_formats() {
        let parsed = Cli::try_parse_from([
            "nest", "export", "--config", "a.yaml", "--db", "a.db", "--out", "a.xml", "--format",
            "xml",
        ]);
        assert!(parsed.is_err());
    }
}
