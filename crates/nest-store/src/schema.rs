use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use nest_config::StimulusEntry;
use nest_core::errors::{ErrorInfo, NestError};
use nest_core::{
    ExperimentId, RoundId, SessionId, StimulusGroupId, StimulusId, StimulusVoteGroupId, SubjectId,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub experiment_id: ExperimentId,
    pub subject: SubjectId,
    pub seed: u64,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub pk: i64,
    pub round_id: RoundId,
    pub stimulusgroup_id: StimulusGroupId,
    pub response_sec: Option<f64>,
}

pub(crate) fn storage_error(code: &str, err: impl ToString) -> NestError {
    NestError::Storage(ErrorInfo::new(code, err.to_string()))
}

/// Opens (creating if needed) a database file with foreign keys enforced and
/// the schema installed.
pub fn open_database(path: &Path) -> Result<Connection, NestError> {
    let conn = Connection::open(path).map_err(|err| {
        NestError::Storage(
            ErrorInfo::new("nest_store.open", err.to_string())
                .with_context("path", path.display()),
        )
    })?;
    prepare(conn)
}

/// In-memory database, mostly for tests and dry runs.
pub fn open_in_memory() -> Result<Connection, NestError> {
    let conn =
        Connection::open_in_memory().map_err(|err| storage_error("nest_store.open", err))?;
    prepare(conn)
}

fn prepare(conn: Connection) -> Result<Connection, NestError> {
    conn.busy_timeout(Duration::from_secs(5))
        .map_err(|err| storage_error("nest_store.open", err))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| storage_error("nest_store.open", err))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), NestError> {
    conn.execute_batch(
        "BEGIN IMMEDIATE;
        CREATE TABLE IF NOT EXISTS meta(version INTEGER NOT NULL);
        CREATE TABLE IF NOT EXISTS experiments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE,
            description TEXT,
            seed_draws INTEGER NOT NULL DEFAULT 0,
            created TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS subjects(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            created TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS contents(
            experiment_id INTEGER NOT NULL,
            content_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY(experiment_id, content_id),
            FOREIGN KEY(experiment_id) REFERENCES experiments(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS stimuli(
            experiment_id INTEGER NOT NULL,
            stimulus_id INTEGER NOT NULL,
            content_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            media_type TEXT NOT NULL,
            PRIMARY KEY(experiment_id, stimulus_id),
            FOREIGN KEY(experiment_id, content_id) REFERENCES contents(experiment_id, content_id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS stimulus_groups(
            experiment_id INTEGER NOT NULL,
            stimulusgroup_id INTEGER NOT NULL,
            PRIMARY KEY(experiment_id, stimulusgroup_id),
            FOREIGN KEY(experiment_id) REFERENCES experiments(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS stimulus_vote_groups(
            experiment_id INTEGER NOT NULL,
            stimulusvotegroup_id INTEGER NOT NULL,
            stimulusgroup_id INTEGER,
            PRIMARY KEY(experiment_id, stimulusvotegroup_id),
            FOREIGN KEY(experiment_id) REFERENCES experiments(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS stimulus_vote_group_members(
            experiment_id INTEGER NOT NULL,
            stimulusvotegroup_id INTEGER NOT NULL,
            stimulus_order INTEGER NOT NULL,
            stimulus_id INTEGER NOT NULL,
            PRIMARY KEY(experiment_id, stimulusvotegroup_id, stimulus_order),
            FOREIGN KEY(experiment_id, stimulusvotegroup_id)
                REFERENCES stimulus_vote_groups(experiment_id, stimulusvotegroup_id) ON DELETE CASCADE,
            FOREIGN KEY(experiment_id, stimulus_id)
                REFERENCES stimuli(experiment_id, stimulus_id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS sessions(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            experiment_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            seed INTEGER NOT NULL,
            created TEXT NOT NULL,
            FOREIGN KEY(experiment_id) REFERENCES experiments(id) ON DELETE CASCADE,
            FOREIGN KEY(subject_id) REFERENCES subjects(id)
        );
        CREATE TABLE IF NOT EXISTS rounds(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id INTEGER NOT NULL,
            round_id INTEGER NOT NULL,
            stimulusgroup_id INTEGER NOT NULL,
            response_sec REAL,
            UNIQUE(session_id, round_id),
            FOREIGN KEY(session_id) REFERENCES sessions(id) ON DELETE CASCADE
        );
        CREATE TABLE IF NOT EXISTS votes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            round_pk INTEGER NOT NULL,
            stimulusvotegroup_id INTEGER NOT NULL,
            score REAL NOT NULL,
            vote_scale TEXT NOT NULL,
            created TEXT NOT NULL,
            FOREIGN KEY(round_pk) REFERENCES rounds(id) ON DELETE CASCADE
        );
        COMMIT;",
    )
    .map_err(|err| storage_error("nest_store.schema", err))?;
    set_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

fn set_version(conn: &Connection, version: i64) -> Result<(), NestError> {
    let existing: Option<i64> = conn
        .query_row("SELECT version FROM meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| storage_error("nest_store.schema", err))?;
    match existing {
        Some(current) if current == version => Ok(()),
        Some(current) => Err(NestError::Storage(ErrorInfo::new(
            "nest_store.schema_version",
            format!("database schema {current} incompatible with expected {version}"),
        ))),
        None => {
            conn.execute("INSERT INTO meta(version) VALUES (?)", params![version])
                .map_err(|err| storage_error("nest_store.schema", err))?;
            Ok(())
        }
    }
}

pub fn find_experiment(conn: &Connection, title: &str) -> Result<Option<ExperimentId>, NestError> {
    conn.query_row(
        "SELECT id FROM experiments WHERE title = ?",
        params![title],
        |row| row.get(0),
    )
    .optional()
    .map(|id| id.map(ExperimentId::from_raw))
    .map_err(|err| storage_error("nest_store.find_experiment", err))
}

/// Registers the experiment unless a row with `title` already exists. The
/// insert is a no-op on conflict, so concurrent openers agree on one id.
pub fn find_or_create_experiment(
    conn: &Connection,
    title: &str,
    description: Option<&str>,
) -> Result<ExperimentId, NestError> {
    conn.execute(
        "INSERT OR IGNORE INTO experiments(title, description, created) VALUES (?, ?, ?)",
        params![title, description, Utc::now().to_rfc3339()],
    )
    .map_err(|err| storage_error("nest_store.insert_experiment", err))?;
    find_experiment(conn, title)?.ok_or_else(|| {
        NestError::Storage(
            ErrorInfo::new("nest_store.insert_experiment", "experiment row missing after insert")
                .with_context("title", title),
        )
    })
}

/// Number of session seeds drawn for the experiment so far.
pub fn seed_draws(conn: &Connection, experiment: ExperimentId) -> Result<u64, NestError> {
    let draws: i64 = conn
        .query_row(
            "SELECT seed_draws FROM experiments WHERE id = ?",
            params![experiment.as_raw()],
            |row| row.get(0),
        )
        .map_err(|err| storage_error("nest_store.seed_draws", err))?;
    Ok(draws.max(0) as u64)
}

pub fn set_seed_draws(conn: &Connection, experiment: ExperimentId, draws: u64) -> Result<(), NestError> {
    conn.execute(
        "UPDATE experiments SET seed_draws = ? WHERE id = ?",
        params![draws as i64, experiment.as_raw()],
    )
    .map_err(|err| storage_error("nest_store.seed_draws", err))?;
    Ok(())
}

/// Looks a subject up by username, registering it on first use.
pub fn find_or_create_subject(conn: &Connection, username: &str) -> Result<SubjectId, NestError> {
    conn.execute(
        "INSERT OR IGNORE INTO subjects(username, created) VALUES (?, ?)",
        params![username, Utc::now().to_rfc3339()],
    )
    .map_err(|err| storage_error("nest_store.insert_subject", err))?;
    conn.query_row(
        "SELECT id FROM subjects WHERE username = ?",
        params![username],
        |row| row.get(0),
    )
    .map(SubjectId::from_raw)
    .map_err(|err| storage_error("nest_store.find_subject", err))
}

pub fn subject_name(conn: &Connection, subject: SubjectId) -> Result<Option<String>, NestError> {
    conn.query_row(
        "SELECT username FROM subjects WHERE id = ?",
        params![subject.as_raw()],
        |row| row.get(0),
    )
    .optional()
    .map_err(|err| storage_error("nest_store.subject_name", err))
}

pub fn insert_content(
    conn: &Connection,
    experiment: ExperimentId,
    content_id: i64,
    name: &str,
) -> Result<bool, NestError> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO contents(experiment_id, content_id, name) VALUES (?, ?, ?)",
            params![experiment.as_raw(), content_id, name],
        )
        .map_err(|err| storage_error("nest_store.insert_content", err))?;
    Ok(changed > 0)
}

pub fn insert_stimulus(
    conn: &Connection,
    experiment: ExperimentId,
    stimulus: &StimulusEntry,
) -> Result<bool, NestError> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO stimuli(experiment_id, stimulus_id, content_id, path, media_type)
             VALUES (?, ?, ?, ?, ?)",
            params![
                experiment.as_raw(),
                stimulus.stimulus_id.as_raw(),
                stimulus.content_id,
                stimulus.path,
                stimulus.media_type
            ],
        )
        .map_err(|err| storage_error("nest_store.insert_stimulus", err))?;
    Ok(changed > 0)
}

pub fn insert_stimulusvotegroup(
    conn: &Connection,
    experiment: ExperimentId,
    svg: StimulusVoteGroupId,
    stimulus_ids: &[StimulusId],
) -> Result<bool, NestError> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO stimulus_vote_groups(experiment_id, stimulusvotegroup_id)
             VALUES (?, ?)",
            params![experiment.as_raw(), svg.as_raw()],
        )
        .map_err(|err| storage_error("nest_store.insert_svg", err))?;
    if changed == 0 {
        return Ok(false);
    }
    for (order, stimulus) in stimulus_ids.iter().enumerate() {
        conn.execute(
            "INSERT INTO stimulus_vote_group_members(experiment_id, stimulusvotegroup_id, stimulus_order, stimulus_id)
             VALUES (?, ?, ?, ?)",
            params![experiment.as_raw(), svg.as_raw(), order as i64 + 1, stimulus.as_raw()],
        )
        .map_err(|err| storage_error("nest_store.insert_svg", err))?;
    }
    Ok(true)
}

pub fn insert_stimulusgroup(
    conn: &Connection,
    experiment: ExperimentId,
    sg: StimulusGroupId,
) -> Result<bool, NestError> {
    let changed = conn
        .execute(
            "INSERT OR IGNORE INTO stimulus_groups(experiment_id, stimulusgroup_id) VALUES (?, ?)",
            params![experiment.as_raw(), sg.as_raw()],
        )
        .map_err(|err| storage_error("nest_store.insert_stimulusgroup", err))?;
    Ok(changed > 0)
}

/// Makes `sg` the owner of `svg`. A vote group is owned by one stimulus group
/// for the lifetime of the experiment.
pub fn attach_stimulusvotegroup(
    conn: &Connection,
    experiment: ExperimentId,
    svg: StimulusVoteGroupId,
    sg: StimulusGroupId,
) -> Result<(), NestError> {
    let changed = conn
        .execute(
            "UPDATE stimulus_vote_groups SET stimulusgroup_id = ?
             WHERE experiment_id = ? AND stimulusvotegroup_id = ? AND stimulusgroup_id IS NULL",
            params![sg.as_raw(), experiment.as_raw(), svg.as_raw()],
        )
        .map_err(|err| storage_error("nest_store.attach_svg", err))?;
    if changed == 0 {
        return Err(NestError::Integrity(
            ErrorInfo::new("nest_store.svg_owned", "vote group is missing or already owned")
                .with_context("stimulusvotegroup_id", svg)
                .with_context("stimulusgroup_id", sg),
        ));
    }
    Ok(())
}

pub fn stimulusvotegroups_of(
    conn: &Connection,
    experiment: ExperimentId,
    sg: StimulusGroupId,
) -> Result<Vec<StimulusVoteGroupId>, NestError> {
    let mut stmt = conn
        .prepare(
            "SELECT stimulusvotegroup_id FROM stimulus_vote_groups
             WHERE experiment_id = ? AND stimulusgroup_id = ? ORDER BY stimulusvotegroup_id",
        )
        .map_err(|err| storage_error("nest_store.query", err))?;
    let rows = stmt
        .query_map(params![experiment.as_raw(), sg.as_raw()], |row| {
            row.get::<_, i64>(0).map(StimulusVoteGroupId::from_raw)
        })
        .map_err(|err| storage_error("nest_store.query", err))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| storage_error("nest_store.query", err))
}

pub fn insert_session(
    conn: &Connection,
    experiment: ExperimentId,
    subject: SubjectId,
    seed: u64,
) -> Result<SessionId, NestError> {
    conn.execute(
        "INSERT INTO sessions(experiment_id, subject_id, seed, created) VALUES (?, ?, ?, ?)",
        params![experiment.as_raw(), subject.as_raw(), seed as i64, Utc::now().to_rfc3339()],
    )
    .map_err(|err| storage_error("nest_store.insert_session", err))?;
    Ok(SessionId::from_raw(conn.last_insert_rowid()))
}

pub fn insert_round(
    conn: &Connection,
    session: SessionId,
    round_id: RoundId,
    sg: StimulusGroupId,
) -> Result<i64, NestError> {
    conn.execute(
        "INSERT INTO rounds(session_id, round_id, stimulusgroup_id) VALUES (?, ?, ?)",
        params![session.as_raw(), round_id, sg.as_raw()],
    )
    .map_err(|err| storage_error("nest_store.insert_round", err))?;
    Ok(conn.last_insert_rowid())
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: SessionId::from_raw(row.get(0)?),
        experiment_id: ExperimentId::from_raw(row.get(1)?),
        subject: SubjectId::from_raw(row.get(2)?),
        seed: row.get::<_, i64>(3)? as u64,
        created: row.get(4)?,
    })
}

pub fn load_session(conn: &Connection, session: SessionId) -> Result<Option<SessionRecord>, NestError> {
    conn.query_row(
        "SELECT id, experiment_id, subject_id, seed, created FROM sessions WHERE id = ?",
        params![session.as_raw()],
        session_from_row,
    )
    .optional()
    .map_err(|err| storage_error("nest_store.load_session", err))
}

/// Sessions of an experiment in creation order.
pub fn load_sessions(conn: &Connection, experiment: ExperimentId) -> Result<Vec<SessionRecord>, NestError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, experiment_id, subject_id, seed, created FROM sessions
             WHERE experiment_id = ? ORDER BY id",
        )
        .map_err(|err| storage_error("nest_store.query", err))?;
    let rows = stmt
        .query_map(params![experiment.as_raw()], session_from_row)
        .map_err(|err| storage_error("nest_store.query", err))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| storage_error("nest_store.query", err))
}

pub fn load_rounds(conn: &Connection, session: SessionId) -> Result<Vec<RoundRecord>, NestError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, round_id, stimulusgroup_id, response_sec FROM rounds
             WHERE session_id = ? ORDER BY round_id",
        )
        .map_err(|err| storage_error("nest_store.query", err))?;
    let rows = stmt
        .query_map(params![session.as_raw()], |row| {
            Ok(RoundRecord {
                pk: row.get(0)?,
                round_id: row.get(1)?,
                stimulusgroup_id: StimulusGroupId::from_raw(row.get(2)?),
                response_sec: row.get(3)?,
            })
        })
        .map_err(|err| storage_error("nest_store.query", err))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| storage_error("nest_store.query", err))
}

pub fn delete_session(conn: &Connection, session: SessionId) -> Result<usize, NestError> {
    conn.execute("DELETE FROM sessions WHERE id = ?", params![session.as_raw()])
        .map_err(|err| storage_error("nest_store.delete_session", err))
}

pub fn update_session_subject(
    conn: &Connection,
    session: SessionId,
    subject: SubjectId,
) -> Result<(), NestError> {
    conn.execute(
        "UPDATE sessions SET subject_id = ? WHERE id = ?",
        params![subject.as_raw(), session.as_raw()],
    )
    .map_err(|err| storage_error("nest_store.update_session", err))?;
    Ok(())
}

pub fn set_response_sec(conn: &Connection, round_pk: i64, seconds: f64) -> Result<(), NestError> {
    conn.execute(
        "UPDATE rounds SET response_sec = ? WHERE id = ?",
        params![seconds, round_pk],
    )
    .map_err(|err| storage_error("nest_store.response_sec", err))?;
    Ok(())
}

pub fn count_votes(conn: &Connection, round_pk: i64, svg: StimulusVoteGroupId) -> Result<usize, NestError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM votes WHERE round_pk = ? AND stimulusvotegroup_id = ?",
            params![round_pk, svg.as_raw()],
            |row| row.get(0),
        )
        .map_err(|err| storage_error("nest_store.count_votes", err))?;
    Ok(count.max(0) as usize)
}

pub fn load_vote(conn: &Connection, round_pk: i64, svg: StimulusVoteGroupId) -> Result<Option<f64>, NestError> {
    conn.query_row(
        "SELECT score FROM votes WHERE round_pk = ? AND stimulusvotegroup_id = ? ORDER BY id LIMIT 1",
        params![round_pk, svg.as_raw()],
        |row| row.get(0),
    )
    .optional()
    .map_err(|err| storage_error("nest_store.load_vote", err))
}

pub fn insert_vote(
    conn: &Connection,
    round_pk: i64,
    svg: StimulusVoteGroupId,
    score: f64,
    vote_scale: &str,
) -> Result<i64, NestError> {
    conn.execute(
        "INSERT INTO votes(round_pk, stimulusvotegroup_id, score, vote_scale, created) VALUES (?, ?, ?, ?, ?)",
        params![round_pk, svg.as_raw(), score, vote_scale, Utc::now().to_rfc3339()],
    )
    .map_err(|err| storage_error("nest_store.insert_vote", err))?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_votes_for_session(conn: &Connection, session: SessionId) -> Result<usize, NestError> {
    conn.execute(
        "DELETE FROM votes WHERE round_pk IN (SELECT id FROM rounds WHERE session_id = ?)",
        params![session.as_raw()],
    )
    .map_err(|err| storage_error("nest_store.delete_votes", err))
}
