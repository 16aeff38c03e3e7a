use nest_config::NestConfig;
use nest_control::{
    assign, build_steps, evaluate_status, Assignment, AssignmentRecord, RoundTally, SessionStatus,
    Step, VoteTally,
};
use nest_core::errors::{ErrorInfo, NestError};
use nest_core::{ExperimentId, RngHandle, RoundId, SessionId, StimulusVoteGroupId, SubjectId};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::info::{ExperimentInfo, RoundInfo, SessionInfo, VoteInfo};
use crate::schema::{self, storage_error, RoundRecord, SessionRecord};

/// Session seeds are drawn uniformly from `0..=SESSION_SEED_MAX`.
const SESSION_SEED_MAX: u64 = 1 << 16;

fn immediate(conn: &mut Connection) -> Result<Transaction<'_>, NestError> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| storage_error("nest_store.transaction", err))
}

fn commit(tx: Transaction<'_>) -> Result<(), NestError> {
    tx.commit().map_err(|err| storage_error("nest_store.commit", err))
}

fn owned_session(
    conn: &Connection,
    experiment: ExperimentId,
    session: SessionId,
) -> Result<SessionRecord, NestError> {
    match schema::load_session(conn, session)? {
        Some(record) if record.experiment_id == experiment => Ok(record),
        _ => Err(NestError::Storage(
            ErrorInfo::new("nest_store.session_not_found", "no such session in this experiment")
                .with_context("session", session)
                .with_context("experiment", experiment),
        )),
    }
}

/// Collects rounds `0..rounds_per_session` of a session, failing when any is
/// missing.
fn complete_assignment(
    session: SessionId,
    rounds: &[RoundRecord],
    rounds_per_session: u32,
) -> Result<Assignment, NestError> {
    let assignment: Assignment = rounds
        .iter()
        .map(|round| (round.round_id, round.stimulusgroup_id))
        .collect();
    if let Some(missing) = (0..rounds_per_session).find(|round_id| !assignment.contains_key(round_id)) {
        return Err(NestError::Integrity(
            ErrorInfo::new("nest_store.missing_round", "session is missing a round")
                .with_context("session", session)
                .with_context("round_id", missing)
                .with_context("rounds_per_session", rounds_per_session),
        ));
    }
    Ok(assignment)
}

fn load_history(
    conn: &Connection,
    experiment: ExperimentId,
    rounds_per_session: u32,
) -> Result<Vec<AssignmentRecord>, NestError> {
    schema::load_sessions(conn, experiment)?
        .into_iter()
        .map(|session| -> Result<AssignmentRecord, NestError> {
            let rounds = schema::load_rounds(conn, session.id)?;
            Ok(AssignmentRecord {
                subject: session.subject,
                stimulusgroups: complete_assignment(session.id, &rounds, rounds_per_session)?,
            })
        })
        .collect()
}

/// Draws the next seed of the experiment's session seed stream.
///
/// With a configured `random_seed` the stream is replayed up to the number of
/// draws already recorded, so every process opening the experiment continues
/// the same stream. Without one, each draw comes from OS entropy.
fn draw_session_seed(
    conn: &Connection,
    experiment: ExperimentId,
    random_seed: Option<u64>,
) -> Result<u64, NestError> {
    let draws = schema::seed_draws(conn, experiment)?;
    let seed = match random_seed {
        Some(root) => {
            let mut stream = RngHandle::from_seed(root);
            let mut value = 0;
            for _ in 0..=draws {
                value = stream.below(SESSION_SEED_MAX + 1);
            }
            value
        }
        None => RngHandle::from_entropy().below(SESSION_SEED_MAX + 1),
    };
    schema::set_seed_draws(conn, experiment, draws + 1)?;
    Ok(seed)
}

fn round_tallies(
    conn: &Connection,
    experiment: ExperimentId,
    rounds: &[RoundRecord],
) -> Result<Vec<RoundTally>, NestError> {
    rounds
        .iter()
        .map(|round| -> Result<RoundTally, NestError> {
            let tallies = schema::stimulusvotegroups_of(conn, experiment, round.stimulusgroup_id)?
                .into_iter()
                .map(|svg| -> Result<VoteTally, NestError> {
                    Ok(VoteTally {
                        stimulusvotegroup_id: svg,
                        votes: schema::count_votes(conn, round.pk, svg)?,
                    })
                })
                .collect::<Result<Vec<_>, NestError>>()?;
            Ok(RoundTally {
                round_id: round.round_id,
                tallies,
            })
        })
        .collect()
}

fn find_round(rounds: Vec<RoundRecord>, session: SessionId, round_id: RoundId) -> Result<RoundRecord, NestError> {
    rounds
        .into_iter()
        .find(|round| round.round_id == round_id)
        .ok_or_else(|| {
            NestError::Config(
                ErrorInfo::new("nest_store.round_not_found", "session has no such round")
                    .with_context("session", session)
                    .with_context("round_id", round_id),
            )
        })
}

/// Runs the scheduler against the committed history and writes the session.
/// Callers hold an immediate transaction on `conn`.
fn schedule_session(
    conn: &Connection,
    config: &NestConfig,
    experiment: ExperimentId,
    subject: SubjectId,
) -> Result<SessionId, NestError> {
    let plan = config.ordering_plan();
    let history = load_history(conn, experiment, plan.rounds_per_session)?;
    let seed = draw_session_seed(conn, experiment, config.experiment_config.random_seed)?;
    debug!(session_idx = history.len(), subject = subject.as_raw(), seed, "scheduling session");
    let assignment = assign(&plan, subject, &history, seed)?;
    let session = schema::insert_session(conn, experiment, subject, seed)?;
    for (round_id, stimulusgroup_id) in &assignment {
        schema::insert_round(conn, session, *round_id, *stimulusgroup_id)?;
    }
    Ok(session)
}

/// Business logic of one experiment on top of its database.
///
/// Every mutation runs inside an immediate SQLite transaction, so concurrent
/// controllers on the same database file serialize their writes and never
/// observe each other's partial sessions.
pub struct ExperimentController {
    conn: Connection,
    config: NestConfig,
    experiment_id: ExperimentId,
}

impl ExperimentController {
    /// Validates `config` and attaches to (or registers) its experiment.
    pub fn open(conn: Connection, config: NestConfig) -> Result<Self, NestError> {
        config.validate()?;
        let experiment = &config.experiment_config;
        let experiment_id =
            schema::find_or_create_experiment(&conn, &experiment.title, experiment.description.as_deref())?;
        info!(experiment = %experiment.title, id = experiment_id.as_raw(), "experiment opened");
        Ok(Self {
            conn,
            config,
            experiment_id,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &NestConfig {
        &self.config
    }

    pub fn experiment_id(&self) -> ExperimentId {
        self.experiment_id
    }

    fn title(&self) -> &str {
        &self.config.experiment_config.title
    }

    fn rounds_per_session(&self) -> u32 {
        self.config.experiment_config.rounds_per_session
    }

    /// Inserts the configured contents, stimuli, vote groups and stimulus
    /// groups. Rows that already exist are left untouched.
    pub fn populate_stimuli(&mut self) -> Result<(), NestError> {
        let experiment = self.experiment_id;
        let stimuli = &self.config.stimulus_config;
        let tx = immediate(&mut self.conn)?;
        let mut added = 0usize;
        for content in &stimuli.contents {
            added += usize::from(schema::insert_content(&tx, experiment, content.content_id, &content.name)?);
        }
        for stimulus in &stimuli.stimuli {
            added += usize::from(schema::insert_stimulus(&tx, experiment, stimulus)?);
        }
        for svg in &stimuli.stimulusvotegroups {
            added += usize::from(schema::insert_stimulusvotegroup(
                &tx,
                experiment,
                svg.stimulusvotegroup_id,
                &svg.stimulus_ids,
            )?);
        }
        for sg in &stimuli.stimulusgroups {
            if schema::insert_stimulusgroup(&tx, experiment, sg.stimulusgroup_id)? {
                added += 1;
                for svg in &sg.stimulusvotegroup_ids {
                    schema::attach_stimulusvotegroup(&tx, experiment, *svg, sg.stimulusgroup_id)?;
                }
            }
        }
        commit(tx)?;
        info!(experiment = %self.title(), added, "stimuli populated");
        Ok(())
    }

    /// Registers `username` if needed and adds a session for it. The subject
    /// row and the session commit together.
    pub fn add_session_for(&mut self, username: &str) -> Result<SessionId, NestError> {
        let tx = immediate(&mut self.conn)?;
        let subject = schema::find_or_create_subject(&tx, username)?;
        let session = schedule_session(&tx, &self.config, self.experiment_id, subject)?;
        commit(tx)?;
        info!(
            experiment = %self.title(),
            session = session.as_raw(),
            subject = %username,
            "session added"
        );
        Ok(session)
    }

    /// Schedules and persists a new session for `subject`.
    ///
    /// History is read, the seed drawn and every round written inside one
    /// transaction.
    pub fn add_session(&mut self, subject: SubjectId) -> Result<SessionId, NestError> {
        let tx = immediate(&mut self.conn)?;
        let session = schedule_session(&tx, &self.config, self.experiment_id, subject)?;
        commit(tx)?;
        info!(
            experiment = %self.title(),
            session = session.as_raw(),
            subject = subject.as_raw(),
            "session added"
        );
        Ok(session)
    }

    /// Removes a session together with its rounds and votes.
    pub fn delete_session(&mut self, session: SessionId) -> Result<(), NestError> {
        let experiment = self.experiment_id;
        let tx = immediate(&mut self.conn)?;
        owned_session(&tx, experiment, session)?;
        schema::delete_session(&tx, session)?;
        commit(tx)?;
        info!(experiment = %self.title(), session = session.as_raw(), "session deleted");
        Ok(())
    }

    /// Drops every vote of a session, keeping its rounds. Returns the number
    /// of votes removed.
    pub fn reset_session(&mut self, session: SessionId) -> Result<usize, NestError> {
        let experiment = self.experiment_id;
        let tx = immediate(&mut self.conn)?;
        owned_session(&tx, experiment, session)?;
        let removed = schema::delete_votes_for_session(&tx, session)?;
        commit(tx)?;
        info!(experiment = %self.title(), session = session.as_raw(), removed, "session reset");
        Ok(removed)
    }

    /// Resets a session only while it is partially finished.
    pub fn reset_unfinished_session(&mut self, session: SessionId) -> Result<usize, NestError> {
        let status = self.session_status(session)?;
        if status != SessionStatus::PartiallyFinished {
            return Err(NestError::Config(
                ErrorInfo::new("nest_store.reset_status", "only partially finished sessions can be reset")
                    .with_context("session", session)
                    .with_context("status", status),
            ));
        }
        self.reset_session(session)
    }

    /// Hands an existing session over to another subject.
    pub fn reassign_subject(&mut self, session: SessionId, subject: SubjectId) -> Result<(), NestError> {
        let experiment = self.experiment_id;
        let tx = immediate(&mut self.conn)?;
        owned_session(&tx, experiment, session)?;
        schema::update_session_subject(&tx, session, subject)?;
        commit(tx)?;
        info!(session = session.as_raw(), subject = subject.as_raw(), "session reassigned");
        Ok(())
    }

    pub fn sessions(&self) -> Result<Vec<SessionRecord>, NestError> {
        schema::load_sessions(&self.conn, self.experiment_id)
    }

    /// Committed assignments of the experiment in creation order.
    pub fn history(&self) -> Result<Vec<AssignmentRecord>, NestError> {
        load_history(&self.conn, self.experiment_id, self.rounds_per_session())
    }

    pub fn session_status(&self, session: SessionId) -> Result<SessionStatus, NestError> {
        owned_session(&self.conn, self.experiment_id, session)?;
        let rounds = schema::load_rounds(&self.conn, session)?;
        let tallies = round_tallies(&self.conn, self.experiment_id, &rounds)?;
        evaluate_status(self.rounds_per_session(), &tallies)
    }

    pub fn session_assignment(&self, session: SessionId) -> Result<Assignment, NestError> {
        owned_session(&self.conn, self.experiment_id, session)?;
        let rounds = schema::load_rounds(&self.conn, session)?;
        complete_assignment(session, &rounds, self.rounds_per_session())
    }

    /// Round steps of the session merged with the configured additions.
    pub fn session_steps(&self, session: SessionId) -> Result<Vec<Step>, NestError> {
        let assignment = self.session_assignment(session)?;
        build_steps(&assignment, &self.config.experiment_config.additions)
    }

    /// Records a vote for one vote group of a round.
    pub fn record_vote(
        &mut self,
        session: SessionId,
        round_id: RoundId,
        svg: StimulusVoteGroupId,
        score: f64,
    ) -> Result<(), NestError> {
        let scale = self.config.experiment_config.vote_scale;
        if !scale.validate(score) {
            return Err(NestError::Config(
                ErrorInfo::new("nest_store.vote_scale", "score outside the vote scale")
                    .with_context("score", score)
                    .with_context("vote_scale", scale),
            ));
        }
        let experiment = self.experiment_id;
        let tx = immediate(&mut self.conn)?;
        owned_session(&tx, experiment, session)?;
        let round = find_round(schema::load_rounds(&tx, session)?, session, round_id)?;
        let targets = schema::stimulusvotegroups_of(&tx, experiment, round.stimulusgroup_id)?;
        if !targets.contains(&svg) {
            return Err(NestError::Config(
                ErrorInfo::new("nest_store.vote_target", "vote group is not shown in this round")
                    .with_context("round_id", round_id)
                    .with_context("stimulusvotegroup_id", svg),
            ));
        }
        if schema::count_votes(&tx, round.pk, svg)? > 0 {
            warn!(session = session.as_raw(), round_id, svg = svg.as_raw(), "duplicate vote rejected");
            return Err(NestError::Integrity(
                ErrorInfo::new("nest_store.duplicate_vote", "vote group already voted in this round")
                    .with_context("session", session)
                    .with_context("round_id", round_id)
                    .with_context("stimulusvotegroup_id", svg),
            ));
        }
        schema::insert_vote(&tx, round.pk, svg, score, scale.as_str())?;
        commit(tx)?;
        debug!(session = session.as_raw(), round_id, svg = svg.as_raw(), score, "vote recorded");
        Ok(())
    }

    /// Stores how long the subject took to answer a round.
    pub fn record_response_time(
        &mut self,
        session: SessionId,
        round_id: RoundId,
        seconds: f64,
    ) -> Result<(), NestError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(NestError::Config(
                ErrorInfo::new("nest_store.response_sec", "response time must be a non-negative number")
                    .with_context("seconds", seconds),
            ));
        }
        let experiment = self.experiment_id;
        let tx = immediate(&mut self.conn)?;
        owned_session(&tx, experiment, session)?;
        let round = find_round(schema::load_rounds(&tx, session)?, session, round_id)?;
        schema::set_response_sec(&tx, round.pk, seconds)?;
        commit(tx)
    }

    pub fn session_info(&self, session: SessionId) -> Result<SessionInfo, NestError> {
        let record = owned_session(&self.conn, self.experiment_id, session)?;
        self.describe(&record)
    }

    fn describe(&self, record: &SessionRecord) -> Result<SessionInfo, NestError> {
        let subject = schema::subject_name(&self.conn, record.subject)?
            .unwrap_or_else(|| record.subject.to_string());
        let mut rounds = Vec::new();
        for round in schema::load_rounds(&self.conn, record.id)? {
            let mut stimulusvotegroups = Vec::new();
            for svg in schema::stimulusvotegroups_of(&self.conn, self.experiment_id, round.stimulusgroup_id)? {
                stimulusvotegroups.push(VoteInfo {
                    stimulusvotegroup_id: svg,
                    vote: schema::load_vote(&self.conn, round.pk, svg)?,
                });
            }
            rounds.push(RoundInfo {
                round_id: round.round_id,
                stimulusgroup_id: round.stimulusgroup_id,
                response_sec: round.response_sec,
                stimulusvotegroups,
            });
        }
        Ok(SessionInfo {
            session_id: record.id,
            subject,
            seed: record.seed,
            rounds,
        })
    }

    pub fn experiment_info(&self) -> Result<ExperimentInfo, NestError> {
        let sessions = self
            .sessions()?
            .iter()
            .map(|record| self.describe(record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ExperimentInfo {
            title: self.config.experiment_config.title.clone(),
            description: self.config.experiment_config.description.clone(),
            sessions,
            stimuli_info: self.config.stimulus_config.clone(),
        })
    }
}
