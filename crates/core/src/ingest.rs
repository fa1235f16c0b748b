//! Ingest job lifecycle rules.
//!
//! An ingest job moves `QUEUED -> RUNNING -> SUCCESS | FAILED`. Two parties
//! write into the same state machine: the launcher (spawn confirmation and
//! failure detection) and the worker process (success and progress). The
//! rules here decide which of those writes are accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Entity name used in `NotFound` errors for ingest jobs.
pub const ENTITY_INGEST_JOB: &str = "IngestJob";

/// Lifecycle status of an ingest job, persisted as an upper-case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestStatus {
    Queued,
    Running,
    Success,
    Failed,
}

/// Terminal statuses. Once reached, no further transition is accepted.
pub const TERMINAL_STATUSES: [IngestStatus; 2] = [IngestStatus::Success, IngestStatus::Failed];

/// Which side of the orchestrator is asking for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    /// The request-handling process that spawned the worker.
    Launcher,
    /// The worker process reporting on itself.
    Worker,
}

impl IngestStatus {
    /// Database string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    /// Whether a write from `source` may move a job from `self` to `next`.
    ///
    /// - Terminal states never change.
    /// - Any failure report overrides a non-terminal state.
    /// - `SUCCESS` is only accepted from the worker, never from the launcher.
    /// - `RUNNING` may be re-asserted (both sides report it) but never
    ///   moves a job backwards to `QUEUED`.
    pub fn can_transition_to(self, next: IngestStatus, source: TransitionSource) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Queued => false,
            Self::Running => true,
            Self::Failed => true,
            Self::Success => source == TransitionSource::Worker,
        }
    }
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown ingest status '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for IngestStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A weekend identified by season and round number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekendTarget {
    pub season: i32,
    pub round: i32,
}

impl WeekendTarget {
    /// Build a target from optional request fields.
    ///
    /// Both values must be present and positive.
    pub fn from_request(season: Option<i32>, round: Option<i32>) -> Result<Self, CoreError> {
        let season = season.ok_or_else(|| CoreError::Validation("season is required".into()))?;
        let round = round.ok_or_else(|| CoreError::Validation("round is required".into()))?;
        Self::new(season, round)
    }

    pub fn new(season: i32, round: i32) -> Result<Self, CoreError> {
        if season <= 0 {
            return Err(CoreError::Validation(format!(
                "season must be a positive integer, got {season}"
            )));
        }
        if round <= 0 {
            return Err(CoreError::Validation(format!(
                "round must be a positive integer, got {round}"
            )));
        }
        Ok(Self { season, round })
    }
}

impl fmt::Display for WeekendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} round {}", self.season, self.round)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
