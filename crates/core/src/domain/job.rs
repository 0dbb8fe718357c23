// Job Domain Model - state and artefacts of a submitted pipeline job

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Element flowing through a pipeline
pub type Record = serde_json::Value;

/// Identifier assigned to a job by its execution backend
pub type BackendJobId = String;

/// Job State of a submitted pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Running,
    Done,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }

    /// Move a running job to a terminal state
    pub fn finish(self, to: JobState) -> Result<JobState> {
        if self != JobState::Running || !to.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            });
        }
        Ok(to)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Running => write!(f, "RUNNING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// What a finished run leaves behind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    /// Materialised records per sink
    pub outputs: BTreeMap<String, Vec<Record>>,
    /// Elements produced per stage
    pub stage_counts: BTreeMap<String, u64>,

    pub started_at: i64, // epoch ms
    pub finished_at: i64,
}

impl JobRun {
    pub fn duration_ms(&self) -> i64 {
        self.finished_at - self.started_at
    }

    pub fn output(&self, sink: &str) -> Option<&[Record]> {
        self.outputs.get(sink).map(Vec::as_slice)
    }
}
